//! Contact-bearing user agent required by SEC fair-access policy.

use crate::error::{DataError, Result};
use reqwest::header::HeaderValue;
use std::fmt;

/// A validated user agent for SEC requests.
///
/// SEC rejects anonymous automated traffic; every request must identify the
/// caller with a contact e-mail. The value is trimmed, must contain `@` and
/// must be a legal HTTP header value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserAgent(String);

impl UserAgent {
    /// Validate and wrap a raw user agent string.
    ///
    /// # Example
    /// ```
    /// # use folio_data::edgar::UserAgent;
    /// assert!(UserAgent::parse("Jane Doe jane@example.com").is_ok());
    /// assert!(UserAgent::parse("MyApp/1.0").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || !trimmed.contains('@')
            || trimmed.chars().any(char::is_control)
            || HeaderValue::from_str(trimmed).is_err()
        {
            return Err(DataError::InvalidUserAgent(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The header value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserAgent {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Jane Doe jane@example.com")]
    #[case("  research-bot ops@firm.io  ")]
    #[case("a@b")]
    fn test_accepts_contact_agents(#[case] raw: &str) {
        let ua = UserAgent::parse(raw).unwrap();
        assert_eq!(ua.as_str(), raw.trim());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("MyApp/1.0")]
    #[case("Mozilla/5.0 (X11; Linux x86_64)")]
    #[case("Jane\nDoe jane@example.com")]
    #[case("Jane Doe jane@example.com\r\nX-Injected: 1")]
    #[case("Jane\u{7f}Doe jane@example.com")]
    fn test_rejects_unusable_agents(#[case] raw: &str) {
        assert!(matches!(
            UserAgent::parse(raw),
            Err(DataError::InvalidUserAgent(_))
        ));
    }
}
