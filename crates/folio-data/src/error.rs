//! Error types for EDGAR data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// User agent is missing or carries no contact address
    #[error("Invalid user agent {0:?}: SEC requires a contact e-mail (e.g. \"Jane Doe jane@example.com\")")]
    InvalidUserAgent(String),

    /// Invalid symbol
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// CIK not found for ticker
    #[error("CIK not found for ticker: {0}")]
    CikNotFound(String),

    /// Requested form absent from the filing history
    #[error("No {form} filing found in history")]
    FilingNotFound {
        /// Requested form type
        form: String,
    },

    /// Upstream answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Upstream did not answer in time
    #[error("Request to {url} timed out")]
    Timeout {
        /// Requested URL
        url: String,
    },

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Transport failure not originating from reqwest
    #[error("Transport error: {0}")]
    Transport(String),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DataError {
    /// Whether a retry of the same idempotent GET may succeed.
    ///
    /// Timeouts, connection failures, 429 and 5xx responses are transient.
    /// Every other status, and every client-side error, is final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Network(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    /// Whether the failure is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Network(err) => err.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(500, true)]
    #[case(503, true)]
    #[case(429, true)]
    #[case(404, false)]
    #[case(403, false)]
    #[case(400, false)]
    fn test_http_transience(#[case] status: u16, #[case] transient: bool) {
        let err = DataError::Http {
            status,
            url: "https://www.sec.gov/x".to_string(),
        };
        assert_eq!(err.is_transient(), transient);
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = DataError::Timeout {
            url: "https://www.sec.gov/x".to_string(),
        };
        assert!(err.is_transient());
        assert!(err.is_timeout());
    }

    #[test]
    fn test_client_errors_are_final() {
        assert!(!DataError::InvalidUserAgent("MyApp/1.0".into()).is_transient());
        assert!(!DataError::Parse("bad json".into()).is_transient());
        assert!(!DataError::CikNotFound("ZZZZ".into()).is_transient());
    }
}
