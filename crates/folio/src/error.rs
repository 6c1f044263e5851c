//! Error types for the filing pager.
//!
//! Every failure maps to one [`ErrorKind`] and an HTTP-style status so the
//! tool boundary can hand it back as data instead of aborting.

use crate::response::ErrorPayload;
use folio_data::DataError;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type for pager operations.
pub type Result<T> = std::result::Result<T, FolioError>;

/// Coarse failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller input rejected before or after lookup (400)
    Validation,
    /// Ticker or form absent (404)
    NotFound,
    /// SEC unavailable or returned garbage (502/504)
    Upstream,
    /// Document could not be turned into text (500)
    Conversion,
    /// Misconfiguration or runtime fault (500)
    Internal,
}

/// Errors that can occur while serving a cursor request.
#[derive(Debug, Error)]
pub enum FolioError {
    /// User agent missing or without contact e-mail
    #[error("Invalid user agent: SEC requires a contact e-mail (e.g. \"Jane Doe jane@example.com\")")]
    InvalidUserAgent(String),

    /// Form outside the supported set
    #[error("Unsupported form type: {0}")]
    UnknownForm(String),

    /// Cursor below zero
    #[error("Cursor must be non-negative, got {0}")]
    NegativeCursor(i64),

    /// Cursor past the last chunk
    #[error("Cursor {cursor} out of range [0, {max_cursor}]")]
    CursorOutOfRange {
        /// Requested cursor
        cursor: usize,
        /// Last valid cursor
        max_cursor: usize,
    },

    /// Blank ticker
    #[error("Ticker must not be empty")]
    EmptyTicker,

    /// Ticker absent from the SEC catalog
    #[error("Ticker not found")]
    TickerNotFound {
        /// Ticker as supplied by the caller
        ticker: String,
    },

    /// Submissions record empty or unavailable
    #[error("No filings available for CIK {cik}")]
    NoFilings {
        /// Company CIK
        cik: String,
    },

    /// Requested form absent from the company's history
    #[error("No filing found for form {form}")]
    FormNotFound {
        /// Requested form
        form: String,
    },

    /// SEC failure after retries
    #[error("Upstream SEC failure: {0}")]
    Upstream(#[source] DataError),

    /// Document could not be normalized or chunked
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Background task failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FolioError {
    /// Failure class.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUserAgent(_)
            | Self::UnknownForm(_)
            | Self::NegativeCursor(_)
            | Self::CursorOutOfRange { .. }
            | Self::EmptyTicker => ErrorKind::Validation,
            Self::TickerNotFound { .. } | Self::NoFilings { .. } | Self::FormNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::Upstream(_) => ErrorKind::Upstream,
            Self::Conversion(_) => ErrorKind::Conversion,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-style status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::Upstream(err) if err.is_timeout() => 504,
            _ => match self.kind() {
                ErrorKind::Validation => 400,
                ErrorKind::NotFound => 404,
                ErrorKind::Upstream => 502,
                ErrorKind::Conversion | ErrorKind::Internal => 500,
            },
        }
    }

    /// The payload handed back across the tool boundary.
    pub fn to_payload(&self) -> ErrorPayload {
        let mut context = BTreeMap::new();
        match self {
            Self::UnknownForm(form) | Self::FormNotFound { form } => {
                context.insert("form".to_string(), json!(form));
            }
            Self::NegativeCursor(cursor) => {
                context.insert("cursor".to_string(), json!(cursor));
            }
            Self::CursorOutOfRange { cursor, max_cursor } => {
                context.insert("cursor".to_string(), json!(cursor));
                context.insert("max_cursor".to_string(), json!(max_cursor));
            }
            Self::TickerNotFound { ticker } => {
                context.insert("ticker".to_string(), json!(ticker));
            }
            Self::NoFilings { cik } => {
                context.insert("cik".to_string(), json!(cik));
            }
            _ => {}
        }

        ErrorPayload {
            error: self.to_string(),
            status: self.status(),
            kind: self.kind(),
            context,
        }
    }
}

impl From<DataError> for FolioError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::InvalidUserAgent(raw) => Self::InvalidUserAgent(raw),
            DataError::InvalidSymbol(_) => Self::EmptyTicker,
            DataError::CikNotFound(ticker) => Self::TickerNotFound { ticker },
            DataError::FilingNotFound { form } => Self::FormNotFound { form },
            other => Self::Upstream(other),
        }
    }
}
