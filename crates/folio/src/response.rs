//! Request and response envelopes at the tool boundary.

use crate::error::ErrorKind;
use folio_data::edgar::{CompanyMetadata, FormType};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// One cursor request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Company ticker, any case
    pub company_ticker: String,
    /// Form type as written in EDGAR, e.g. `10-K`
    pub form: String,
    /// Zero-based chunk index
    #[serde(default)]
    pub cursor: i64,
    /// Identifying user agent with a contact e-mail
    pub user_agent: String,
}

impl PageRequest {
    /// Create a request.
    pub fn new(
        company_ticker: impl Into<String>,
        form: impl Into<String>,
        cursor: i64,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            company_ticker: company_ticker.into(),
            form: form.into(),
            cursor,
            user_agent: user_agent.into(),
        }
    }

    /// The same request at another cursor.
    pub fn at(&self, cursor: i64) -> Self {
        Self {
            cursor,
            ..self.clone()
        }
    }
}

/// One chunk of a filing plus the context needed to page through it.
///
/// Serializes with the chunk under a `filing_chunk_<cursor>` key.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationResponse {
    /// Zero-padded company CIK
    pub company_cik: String,
    /// Accession number without dashes
    pub filing_accession: String,
    /// Report period date
    pub filing_report_date: String,
    /// Form type
    pub filing_form: FormType,
    /// Core company fields
    pub company_context_1: CompanyMetadata,
    /// Supplemental company fields
    pub company_context_2: CompanyMetadata,
    /// Primary document filename
    pub filing_filename: String,
    /// Last valid cursor
    pub max_cursor: usize,
    /// Cursor of `chunk`
    pub cursor: usize,
    /// The requested chunk
    pub chunk: String,
}

impl PaginationResponse {
    /// Key the chunk is serialized under.
    pub fn chunk_key(&self) -> String {
        format!("filing_chunk_{}", self.cursor)
    }
}

impl Serialize for PaginationResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(9))?;
        map.serialize_entry("company_cik", &self.company_cik)?;
        map.serialize_entry("filing_accession", &self.filing_accession)?;
        map.serialize_entry("filing_report_date", &self.filing_report_date)?;
        map.serialize_entry("filing_form", &self.filing_form)?;
        map.serialize_entry("company_context_1", &self.company_context_1)?;
        map.serialize_entry("company_context_2", &self.company_context_2)?;
        map.serialize_entry("filing_filename", &self.filing_filename)?;
        map.serialize_entry("max_cursor", &self.max_cursor)?;
        map.serialize_entry(&self.chunk_key(), &self.chunk)?;
        map.end()
    }
}

/// Error returned as data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    /// Human-readable message
    pub error: String,
    /// HTTP-style status
    pub status: u16,
    /// Failure class
    #[serde(skip)]
    pub kind: ErrorKind,
    /// Request fields relevant to the failure
    #[serde(flatten)]
    pub context: BTreeMap<String, Value>,
}

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    /// Requested chunk
    Page(PaginationResponse),
    /// Structured failure
    Error(ErrorPayload),
}

impl ToolOutput {
    /// Whether the invocation failed.
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// HTTP-style status; 200 for a page.
    pub const fn status(&self) -> u16 {
        match self {
            Self::Page(_) => 200,
            Self::Error(payload) => payload.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_data::edgar::NOT_AVAILABLE;
    use serde_json::json;

    fn response() -> PaginationResponse {
        let mut core = CompanyMetadata::new();
        core.insert("name".into(), json!("MICROSOFT CORP"));
        let mut supplemental = CompanyMetadata::new();
        supplemental.insert("category".into(), json!(NOT_AVAILABLE));

        PaginationResponse {
            company_cik: "0000789019".into(),
            filing_accession: "000095017024087843".into(),
            filing_report_date: "2024-06-30".into(),
            filing_form: FormType::TenK,
            company_context_1: core,
            company_context_2: supplemental,
            filing_filename: "msft-20240630.htm".into(),
            max_cursor: 2,
            cursor: 1,
            chunk: "Item 1. Business".into(),
        }
    }

    #[test]
    fn test_chunk_key_carries_cursor() {
        let value = serde_json::to_value(response()).unwrap();
        assert_eq!(
            value,
            json!({
                "company_cik": "0000789019",
                "filing_accession": "000095017024087843",
                "filing_report_date": "2024-06-30",
                "filing_form": "10-K",
                "company_context_1": {"name": "MICROSOFT CORP"},
                "company_context_2": {"category": "N/A"},
                "filing_filename": "msft-20240630.htm",
                "max_cursor": 2,
                "filing_chunk_1": "Item 1. Business",
            })
        );
    }

    #[test]
    fn test_request_from_json() {
        let request: PageRequest = serde_json::from_value(json!({
            "company_ticker": "msft",
            "form": "10-K",
            "cursor": 0,
            "user_agent": "Jane Doe jane@example.com",
        }))
        .unwrap();
        assert_eq!(request, PageRequest::new("msft", "10-K", 0, "Jane Doe jane@example.com"));
        assert_eq!(request.at(4).cursor, 4);
    }

    #[test]
    fn test_tool_output_is_untagged() {
        let page = ToolOutput::Page(response());
        assert_eq!(page.status(), 200);
        assert!(serde_json::to_value(&page).unwrap().get("max_cursor").is_some());

        let error = ToolOutput::Error(ErrorPayload {
            error: "Ticker not found".into(),
            status: 404,
            kind: ErrorKind::NotFound,
            context: BTreeMap::from([("ticker".to_string(), json!("ZZZZ"))]),
        });
        assert!(error.is_error());
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"error": "Ticker not found", "status": 404, "ticker": "ZZZZ"})
        );
    }
}
