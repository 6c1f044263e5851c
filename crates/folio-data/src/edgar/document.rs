//! Primary document download from the EDGAR archives.

use super::{EdgarClient, FilingRecord, TRACING_TARGET, UserAgent};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// What kind of content a document is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentHint {
    /// HTML or inline XBRL (XHTML)
    Html,
    /// Standalone XBRL instance
    Xbrl,
    /// Plain text submission
    Text,
    /// Unrecognized extension; treated as markup
    Unknown,
}

impl ContentHint {
    /// Infer the hint from a document filename.
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "htm" | "html" | "xhtml" => Self::Html,
            "xml" | "xbrl" => Self::Xbrl,
            "txt" => Self::Text,
            _ => Self::Unknown,
        }
    }
}

/// Raw bytes of one primary document.
#[derive(Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Document body
    pub bytes: Vec<u8>,
    /// Expected content kind
    pub hint: ContentHint,
}

impl std::fmt::Debug for RawDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawDocument")
            .field("len", &self.bytes.len())
            .field("hint", &self.hint)
            .finish()
    }
}

/// Downloads primary documents.
#[derive(Debug, Clone)]
pub struct FilingDocumentFetcher {
    client: EdgarClient,
}

impl FilingDocumentFetcher {
    /// Create a fetcher over a shared client.
    pub const fn new(client: EdgarClient) -> Self {
        Self { client }
    }

    /// Archive URL of a filing's primary document.
    pub fn document_url(&self, cik: &str, accession: &str, document: &str) -> String {
        self.client
            .endpoints()
            .archive_document(cik, accession, document)
    }

    /// Download the primary document of `filing`.
    ///
    /// Transient failures are retried by the client; a 4xx fails at once.
    pub async fn fetch(&self, filing: &FilingRecord, user_agent: &UserAgent) -> Result<RawDocument> {
        let url = self.document_url(&filing.cik, &filing.accession, &filing.primary_document);
        let bytes = self.client.get_bytes(&url, user_agent).await?;

        tracing::info!(
            target: TRACING_TARGET,
            cik = %filing.cik,
            accession = %filing.accession,
            form = %filing.form,
            bytes = bytes.len(),
            "Downloaded filing document"
        );

        Ok(RawDocument {
            bytes,
            hint: ContentHint::from_filename(&filing.primary_document),
        })
    }
}
