//! Company submissions: metadata and filing history.
//!
//! `https://data.sec.gov/submissions/CIK##########.json` returns company
//! fields at the top level and the recent filing history as parallel arrays
//! under `filings.recent`, where index `i` of every array describes the same
//! filing. Older history lives in `filings.files` and is not read here.

use super::{EdgarClient, TRACING_TARGET, UserAgent, pad_cik};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder for absent metadata values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Company-level fields surfaced as the first context group.
pub const CORE_FIELDS: [&str; 7] = [
    "name",
    "tickers",
    "exchanges",
    "sicDescription",
    "description",
    "website",
    "fiscalYearEnd",
];

/// Supplemental fields surfaced as the second context group.
pub const SUPPLEMENTAL_FIELDS: [&str; 6] = [
    "stateOfIncorporation",
    "stateOfIncorporationDescription",
    "insiderTransactionForOwnerExists",
    "insiderTransactionForIssuerExists",
    "category",
    "addresses",
];

/// Ordered metadata map; every requested key is present, never `null`.
pub type CompanyMetadata = BTreeMap<String, serde_json::Value>;

/// Recent filings data.
///
/// The SEC API returns filing information as parallel arrays where
/// each index corresponds to a single filing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingHistory {
    /// Form types (e.g., "10-K", "10-Q", "8-K")
    #[serde(default)]
    pub form: Vec<String>,
    /// Accession numbers (unique filing identifiers)
    #[serde(default)]
    pub accession_number: Vec<String>,
    /// Report period dates in YYYY-MM-DD format; empty for some forms
    #[serde(default)]
    pub report_date: Vec<String>,
    /// Primary document filenames
    #[serde(default)]
    pub primary_document: Vec<String>,
}

impl FilingHistory {
    /// Number of filings addressable in every parallel array.
    pub fn len(&self) -> usize {
        self.form
            .len()
            .min(self.accession_number.len())
            .min(self.report_date.len())
            .min(self.primary_document.len())
    }

    /// Whether no filing is addressable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default, Deserialize)]
struct FilingsBlock {
    #[serde(default)]
    recent: FilingHistory,
}

/// A company's submissions record split into its three parts.
///
/// `Default` is the "nothing available" value returned when the record
/// cannot be fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanySubmissions {
    /// Core identity fields ([`CORE_FIELDS`])
    pub core: CompanyMetadata,
    /// Supplemental fields ([`SUPPLEMENTAL_FIELDS`])
    pub supplemental: CompanyMetadata,
    /// Recent filing history
    pub history: FilingHistory,
}

impl CompanySubmissions {
    /// Split a raw submissions document.
    pub fn from_json(mut raw: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let filings: FilingsBlock = match raw.remove("filings") {
            Some(value) => serde_json::from_value(value)?,
            None => FilingsBlock::default(),
        };

        Ok(Self {
            core: pick(&raw, &CORE_FIELDS),
            supplemental: pick(&raw, &SUPPLEMENTAL_FIELDS),
            history: filings.recent,
        })
    }

    /// Whether nothing usable was returned.
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.supplemental.is_empty() && self.history.is_empty()
    }
}

fn pick(raw: &serde_json::Map<String, serde_json::Value>, keys: &[&str]) -> CompanyMetadata {
    keys.iter()
        .map(|key| {
            let value = raw
                .get(*key)
                .filter(|v| is_present(v))
                .cloned()
                .unwrap_or_else(|| serde_json::Value::String(NOT_AVAILABLE.to_string()));
            ((*key).to_string(), value)
        })
        .collect()
}

fn is_present(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.trim().is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
        serde_json::Value::Bool(_) | serde_json::Value::Number(_) => true,
    }
}

/// Fetches submissions records.
#[derive(Debug, Clone)]
pub struct FilingIndexFetcher {
    client: EdgarClient,
}

impl FilingIndexFetcher {
    /// Create a fetcher over a shared client.
    pub const fn new(client: EdgarClient) -> Self {
        Self { client }
    }

    /// Fetch and split the submissions record for `cik`.
    ///
    /// # Errors
    /// Propagates network, status and parse failures.
    pub async fn try_fetch(&self, cik: &str, user_agent: &UserAgent) -> Result<CompanySubmissions> {
        let url = self.client.endpoints().submissions(&pad_cik(cik));
        let raw: serde_json::Map<String, serde_json::Value> =
            self.client.get_json(&url, user_agent).await?;
        CompanySubmissions::from_json(raw)
    }

    /// Fetch the submissions record, degrading every failure to an empty one.
    ///
    /// Callers must treat an empty result as "no filings available".
    pub async fn fetch(&self, cik: &str, user_agent: &UserAgent) -> CompanySubmissions {
        match self.try_fetch(cik, user_agent).await {
            Ok(submissions) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    cik,
                    filings = submissions.history.len(),
                    "Fetched filing history"
                );
                submissions
            }
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    cik,
                    error = %err,
                    "Failed to fetch filing history; treating as empty"
                );
                CompanySubmissions::default()
            }
        }
    }
}
