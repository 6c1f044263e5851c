//! Form types and latest-filing selection.
//!
//! The submissions history is ordered most recent first, so the first
//! occurrence of a form in the `form` array is the latest filing of that
//! type.

use super::FilingHistory;
use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// SEC form types served by the pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormType {
    /// Annual report
    #[serde(rename = "10-K")]
    TenK,
    /// Quarterly report
    #[serde(rename = "10-Q")]
    TenQ,
    /// Current report
    #[serde(rename = "8-K")]
    EightK,
    /// Registration statement
    #[serde(rename = "S-1")]
    S1,
    /// Simplified registration statement
    #[serde(rename = "S-3")]
    S3,
    /// Definitive proxy statement
    #[serde(rename = "DEF 14A")]
    Def14A,
    /// Foreign private issuer annual report
    #[serde(rename = "20-F")]
    TwentyF,
    /// Foreign private issuer current report
    #[serde(rename = "6-K")]
    SixK,
    /// Insider transaction statement
    #[serde(rename = "4")]
    Four,
    /// Beneficial ownership report (active)
    #[serde(rename = "13D")]
    ThirteenD,
    /// Beneficial ownership report (passive)
    #[serde(rename = "13G")]
    ThirteenG,
}

impl FormType {
    /// Tracked forms in their fixed order.
    pub const ALL: [Self; 11] = [
        Self::TenK,
        Self::TenQ,
        Self::EightK,
        Self::S1,
        Self::S3,
        Self::Def14A,
        Self::TwentyF,
        Self::SixK,
        Self::Four,
        Self::ThirteenD,
        Self::ThirteenG,
    ];

    /// The form name as it appears in EDGAR.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TenK => "10-K",
            Self::TenQ => "10-Q",
            Self::EightK => "8-K",
            Self::S1 => "S-1",
            Self::S3 => "S-3",
            Self::Def14A => "DEF 14A",
            Self::TwentyF => "20-F",
            Self::SixK => "6-K",
            Self::Four => "4",
            Self::ThirteenD => "13D",
            Self::ThirteenG => "13G",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|form| form.as_str() == wanted)
            .ok_or_else(|| DataError::Parse(format!("Unsupported form type: {}", s)))
    }
}

/// Index of the latest filing of `form` in the history.
///
/// Only the requested form is scanned.
///
/// # Errors
/// Returns `DataError::FilingNotFound` if the form never occurs.
pub fn select_latest(history: &FilingHistory, form: FormType) -> Result<usize> {
    let addressable = history.len();
    history
        .form
        .iter()
        .take(addressable)
        .position(|f| f == form.as_str())
        .ok_or_else(|| DataError::FilingNotFound {
            form: form.to_string(),
        })
}

/// Index of the latest filing for every tracked form present in the history.
pub fn latest_indices(history: &FilingHistory) -> BTreeMap<FormType, usize> {
    FormType::ALL
        .into_iter()
        .filter_map(|form| select_latest(history, form).ok().map(|idx| (form, idx)))
        .collect()
}

/// One selected filing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilingRecord {
    /// Accession number without dashes
    pub accession: String,
    /// Report period date; may be empty for event-driven forms
    pub report_date: String,
    /// Form type
    pub form: FormType,
    /// Primary document filename
    pub primary_document: String,
    /// Zero-padded company CIK
    pub cik: String,
}

impl FilingRecord {
    /// Build the record at `index` of the history.
    ///
    /// # Errors
    /// Returns `DataError::Parse` if `index` is not addressable or the form
    /// at `index` is not a tracked form.
    pub fn from_history(history: &FilingHistory, index: usize, cik: &str) -> Result<Self> {
        if index >= history.len() {
            return Err(DataError::Parse(format!(
                "filing index {} outside history of {} entries",
                index,
                history.len()
            )));
        }

        Ok(Self {
            accession: history.accession_number[index].replace('-', ""),
            report_date: history.report_date[index].clone(),
            form: history.form[index].parse()?,
            primary_document: history.primary_document[index].clone(),
            cik: cik.to_string(),
        })
    }
}
