//! SEC EDGAR access.
//!
//! This module provides the upstream half of the filing pager:
//! - Ticker to CIK resolution against the SEC ticker catalog
//! - Company submissions (metadata and recent filing history)
//! - Latest-filing selection per form type
//! - Primary document download from the archives
//!
//! Every request goes through one [`EdgarClient`], which applies SEC's rate
//! limit, the caller's contact user agent and bounded retries.
//!
//! # Example
//!
//! ```no_run
//! use folio_data::edgar::{
//!     EdgarClient, FilingDocumentFetcher, FilingIndexFetcher, FilingRecord, FormType,
//!     TickerResolver, UserAgent, select_latest,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ua = UserAgent::parse("Jane Doe jane@example.com")?;
//!     let client = EdgarClient::new()?;
//!
//!     let company = TickerResolver::new(client.clone()).resolve("MSFT", &ua).await?;
//!     let submissions = FilingIndexFetcher::new(client.clone()).fetch(&company.cik, &ua).await;
//!     let index = select_latest(&submissions.history, FormType::TenK)?;
//!     let filing = FilingRecord::from_history(&submissions.history, index, &company.cik)?;
//!
//!     let doc = FilingDocumentFetcher::new(client).fetch(&filing, &ua).await?;
//!     println!("{} bytes", doc.bytes.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod document;
pub mod filings;
pub mod submissions;
pub mod tickers;
pub mod user_agent;

/// Tracing target for EDGAR operations.
pub const TRACING_TARGET: &str = "folio_data::edgar";

// Re-export main types
pub use client::{
    EdgarClient, EdgarEndpoints, EdgarTransport, HttpResponse, ReqwestTransport, RetryPolicy,
};
pub use document::{ContentHint, FilingDocumentFetcher, RawDocument};
pub use filings::{FilingRecord, FormType, latest_indices, select_latest};
pub use submissions::{
    CompanyMetadata, CompanySubmissions, FilingHistory, FilingIndexFetcher, NOT_AVAILABLE,
};
pub use tickers::{CompanyIdentity, TickerCatalog, TickerResolver, pad_cik};
pub use user_agent::UserAgent;
