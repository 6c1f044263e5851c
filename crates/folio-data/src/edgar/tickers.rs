//! Ticker to CIK resolution.
//!
//! SEC publishes a catalog of every ticker with public filings at
//! `https://www.sec.gov/files/company_tickers.json`:
//! `{"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}, ...}`.
//! The catalog is several megabytes and changes slowly, so the resolver keeps
//! the parsed table for a configurable time.

use super::{EdgarClient, TRACING_TARGET, UserAgent};
use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Default lifetime of the downloaded catalog.
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A company resolved from its ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyIdentity {
    /// Zero-padded 10-digit CIK
    pub cik: String,
    /// Uppercase ticker
    pub ticker: String,
    /// Company name
    pub title: String,
}

/// Raw company ticker data from SEC JSON.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    /// SEC returns an integer here despite the name
    cik_str: serde_json::Value,
    ticker: String,
    title: String,
}

/// Pad CIK to 10 digits as required by SEC.
///
/// # Example
/// ```
/// # use folio_data::edgar::pad_cik;
/// assert_eq!(pad_cik("320193"), "0000320193");
/// ```
pub fn pad_cik(cik: &str) -> String {
    format!("{:0>10}", cik)
}

/// Normalize a catalog `cik_str` value.
///
/// Integers (or integer strings) are zero-padded; anything else is passed
/// through unchanged with a warning.
fn normalize_cik(raw: &serde_json::Value) -> String {
    let as_int = match raw {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match as_int {
        Some(value) => format!("{:010}", value),
        None => {
            tracing::warn!(
                target: TRACING_TARGET,
                cik = %raw,
                "cik_str is not an integer; using raw value"
            );
            match raw {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        }
    }
}

/// Lookup table for converting ticker symbols to company identities.
#[derive(Debug, Clone, Default)]
pub struct TickerCatalog {
    by_ticker: HashMap<String, CompanyIdentity>,
}

impl TickerCatalog {
    /// Parse the SEC catalog JSON.
    ///
    /// When a ticker appears on several rows, the row with the smallest
    /// numeric id wins.
    pub fn parse(json: &[u8]) -> Result<Self> {
        let rows: HashMap<String, CatalogRow> = serde_json::from_slice(json)?;
        Ok(Self::from_rows(rows))
    }

    fn from_rows(rows: HashMap<String, CatalogRow>) -> Self {
        let mut ordered: Vec<(String, CatalogRow)> = rows.into_iter().collect();
        ordered.sort_by(|(a, _), (b, _)| {
            let key = |id: &str| (id.parse::<u64>().map_err(|_| id.to_string()), id.to_string());
            key(a).cmp(&key(b))
        });

        let mut by_ticker = HashMap::with_capacity(ordered.len());
        for (_id, row) in ordered {
            let ticker = row.ticker.trim().to_uppercase();
            by_ticker
                .entry(ticker.clone())
                .or_insert_with(|| CompanyIdentity {
                    cik: normalize_cik(&row.cik_str),
                    ticker,
                    title: row.title,
                });
        }

        Self { by_ticker }
    }

    /// Look up a ticker (case-insensitive).
    pub fn get(&self, ticker: &str) -> Option<&CompanyIdentity> {
        self.by_ticker.get(&ticker.trim().to_uppercase())
    }

    /// Get all tickers in the lookup table.
    pub fn all_tickers(&self) -> Vec<&str> {
        self.by_ticker.keys().map(|s| s.as_str()).collect()
    }

    /// Number of tickers.
    pub fn len(&self) -> usize {
        self.by_ticker.len()
    }

    /// Whether the catalog has no rows.
    pub fn is_empty(&self) -> bool {
        self.by_ticker.is_empty()
    }
}

#[derive(Debug)]
struct CachedCatalog {
    fetched_at: Instant,
    catalog: Arc<TickerCatalog>,
}

/// Resolves tickers through a read-through cache of the SEC catalog.
#[derive(Debug)]
pub struct TickerResolver {
    client: EdgarClient,
    ttl: Duration,
    cached: RwLock<Option<CachedCatalog>>,
}

impl TickerResolver {
    /// Create a resolver keeping the catalog for [`DEFAULT_CATALOG_TTL`].
    pub fn new(client: EdgarClient) -> Self {
        Self::with_ttl(client, DEFAULT_CATALOG_TTL)
    }

    /// Create a resolver keeping the catalog for `ttl`.
    pub fn with_ttl(client: EdgarClient, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// Resolve a ticker to its company identity.
    ///
    /// # Errors
    /// - `DataError::InvalidSymbol` for an empty ticker (no request is made)
    /// - `DataError::CikNotFound` if no catalog row matches
    /// - `DataError::Http` / `DataError::Timeout` if the catalog is unavailable
    pub async fn resolve(&self, ticker: &str, user_agent: &UserAgent) -> Result<CompanyIdentity> {
        let wanted = ticker.trim();
        if wanted.is_empty() {
            return Err(DataError::InvalidSymbol("Empty ticker".to_string()));
        }

        let catalog = self.catalog(user_agent).await?;
        match catalog.get(wanted) {
            Some(identity) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    ticker = %identity.ticker,
                    cik = %identity.cik,
                    "Resolved ticker"
                );
                Ok(identity.clone())
            }
            None => Err(DataError::CikNotFound(ticker.to_string())),
        }
    }

    /// The current catalog, downloading it if absent or stale.
    ///
    /// Concurrent callers that find the catalog stale wait for a single
    /// download.
    pub async fn catalog(&self, user_agent: &UserAgent) -> Result<Arc<TickerCatalog>> {
        if let Some(catalog) = self.fresh(&*self.cached.read().await) {
            return Ok(catalog);
        }

        let mut slot = self.cached.write().await;
        if let Some(catalog) = self.fresh(&slot) {
            return Ok(catalog);
        }

        let url = self.client.endpoints().ticker_catalog();
        let body = self.client.get_bytes(&url, user_agent).await?;
        let catalog = Arc::new(TickerCatalog::parse(&body)?);
        tracing::info!(
            target: TRACING_TARGET,
            tickers = catalog.len(),
            "Downloaded ticker catalog"
        );

        *slot = Some(CachedCatalog {
            fetched_at: Instant::now(),
            catalog: Arc::clone(&catalog),
        });
        Ok(catalog)
    }

    /// Drop the cached catalog.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    fn fresh(&self, cached: &Option<CachedCatalog>) -> Option<Arc<TickerCatalog>> {
        cached
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| Arc::clone(&c.catalog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    const CATALOG_URL: &str = "https://www.sec.gov/files/company_tickers.json";

    fn ua() -> UserAgent {
        UserAgent::parse("Test Suite test@example.com").unwrap()
    }

    fn catalog_json() -> serde_json::Value {
        json!({
            "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
            "1": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"},
            "2": {"cik_str": "CIK-ODD", "ticker": "ODD", "title": "Odd Row Corp"},
            "10": {"cik_str": 1, "ticker": "msft", "title": "Duplicate Row"}
        })
    }

    fn resolver(mock: &Arc<MockTransport>, ttl: Duration) -> TickerResolver {
        let client = EdgarClient::with_transport(mock.clone()).with_rate_limit(Duration::ZERO);
        TickerResolver::with_ttl(client, ttl)
    }

    #[test]
    fn test_pad_cik() {
        assert_eq!(pad_cik("320193"), "0000320193");
        assert_eq!(pad_cik("1234"), "0000001234");
        assert_eq!(pad_cik("1234567890"), "1234567890");
    }

    #[test]
    fn test_catalog_prefers_lowest_row_id() {
        let catalog = TickerCatalog::parse(catalog_json().to_string().as_bytes()).unwrap();
        let msft = catalog.get("MSFT").unwrap();
        assert_eq!(msft.cik, "0000789019");
        assert_eq!(msft.title, "MICROSOFT CORP");
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_non_integer_cik_passes_through() {
        let catalog = TickerCatalog::parse(catalog_json().to_string().as_bytes()).unwrap();
        assert_eq!(catalog.get("odd").unwrap().cik, "CIK-ODD");
    }

    #[tokio::test]
    async fn test_resolution_is_case_insensitive() {
        let mock = Arc::new(MockTransport::new().with_json(CATALOG_URL, catalog_json()));
        let resolver = resolver(&mock, DEFAULT_CATALOG_TTL);

        let upper = resolver.resolve("MSFT", &ua()).await.unwrap();
        let lower = resolver.resolve("msft", &ua()).await.unwrap();
        let padded = resolver.resolve("  Msft ", &ua()).await.unwrap();

        assert_eq!(upper, lower);
        assert_eq!(upper, padded);
        assert_eq!(
            upper,
            CompanyIdentity {
                cik: "0000789019".to_string(),
                ticker: "MSFT".to_string(),
                title: "MICROSOFT CORP".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_ticker() {
        let mock = Arc::new(MockTransport::new().with_json(CATALOG_URL, catalog_json()));
        let result = resolver(&mock, DEFAULT_CATALOG_TTL).resolve("ZZZZ", &ua()).await;
        assert!(matches!(result, Err(DataError::CikNotFound(t)) if t == "ZZZZ"));
    }

    #[tokio::test]
    async fn test_empty_ticker_skips_network() {
        let mock = Arc::new(MockTransport::new().with_json(CATALOG_URL, catalog_json()));
        let result = resolver(&mock, DEFAULT_CATALOG_TTL).resolve(" ", &ua()).await;
        assert!(matches!(result, Err(DataError::InvalidSymbol(_))));
        assert_eq!(mock.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_catalog_outage_is_upstream_error() {
        let mock = Arc::new(MockTransport::new().with_status(CATALOG_URL, 403));
        let result = resolver(&mock, DEFAULT_CATALOG_TTL).resolve("MSFT", &ua()).await;
        assert!(matches!(result, Err(DataError::Http { status: 403, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_catalog_is_cached_until_ttl() {
        let mock = Arc::new(MockTransport::new().with_json(CATALOG_URL, catalog_json()));
        let resolver = resolver(&mock, Duration::from_secs(60));

        resolver.resolve("AAPL", &ua()).await.unwrap();
        resolver.resolve("MSFT", &ua()).await.unwrap();
        assert_eq!(mock.request_count(CATALOG_URL), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        resolver.resolve("AAPL", &ua()).await.unwrap();
        assert_eq!(mock.request_count(CATALOG_URL), 2);
    }
}
