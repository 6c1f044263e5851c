//! Pipeline configuration.

use crate::chunk::DEFAULT_CHUNK_CAPACITY;
use folio_data::edgar::client::{DEFAULT_RATE_LIMIT, DEFAULT_TIMEOUT};
use folio_data::edgar::tickers::DEFAULT_CATALOG_TTL;
use folio_data::edgar::{
    EdgarClient, EdgarEndpoints, EdgarTransport, ReqwestTransport, RetryPolicy,
};
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of a cached chunk set.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Tunables for one [`FilingPager`](crate::FilingPager).
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "config does nothing unless you use it"]
pub struct FolioConfig {
    /// Lifetime of a cached chunk set
    pub cache_ttl: Duration,
    /// Lifetime of the downloaded ticker catalog
    pub catalog_ttl: Duration,
    /// Maximum characters per chunk
    pub chunk_capacity: usize,
    /// Per-request timeout for SEC calls
    pub request_timeout: Duration,
    /// Minimum interval between SEC calls
    pub rate_limit: Duration,
    /// Retry policy for transient SEC failures
    pub retry: RetryPolicy,
    /// SEC base URLs
    pub endpoints: EdgarEndpoints,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            catalog_ttl: DEFAULT_CATALOG_TTL,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            request_timeout: DEFAULT_TIMEOUT,
            rate_limit: DEFAULT_RATE_LIMIT,
            retry: RetryPolicy::default(),
            endpoints: EdgarEndpoints::default(),
        }
    }
}

impl FolioConfig {
    /// Sets the chunk cache lifetime.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the ticker catalog lifetime.
    pub fn with_catalog_ttl(mut self, ttl: Duration) -> Self {
        self.catalog_ttl = ttl;
        self
    }

    /// Sets the maximum characters per chunk.
    pub fn with_chunk_capacity(mut self, capacity: usize) -> Self {
        self.chunk_capacity = capacity;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the minimum interval between requests.
    pub fn with_rate_limit(mut self, interval: Duration) -> Self {
        self.rate_limit = interval;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the SEC base URLs.
    pub fn with_endpoints(mut self, endpoints: EdgarEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Build a `reqwest`-backed client honoring this configuration.
    pub fn build_client(&self) -> folio_data::Result<EdgarClient> {
        let transport = ReqwestTransport::new(self.request_timeout)?;
        Ok(self.client_with_transport(Arc::new(transport)))
    }

    /// Build a client over an arbitrary transport.
    pub fn client_with_transport(&self, transport: Arc<dyn EdgarTransport>) -> EdgarClient {
        EdgarClient::with_transport(transport)
            .with_rate_limit(self.rate_limit)
            .with_retry(self.retry)
            .with_endpoints(self.endpoints.clone())
    }
}
