//! SEC EDGAR HTTP client with rate limiting and bounded retries.

use super::{TRACING_TARGET, UserAgent};
use crate::error::{DataError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Host serving the ticker catalog and filing archives
pub const SEC_WWW_BASE_URL: &str = "https://www.sec.gov";

/// Host serving the submissions API
pub const SEC_DATA_BASE_URL: &str = "https://data.sec.gov";

/// Default rate limit: 10 requests per second (SEC requirement)
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A raw HTTP answer: status plus body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single GET round trip to an EDGAR host.
///
/// Implementations report non-2xx answers as `Ok` with the status set;
/// `Err` is reserved for failures where no answer arrived (timeouts,
/// connection errors).
#[async_trait]
pub trait EdgarTransport: Send + Sync {
    /// Issue a GET for `url` identifying as `user_agent`.
    async fn get(&self, url: &str, user_agent: &UserAgent) -> Result<HttpResponse>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DataError::Network)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EdgarTransport for ReqwestTransport {
    async fn get(&self, url: &str, user_agent: &UserAgent) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent.as_str())
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| classify(url, e))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn classify(url: &str, err: reqwest::Error) -> DataError {
    if err.is_timeout() {
        DataError::Timeout {
            url: url.to_string(),
        }
    } else {
        DataError::Network(err)
    }
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further attempt
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// No retries at all.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Base URLs of the two SEC hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgarEndpoints {
    /// `www.sec.gov`: ticker catalog and archives
    pub www: String,
    /// `data.sec.gov`: submissions API
    pub data: String,
}

impl EdgarEndpoints {
    /// Ticker to CIK catalog.
    pub fn ticker_catalog(&self) -> String {
        format!("{}/files/company_tickers.json", self.www)
    }

    /// Submissions record for a zero-padded CIK.
    pub fn submissions(&self, cik_padded: &str) -> String {
        format!("{}/submissions/CIK{}.json", self.data, cik_padded)
    }

    /// Primary document inside a filing's archive folder.
    ///
    /// Archive paths use the CIK without leading zeros and the accession
    /// without dashes.
    pub fn archive_document(&self, cik: &str, accession: &str, document: &str) -> String {
        let cik_trimmed = cik.trim_start_matches('0');
        let cik_path = if cik_trimmed.is_empty() { "0" } else { cik_trimmed };
        format!(
            "{}/Archives/edgar/data/{}/{}/{}",
            self.www,
            cik_path,
            accession.replace('-', ""),
            document
        )
    }
}

impl Default for EdgarEndpoints {
    fn default() -> Self {
        Self {
            www: SEC_WWW_BASE_URL.to_string(),
            data: SEC_DATA_BASE_URL.to_string(),
        }
    }
}

/// Rate limiter to ensure we don't exceed SEC's rate limits
#[derive(Debug)]
struct RateLimiter {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    const fn new(min_interval: Duration) -> Self {
        Self {
            last_request: None,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// SEC EDGAR client shared by every pipeline stage.
///
/// Cloning is cheap; clones share the transport and the rate limiter.
#[derive(Clone)]
pub struct EdgarClient {
    transport: Arc<dyn EdgarTransport>,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    retry: RetryPolicy,
    endpoints: EdgarEndpoints,
}

impl EdgarClient {
    /// Create a client over `reqwest` with default settings (10 req/sec)
    pub fn new() -> Result<Self> {
        let transport = ReqwestTransport::new(DEFAULT_TIMEOUT)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn EdgarTransport>) -> Self {
        Self {
            transport,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            retry: RetryPolicy::default(),
            endpoints: EdgarEndpoints::default(),
        }
    }

    /// Replace the minimum interval between requests.
    ///
    /// # Example
    /// ```no_run
    /// use folio_data::edgar::EdgarClient;
    /// use std::time::Duration;
    ///
    /// # fn example() -> folio_data::Result<()> {
    /// // 5 requests per second
    /// let client = EdgarClient::new()?.with_rate_limit(Duration::from_millis(200));
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_rate_limit(mut self, min_interval: Duration) -> Self {
        self.rate_limiter = Arc::new(Mutex::new(RateLimiter::new(min_interval)));
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the SEC base URLs.
    pub fn with_endpoints(mut self, endpoints: EdgarEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Configured endpoints.
    pub const fn endpoints(&self) -> &EdgarEndpoints {
        &self.endpoints
    }

    /// Configured retry policy.
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET `url`, returning the body of a 2xx answer.
    ///
    /// Transient failures are retried per the [`RetryPolicy`]; anything else
    /// fails on the first attempt.
    pub async fn get_bytes(&self, url: &str, user_agent: &UserAgent) -> Result<Vec<u8>> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            self.rate_limiter.lock().await.wait().await;

            let started_at = Instant::now();
            let outcome = match self.transport.get(url, user_agent).await {
                Ok(response) if response.is_success() => Ok(response.body),
                Ok(response) => Err(DataError::Http {
                    status: response.status,
                    url: url.to_string(),
                }),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(body) => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        url,
                        attempt,
                        bytes = body.len(),
                        elapsed_ms = started_at.elapsed().as_millis() as u64,
                        "EDGAR request succeeded"
                    );
                    return Ok(body);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        target: TRACING_TARGET,
                        url,
                        attempt,
                        error = %err,
                        retry_in_ms = delay.as_millis() as u64,
                        "Transient EDGAR failure, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        url,
                        attempt,
                        error = %err,
                        "EDGAR request failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        user_agent: &UserAgent,
    ) -> Result<T> {
        let body = self.get_bytes(url, user_agent).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl std::fmt::Debug for EdgarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgarClient")
            .field("endpoints", &self.endpoints)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
