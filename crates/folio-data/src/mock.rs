//! In-memory EDGAR transport for tests.
//!
//! [`MockTransport`] answers GETs from canned replies keyed by exact URL and
//! records every request it sees, so tests can assert how many times a
//! document was downloaded and with which user agent.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! folio-data = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_data::mock::{MockReply, MockTransport};
//!
//! let mock = MockTransport::new()
//!     .with_json("https://www.sec.gov/files/company_tickers.json", catalog)
//!     .with_sequence(doc_url, vec![MockReply::status(503), MockReply::body(200, html)]);
//! ```

use crate::edgar::{EdgarTransport, HttpResponse, UserAgent};
use crate::error::{DataError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One canned answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// An HTTP answer
    Response(HttpResponse),
    /// No answer before the deadline
    Timeout,
}

impl MockReply {
    /// Answer with a status and body.
    pub const fn body(status: u16, body: Vec<u8>) -> Self {
        Self::Response(HttpResponse { status, body })
    }

    /// Answer with an empty body.
    pub const fn status(status: u16) -> Self {
        Self::body(status, Vec::new())
    }
}

/// A request observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Requested URL
    pub url: String,
    /// User agent header
    pub user_agent: String,
}

/// Transport serving canned replies.
///
/// Each URL owns a queue of replies; the last reply in a queue is repeated
/// once the others are consumed. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Option<Duration>,
}

impl MockTransport {
    /// An empty mock; every URL answers 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `value` as JSON at `url`.
    pub fn with_json(self, url: impl Into<String>, value: serde_json::Value) -> Self {
        self.with_body(url, value.to_string().into_bytes())
    }

    /// Serve `body` with status 200 at `url`.
    pub fn with_body(self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.with_sequence(url, vec![MockReply::body(200, body)])
    }

    /// Answer `status` with an empty body at `url`.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.with_sequence(url, vec![MockReply::status(status)])
    }

    /// Serve `replies` in order at `url`, repeating the last one.
    pub fn with_sequence(mut self, url: impl Into<String>, replies: Vec<MockReply>) -> Self {
        self.routes
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), replies.into());
        self
    }

    /// Hold every answer for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the replies at `url` while the mock is in use.
    pub fn set_replies(&self, url: impl Into<String>, replies: Vec<MockReply>) {
        lock(&self.routes).insert(url.into(), replies.into());
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Number of requests for `url`.
    pub fn request_count(&self, url: &str) -> usize {
        lock(&self.requests).iter().filter(|r| r.url == url).count()
    }

    /// Number of requests for any URL.
    pub fn total_requests(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_reply(&self, url: &str) -> MockReply {
        let mut routes = lock(&self.routes);
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(MockReply::status(404)),
            Some(queue) => queue.front().cloned().unwrap_or(MockReply::status(404)),
            None => MockReply::status(404),
        }
    }
}

#[async_trait]
impl EdgarTransport for MockTransport {
    async fn get(&self, url: &str, user_agent: &UserAgent) -> Result<HttpResponse> {
        lock(&self.requests).push(RecordedRequest {
            url: url.to_string(),
            user_agent: user_agent.as_str().to_string(),
        });

        let reply = self.next_reply(url);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Response(response) => Ok(response),
            MockReply::Timeout => Err(DataError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
