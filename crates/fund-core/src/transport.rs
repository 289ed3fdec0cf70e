//! Transport capability used by providers to issue requests.
//!
//! Providers never own an HTTP client. They describe a request with
//! [`HttpRequest`] and hand it to whichever [`Transport`] the caller supplies,
//! which keeps adapters stateless and lets tests substitute canned responses.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Description of a single GET request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL without the query string.
    pub url: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// Extra request headers (user agent, referer, ...).
    pub headers: Vec<(String, String)>,
    /// Transport-level timeout for this request.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Creates a request for `url` with no parameters and the default timeout.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the value of a query parameter.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value of a header, matched case-insensitively.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Capability to execute an [`HttpRequest`] and return the response body.
///
/// Implementations map connection problems to
/// [`FetchFailure::Unreachable`](crate::FetchFailure::Unreachable), expired
/// timeouts to [`FetchFailure::Timeout`](crate::FetchFailure::Timeout) and
/// non-success statuses to [`FetchFailure::Http`](crate::FetchFailure::Http).
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Executes the request and returns the body as text.
    async fn request(&self, request: &HttpRequest) -> Result<String>;
}
