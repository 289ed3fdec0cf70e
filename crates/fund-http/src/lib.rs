#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fund-data/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! HTTP transport for fund data providers.
//!
//! # Example
//!
//! ```no_run
//! use fund_core::{HttpRequest, Transport};
//! use fund_http::HttpTransport;
//!
//! # async fn example() -> fund_core::Result<()> {
//! let transport = HttpTransport::new()?;
//! let body = transport
//!     .request(&HttpRequest::get("http://fundgz.1234567.com.cn/js/110022.js"))
//!     .await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use fund_core::{FetchFailure, HttpRequest, Result, Transport};
use tracing::{debug, trace};

/// User agent sent unless a request overrides it.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Connect timeout applied by the default client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`Transport`] backed by a pooled `reqwest` client.
///
/// The client is safe to share between concurrent fetches.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a browser-like user agent.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FetchFailure::Other(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Create a transport with a custom HTTP client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: &HttpRequest) -> Result<String> {
        let mut builder = self
            .client
            .get(&request.url)
            .query(&request.query)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!(url = %request.url, params = request.query.len(), "HTTP GET");

        let response = builder
            .send()
            .await
            .map_err(|e| map_error(e, request.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Http {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_error(e, request.timeout))?;
        trace!(url = %request.url, bytes = body.len(), "HTTP response");
        Ok(body)
    }
}

/// Maps a `reqwest` error onto the fetch taxonomy.
fn map_error(err: reqwest::Error, timeout: Duration) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout(timeout)
    } else if err.is_builder() {
        FetchFailure::InvalidParameter(err.to_string())
    } else {
        FetchFailure::Unreachable(err.to_string())
    }
}
