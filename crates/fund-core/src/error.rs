//! Error types for fund data operations.
//!
//! This module defines [`FetchFailure`], which covers every way a provider
//! attempt can fail, and [`ParseFailure`], the narrower error produced while
//! extracting JSON from a raw response body.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while extracting JSON from a response body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// The body contains no `{ ... }` region.
    #[error("no JSON object found in response body")]
    NoJsonFound,

    /// A bracketed region exists but is not valid JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),
}

/// The reason a single provider was skipped by the fallback chain.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    /// Name of the provider that failed.
    pub provider: String,
    /// The failure it reported.
    pub reason: FetchFailure,
}

impl ProviderFailure {
    /// Creates a new provider failure record.
    #[must_use]
    pub fn new(provider: impl Into<String>, reason: FetchFailure) -> Self {
        Self {
            provider: provider.into(),
            reason,
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

/// Errors that can occur while fetching fund data.
#[derive(Error, Debug, Clone)]
pub enum FetchFailure {
    /// The transport could not reach the endpoint (DNS, connect, reset, ...).
    #[error("Unreachable: {0}")]
    Unreachable(String),

    /// The request did not complete within the attempt timeout.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// The response body could not be turned into JSON.
    #[error("Parse failure: {0}")]
    ParseFailure(#[from] ParseFailure),

    /// Valid JSON that does not have the expected shape.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A well-formed response with zero usable rows.
    #[error("No data for {fund} in range {start} to {end}")]
    EmptyResult {
        /// The fund that was requested.
        fund: String,
        /// Start of the requested date range.
        start: String,
        /// End of the requested date range.
        end: String,
    },

    /// The provider has no known response shape and never touches the network.
    #[error("Provider not implemented: {0}")]
    NotImplemented(String),

    /// Every provider in the fallback chain failed.
    #[error("All providers failed: {}", join_failures(.0))]
    AllProvidersFailed(Vec<ProviderFailure>),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No provider is registered for the requested operation.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// The caller's overall deadline passed before the work finished.
    #[error("Deadline exceeded{}", describe_last(.last))]
    DeadlineExceeded {
        /// The failure of the last attempt, if one ran before the deadline.
        last: Option<Box<FetchFailure>>,
    },

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl FetchFailure {
    /// Returns true for failures worth retrying against the same provider.
    ///
    /// Network errors, timeouts, throttling (429) and server errors (5xx) are
    /// transient. Parse and schema errors are deterministic and are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// A deadline failure carrying the last attempt's failure, if any.
    #[must_use]
    pub fn deadline_exceeded(last: Option<Self>) -> Self {
        Self::DeadlineExceeded {
            last: last.map(Box::new),
        }
    }

    /// Per-provider diagnostics when this is [`FetchFailure::AllProvidersFailed`].
    #[must_use]
    pub fn provider_failures(&self) -> &[ProviderFailure] {
        match self {
            Self::AllProvidersFailed(failures) => failures,
            _ => &[],
        }
    }
}

fn describe_last(last: &Option<Box<FetchFailure>>) -> String {
    last.as_ref()
        .map(|e| format!(" (last failure: {e})"))
        .unwrap_or_default()
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "no provider was tried".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using [`FetchFailure`].
pub type Result<T> = std::result::Result<T, FetchFailure>;
