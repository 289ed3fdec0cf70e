#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fund-data/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for mutual-fund valuation data providers.
//!
//! This crate provides the foundational abstractions for fetching fund data:
//!
//! - [`HistoryProvider`](provider::HistoryProvider) - Historical net-value series
//! - [`SnapshotProvider`](provider::SnapshotProvider) - Real-time valuation estimates
//! - [`Transport`](transport::Transport) - The request capability providers run on
//! - [`extract_json`](parse::extract_json) - JSON extraction from JSONP envelopes
//! - [`normalize`](normalize::normalize) - Canonical, date-filtered series
//! - [`with_retry`](retry::with_retry) - Bounded retry on transient failures

/// Error types for fetch operations.
pub mod error;
/// Normalization of provider rows into canonical series.
pub mod normalize;
/// JSON extraction from raw response bodies.
pub mod parse;
/// Provider traits for fetching fund data.
pub mod provider;
/// Bounded retry with fixed backoff.
pub mod retry;
/// Transport capability and request descriptors.
pub mod transport;
/// Core data types (FundCode, CanonicalRow, HistorySeries, ...).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{FetchFailure, ParseFailure, ProviderFailure, Result};
pub use normalize::{coerce_decimal, coerce_field, normalize, parse_date};
pub use parse::extract_json;
pub use provider::{DataProvider, HistoryProvider, SnapshotProvider};
pub use retry::{RetryPolicy, with_retry, with_retry_until};
pub use transport::{HttpRequest, Transport};
pub use types::{CanonicalRow, FundCode, FundSnapshot, HistorySeries, POPULAR_FUNDS, RawRow};
