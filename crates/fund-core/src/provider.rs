//! Provider traits for fetching fund data.
//!
//! This module defines the core provider traits:
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`HistoryProvider`] - Historical net-value series
//! - [`SnapshotProvider`] - Real-time valuation estimates
//!
//! Providers are stateless: they build requests and parse responses, while
//! the network call goes through a caller-supplied [`Transport`].

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::{FetchFailure, Result},
    transport::{HttpRequest, Transport},
    types::{FundCode, FundSnapshot, HistorySeries},
};

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider, used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for historical net-value series.
///
/// Implementors usually only supply [`build_request`](Self::build_request)
/// and [`parse_response`](Self::parse_response); the provided
/// [`fetch_history`](Self::fetch_history) ties them to a transport.
#[async_trait]
pub trait HistoryProvider: DataProvider {
    /// Builds the request for `fund` over `[start, end]`.
    ///
    /// Providers without a known response shape return
    /// [`FetchFailure::NotImplemented`] here, before any network call.
    fn build_request(
        &self,
        fund: &FundCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HttpRequest>;

    /// Parses a raw response body into a normalized series.
    fn parse_response(&self, raw: &str, start: NaiveDate, end: NaiveDate) -> Result<HistorySeries>;

    /// Fetches the series for `fund` over `[start, end]`.
    ///
    /// Fails with [`FetchFailure::EmptyResult`] when the response parses but
    /// yields no rows in range.
    async fn fetch_history(
        &self,
        transport: &dyn Transport,
        fund: &FundCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HistorySeries> {
        let request = self.build_request(fund, start, end)?;
        tracing::debug!(provider = self.name(), url = %request.url, "Requesting history");

        let raw = transport.request(&request).await?;
        let series = self.parse_response(&raw, start, end)?;

        if series.is_empty() {
            return Err(FetchFailure::EmptyResult {
                fund: fund.to_string(),
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(series)
    }
}

/// Provider for real-time valuation estimates.
#[async_trait]
pub trait SnapshotProvider: DataProvider {
    /// Builds the quick-quote request for `fund`.
    fn build_snapshot_request(&self, fund: &FundCode) -> Result<HttpRequest>;

    /// Parses a quick-quote response body.
    fn parse_snapshot(&self, raw: &str) -> Result<FundSnapshot>;

    /// Fetches the current estimate for `fund` in a single attempt.
    async fn fetch_snapshot(
        &self,
        transport: &dyn Transport,
        fund: &FundCode,
    ) -> Result<FundSnapshot> {
        let request = self.build_snapshot_request(fund)?;
        tracing::debug!(provider = self.name(), url = %request.url, "Requesting snapshot");

        let raw = transport.request(&request).await?;
        self.parse_snapshot(&raw)
    }
}
