#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fund-data/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Sina Finance fund data provider (stub).
//!
//! This crate provides a placeholder for Sina Finance net value history. It
//! can be registered in a fallback chain today and will be skipped without
//! consuming any retry budget or network traffic.
//!
//! # Example
//!
//! ```
//! use fund_core::{DataProvider, FundCode, HistoryProvider};
//! use fund_sina::SinaProvider;
//! use chrono::NaiveDate;
//!
//! let provider = SinaProvider::new();
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
//! assert!(provider.build_request(&FundCode::new("110022"), start, end).is_err());
//! ```

use chrono::NaiveDate;
use fund_core::{
    DataProvider, FetchFailure, FundCode, HistoryProvider, HistorySeries, HttpRequest, Result,
};

/// Sina Finance provider.
///
/// Stub until the `vip.stock.finance.sina.com.cn` net value feed is mapped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinaProvider;

impl SinaProvider {
    /// Creates a new Sina provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn not_implemented(&self) -> FetchFailure {
        FetchFailure::NotImplemented(format!("{} provider not yet implemented", self.name()))
    }
}

impl DataProvider for SinaProvider {
    fn name(&self) -> &str {
        "sina"
    }

    fn description(&self) -> &str {
        "Sina Finance fund net value history (not yet implemented)"
    }
}

impl HistoryProvider for SinaProvider {
    fn build_request(
        &self,
        _fund: &FundCode,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<HttpRequest> {
        Err(self.not_implemented())
    }

    fn parse_response(
        &self,
        _raw: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<HistorySeries> {
        Err(self.not_implemented())
    }
}
