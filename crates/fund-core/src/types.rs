//! Core data types for fund valuation data.
//!
//! This module defines the fundamental data structures:
//!
//! - [`FundCode`] - Fund identifier
//! - [`RawRow`] - Provider row before normalization
//! - [`CanonicalRow`] - Normalized daily valuation row
//! - [`HistorySeries`] - Ordered, date-unique series of canonical rows
//! - [`FundSnapshot`] - Real-time estimate from the quick-quote endpoint

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{FetchFailure, Result};

/// Funds that are commonly looked up, used for quick demos and listings.
pub const POPULAR_FUNDS: &[&str] = &["000001", "110022", "161725", "320003", "001594"];

/// A mutual-fund identifier (e.g. `110022`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FundCode(String);

impl FundCode {
    /// Creates a fund code, trimming surrounding whitespace.
    ///
    /// No format validation is applied; use [`str::parse`] for that.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_string())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FundCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FundCode {
    type Err = FetchFailure;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim();
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FetchFailure::InvalidParameter(format!(
                "Fund code must be six digits, got {s:?}"
            )));
        }
        Ok(Self(code.to_string()))
    }
}

impl From<&str> for FundCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FundCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A provider row after field mapping and numeric coercion, before date
/// validation, filtering and ordering.
///
/// `None` means the source does not carry the field at all, which is
/// different from a field that is present but empty (coerced to `0.0`).
#[derive(Clone, Debug, PartialEq)]
pub struct RawRow {
    /// Date as emitted by the source.
    pub date: String,
    /// Unit net asset value.
    pub net_value: f64,
    /// Cumulative net asset value.
    pub cumulative_value: Option<f64>,
    /// Daily growth rate in percent.
    pub growth_rate: Option<f64>,
}

impl RawRow {
    /// Creates a raw row carrying only a date and a unit value.
    #[must_use]
    pub fn new(date: impl Into<String>, net_value: f64) -> Self {
        Self {
            date: date.into(),
            net_value,
            cumulative_value: None,
            growth_rate: None,
        }
    }

    /// Sets the cumulative value.
    #[must_use]
    pub const fn with_cumulative_value(mut self, cumulative_value: f64) -> Self {
        self.cumulative_value = Some(cumulative_value);
        self
    }

    /// Sets the growth rate.
    #[must_use]
    pub const fn with_growth_rate(mut self, growth_rate: f64) -> Self {
        self.growth_rate = Some(growth_rate);
        self
    }
}

/// One normalized daily valuation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    /// Valuation date.
    pub date: NaiveDate,
    /// Unit net asset value.
    pub net_value: f64,
    /// Cumulative net asset value (equals `net_value` when the source lacks it).
    pub cumulative_value: f64,
    /// Daily change in percent.
    pub growth_rate: f64,
}

impl CanonicalRow {
    /// Creates a row whose cumulative value equals its net value and whose
    /// growth rate is zero.
    #[must_use]
    pub const fn new(date: NaiveDate, net_value: f64) -> Self {
        Self {
            date,
            net_value,
            cumulative_value: net_value,
            growth_rate: 0.0,
        }
    }

    /// Sets the cumulative value.
    #[must_use]
    pub const fn with_cumulative_value(mut self, cumulative_value: f64) -> Self {
        self.cumulative_value = cumulative_value;
        self
    }

    /// Sets the growth rate.
    #[must_use]
    pub const fn with_growth_rate(mut self, growth_rate: f64) -> Self {
        self.growth_rate = growth_rate;
        self
    }
}

/// A chronologically ascending series of [`CanonicalRow`]s with unique dates.
///
/// Every constructor enforces ordering; when two rows share a date the one
/// that appears later in the input wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    rows: Vec<CanonicalRow>,
}

impl HistorySeries {
    /// Creates an empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Builds a series from rows in any order.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = CanonicalRow>) -> Self {
        let by_date: BTreeMap<NaiveDate, CanonicalRow> =
            rows.into_iter().map(|row| (row.date, row)).collect();
        Self {
            rows: by_date.into_values().collect(),
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the rows as a slice.
    #[must_use]
    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    /// Returns an iterator over the rows.
    pub fn iter(&self) -> impl Iterator<Item = &CanonicalRow> {
        self.rows.iter()
    }

    /// Returns the first and last dates covered by the series.
    #[must_use]
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.rows.first()?.date, self.rows.last()?.date))
    }

    /// Returns the most recent row.
    #[must_use]
    pub fn latest(&self) -> Option<&CanonicalRow> {
        self.rows.last()
    }

    /// Consumes the series and returns the underlying vector.
    #[must_use]
    pub fn into_inner(self) -> Vec<CanonicalRow> {
        self.rows
    }

    /// Converts the series into a DataFrame.
    ///
    /// Columns: date (Date), net_value, cumulative_value, growth_rate.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
        let dates: Vec<i32> = self
            .rows
            .iter()
            .map(|r| (r.date - epoch).num_days() as i32)
            .collect();
        let net_values: Vec<f64> = self.rows.iter().map(|r| r.net_value).collect();
        let cumulative_values: Vec<f64> = self.rows.iter().map(|r| r.cumulative_value).collect();
        let growth_rates: Vec<f64> = self.rows.iter().map(|r| r.growth_rate).collect();

        let date_col = Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| FetchFailure::Other(e.to_string()))?;

        DataFrame::new(vec![
            date_col,
            Column::new("net_value".into(), net_values),
            Column::new("cumulative_value".into(), cumulative_values),
            Column::new("growth_rate".into(), growth_rates),
        ])
        .map_err(|e| FetchFailure::Other(e.to_string()))
    }
}

impl IntoIterator for HistorySeries {
    type Item = CanonicalRow;
    type IntoIter = std::vec::IntoIter<CanonicalRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a HistorySeries {
    type Item = &'a CanonicalRow;
    type IntoIter = std::slice::Iter<'a, CanonicalRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<CanonicalRow> for HistorySeries {
    fn from_iter<I: IntoIterator<Item = CanonicalRow>>(iter: I) -> Self {
        Self::from_rows(iter)
    }
}

/// Real-time valuation estimate for a fund.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundSnapshot {
    /// Fund code.
    pub code: FundCode,
    /// Fund display name.
    pub name: String,
    /// Date of the last published net value.
    pub net_value_date: Option<NaiveDate>,
    /// Last published unit net value.
    pub last_net_value: f64,
    /// Intraday estimated unit value.
    pub estimated_value: f64,
    /// Estimated growth rate in percent.
    pub estimated_growth_rate: f64,
    /// Time of the estimate, when the source reports a well-formed one.
    pub update_time: Option<NaiveDateTime>,
}
