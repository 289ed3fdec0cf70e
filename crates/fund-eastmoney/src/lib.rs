#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fund-data/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Eastmoney fund data providers.
//!
//! This crate implements the [`HistoryProvider`] and [`SnapshotProvider`]
//! traits from `fund-core` for the public Eastmoney endpoints.
//!
//! # Example
//!
//! ```no_run
//! use fund_core::{FundCode, HistoryProvider, SnapshotProvider};
//! use fund_eastmoney::EastmoneyProvider;
//! use fund_http::HttpTransport;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> fund_core::Result<()> {
//! let transport = HttpTransport::new()?;
//! let provider = EastmoneyProvider::new();
//! let fund = FundCode::new("110022");
//!
//! let quote = provider.fetch_snapshot(&transport, &fund).await?;
//! println!("{} estimated at {}", quote.name, quote.estimated_value);
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
//! let series = provider.fetch_history(&transport, &fund, start, end).await?;
//! println!("Fetched {} rows", series.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use fund_core::{
    DataProvider, FetchFailure, FundCode, FundSnapshot, HistoryProvider, HistorySeries,
    HttpRequest, ParseFailure, RawRow, Result, SnapshotProvider, coerce_decimal, coerce_field, extract_json,
    normalize, parse_date,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

mod mobile;

pub use mobile::EastmoneyMobileProvider;

/// Historical net value (历史净值) API URL.
const LSJZ_URL: &str = "http://api.fund.eastmoney.com/f10/lsjz";

/// Referer expected by the history API.
const LSJZ_REFERER: &str = "http://fundf10.eastmoney.com/f10/jjjz_";

/// Real-time valuation estimate (估值) base URL.
const FUNDGZ_URL: &str = "http://fundgz.1234567.com.cn/js";

/// Default page size for the history API; large enough for several years.
const DEFAULT_PAGE_SIZE: u32 = 10_000;

/// Timeout for history requests.
const HISTORY_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for quick-quote requests.
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Format of the `gztime` field.
const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Eastmoney web provider.
///
/// Implements [`HistoryProvider`] over the `f10/lsjz` endpoint and
/// [`SnapshotProvider`] over the `fundgz` quick-quote endpoint.
#[derive(Debug, Clone)]
pub struct EastmoneyProvider {
    page_size: u32,
}

impl EastmoneyProvider {
    /// Create a provider with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of rows requested per call.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

impl Default for EastmoneyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for EastmoneyProvider {
    fn name(&self) -> &str {
        "eastmoney"
    }

    fn description(&self) -> &str {
        "Eastmoney web API: historical net values (lsjz) and real-time estimates (fundgz)"
    }
}

impl HistoryProvider for EastmoneyProvider {
    fn build_request(
        &self,
        fund: &FundCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HttpRequest> {
        if start > end {
            return Err(FetchFailure::InvalidParameter(format!(
                "Start date {start} is after end date {end}"
            )));
        }

        Ok(HttpRequest::get(LSJZ_URL)
            .query("callback", "jQuery")
            .query("fundCode", fund)
            .query("pageIndex", 1)
            .query("pageSize", self.page_size)
            .query("startDate", start.format("%Y-%m-%d"))
            .query("endDate", end.format("%Y-%m-%d"))
            .query("_", Utc::now().timestamp_millis())
            .header("Referer", format!("{LSJZ_REFERER}{fund}.html"))
            .timeout(HISTORY_TIMEOUT))
    }

    fn parse_response(&self, raw: &str, start: NaiveDate, end: NaiveDate) -> Result<HistorySeries> {
        let response: LsjzResponse = serde_json::from_value(extract_json(raw)?)
            .map_err(|e| FetchFailure::SchemaMismatch(e.to_string()))?;

        if let Some(code) = response.err_code.filter(|&c| c != 0) {
            return Err(FetchFailure::SchemaMismatch(format!(
                "API error {code}: {}",
                response.err_msg.unwrap_or_default()
            )));
        }

        let items = response
            .data
            .and_then(|d| d.lsjz_list)
            .ok_or_else(|| FetchFailure::SchemaMismatch("response has no Data.LSJZList".into()))?;

        debug!(
            rows = items.len(),
            total = response.total_count,
            "Parsed lsjz response"
        );

        let rows = items.iter().map(row_from_item).collect::<Result<Vec<_>>>()?;
        Ok(normalize(rows, start, end))
    }
}

impl SnapshotProvider for EastmoneyProvider {
    fn build_snapshot_request(&self, fund: &FundCode) -> Result<HttpRequest> {
        Ok(HttpRequest::get(format!("{FUNDGZ_URL}/{fund}.js")).timeout(SNAPSHOT_TIMEOUT))
    }

    fn parse_snapshot(&self, raw: &str) -> Result<FundSnapshot> {
        // Unknown codes come back as an empty `jsonpgz();` envelope.
        let value = extract_json(raw).map_err(|e| match e {
            ParseFailure::NoJsonFound => FetchFailure::SchemaMismatch("quote object absent".into()),
            other => FetchFailure::ParseFailure(other),
        })?;
        let quote = value
            .as_object()
            .ok_or_else(|| FetchFailure::SchemaMismatch("expected a JSON object".into()))?;

        let code = quote
            .get("fundcode")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchFailure::SchemaMismatch("missing fundcode".into()))?;

        let text = |key: &str| quote.get(key).and_then(Value::as_str).unwrap_or_default();
        let number = |key: &str| quote.get(key).map(coerce_decimal).unwrap_or(0.0);

        Ok(FundSnapshot {
            code: FundCode::new(code),
            name: text("name").to_string(),
            net_value_date: parse_date(text("jzrq")),
            last_net_value: number("dwjz"),
            estimated_value: number("gsz"),
            estimated_growth_rate: number("gszzl"),
            update_time: NaiveDateTime::parse_from_str(text("gztime"), UPDATE_TIME_FORMAT).ok(),
        })
    }
}

/// Maps one Eastmoney net value item (`FSRQ`, `DWJZ`, `LJJZ`, `JZZZL`) to a
/// raw row. Shared by the web and mobile APIs, which use the same keys.
pub(crate) fn row_from_item(item: &Map<String, Value>) -> Result<RawRow> {
    let date = item
        .get("FSRQ")
        .and_then(Value::as_str)
        .ok_or_else(|| FetchFailure::SchemaMismatch("item has no FSRQ date".into()))?;
    let net_value = item
        .get("DWJZ")
        .map(coerce_decimal)
        .ok_or_else(|| FetchFailure::SchemaMismatch("item has no DWJZ value".into()))?;

    Ok(RawRow {
        date: date.to_string(),
        net_value,
        cumulative_value: coerce_field(item.get("LJJZ")),
        growth_rate: coerce_field(item.get("JZZZL")),
    })
}

// ============================================================================
// Eastmoney API Response Types
// ============================================================================

/// History API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsjzResponse {
    data: Option<LsjzData>,
    #[serde(default)]
    err_code: Option<i64>,
    #[serde(default)]
    err_msg: Option<String>,
    #[serde(default)]
    total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LsjzData {
    #[serde(rename = "LSJZList")]
    lsjz_list: Option<Vec<Map<String, Value>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fund_core::{ParseFailure, Transport};

    const LSJZ_BODY: &str = r#"jQuery({"Data":{"LSJZList":[
        {"FSRQ":"2024-01-08","DWJZ":"1.2290","LJJZ":"3.4560","JZZZL":"-0.97","SGZT":"开放申购"},
        {"FSRQ":"2024-01-05","DWJZ":"1.2400","LJJZ":"3.4670","JZZZL":"0.49","SGZT":"开放申购"},
        {"FSRQ":"2024-01-03","DWJZ":"1.2340","LJJZ":"3.4610","JZZZL":"","SGZT":"开放申购"}
    ],"FundType":"001"},"ErrCode":0,"ErrMsg":null,"TotalCount":3,"PageSize":10000,"PageIndex":1})"#;

    const FUNDGZ_BODY: &str = r#"jsonpgz({"fundcode":"110022","name":"易方达消费行业股票","jzrq":"2024-01-08","dwjz":"3.1230","gsz":"3.1456","gszzl":"0.72","gztime":"2024-01-09 15:00"});"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[derive(Debug)]
    struct CannedTransport(&'static str);

    #[async_trait]
    impl Transport for CannedTransport {
        async fn request(&self, _request: &HttpRequest) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_build_request() {
        let provider = EastmoneyProvider::new();
        let request = provider
            .build_request(&FundCode::new("110022"), date(2024, 1, 1), date(2024, 1, 10))
            .unwrap();

        assert_eq!(request.url, LSJZ_URL);
        assert_eq!(request.query_value("fundCode"), Some("110022"));
        assert_eq!(request.query_value("startDate"), Some("2024-01-01"));
        assert_eq!(request.query_value("endDate"), Some("2024-01-10"));
        assert_eq!(request.query_value("pageSize"), Some("10000"));
        assert!(request.query_value("_").is_some());
        assert_eq!(
            request.header_value("Referer"),
            Some("http://fundf10.eastmoney.com/f10/jjjz_110022.html")
        );
        assert_eq!(request.timeout, HISTORY_TIMEOUT);
    }

    #[test]
    fn test_build_request_rejects_inverted_range() {
        let provider = EastmoneyProvider::new();
        let err = provider
            .build_request(&FundCode::new("110022"), date(2024, 2, 1), date(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, FetchFailure::InvalidParameter(_)));
    }

    #[test]
    fn test_parse_response() {
        let provider = EastmoneyProvider::new();
        let series = provider
            .parse_response(LSJZ_BODY, date(2024, 1, 1), date(2024, 1, 10))
            .unwrap();

        let rows = series.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, date(2024, 1, 3));
        assert_eq!(rows[0].net_value, 1.234);
        assert_eq!(rows[0].growth_rate, 0.0);
        assert_eq!(rows[1].cumulative_value, 3.467);
        assert_eq!(rows[2].date, date(2024, 1, 8));
        assert_eq!(rows[2].growth_rate, -0.97);
    }

    #[test]
    fn test_parse_response_filters_range() {
        let provider = EastmoneyProvider::new();
        let series = provider
            .parse_response(LSJZ_BODY, date(2024, 1, 4), date(2024, 1, 6))
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.rows()[0].date, date(2024, 1, 5));
    }

    #[test]
    fn test_parse_response_schema_mismatch() {
        let provider = EastmoneyProvider::new();
        let (start, end) = (date(2024, 1, 1), date(2024, 1, 10));

        let err = provider
            .parse_response(r#"jQuery({"Data":null,"ErrCode":0})"#, start, end)
            .unwrap_err();
        assert!(matches!(err, FetchFailure::SchemaMismatch(_)));

        let err = provider
            .parse_response(r#"jQuery({"Data":{"LSJZList":[{"DWJZ":"1.0"}]}})"#, start, end)
            .unwrap_err();
        assert!(matches!(err, FetchFailure::SchemaMismatch(_)));

        let err = provider
            .parse_response(r#"{"Data":null,"ErrCode":-999,"ErrMsg":"busy"}"#, start, end)
            .unwrap_err();
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn test_parse_response_not_json() {
        let provider = EastmoneyProvider::new();
        let err = provider
            .parse_response("<html>403</html>", date(2024, 1, 1), date(2024, 1, 10))
            .unwrap_err();
        assert!(matches!(
            err,
            FetchFailure::ParseFailure(ParseFailure::NoJsonFound)
        ));
    }

    #[test]
    fn test_parse_snapshot() {
        let provider = EastmoneyProvider::new();
        let quote = provider.parse_snapshot(FUNDGZ_BODY).unwrap();

        assert_eq!(quote.code.as_str(), "110022");
        assert_eq!(quote.name, "易方达消费行业股票");
        assert_eq!(quote.net_value_date, Some(date(2024, 1, 8)));
        assert_eq!(quote.last_net_value, 3.123);
        assert_eq!(quote.estimated_value, 3.1456);
        assert_eq!(quote.estimated_growth_rate, 0.72);
        assert_eq!(
            quote.update_time,
            Some(date(2024, 1, 9).and_hms_opt(15, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_snapshot_failures() {
        let provider = EastmoneyProvider::new();

        let err = provider.parse_snapshot("jsonpgz();").unwrap_err();
        assert!(matches!(err, FetchFailure::SchemaMismatch(_)));

        let err = provider.parse_snapshot(r#"jsonpgz({"fundcode":});"#).unwrap_err();
        assert!(matches!(
            err,
            FetchFailure::ParseFailure(ParseFailure::MalformedJson(_))
        ));

        let err = provider.parse_snapshot(r#"jsonpgz({"name":"x"});"#).unwrap_err();
        assert!(matches!(err, FetchFailure::SchemaMismatch(_)));

        let err = provider.parse_snapshot("[1,2]").unwrap_err();
        assert!(matches!(err, FetchFailure::SchemaMismatch(_)));
    }

    #[test]
    fn test_snapshot_request() {
        let provider = EastmoneyProvider::new();
        let request = provider
            .build_snapshot_request(&FundCode::new("110022"))
            .unwrap();
        assert_eq!(request.url, "http://fundgz.1234567.com.cn/js/110022.js");
        assert_eq!(request.timeout, SNAPSHOT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_fetch_through_transport() {
        let provider = EastmoneyProvider::new();
        let fund = FundCode::new("110022");

        let series = provider
            .fetch_history(
                &CannedTransport(LSJZ_BODY),
                &fund,
                date(2024, 1, 1),
                date(2024, 1, 10),
            )
            .await
            .unwrap();
        assert_eq!(series.len(), 3);

        let err = provider
            .fetch_history(
                &CannedTransport(r#"jQuery({"Data":{"LSJZList":[]},"ErrCode":0})"#),
                &fund,
                date(2024, 1, 1),
                date(2024, 1, 10),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FetchFailure::EmptyResult { .. }));

        let quote = provider
            .fetch_snapshot(&CannedTransport(FUNDGZ_BODY), &fund)
            .await
            .unwrap();
        assert_eq!(quote.code, fund);
    }

    #[test]
    fn test_provider_info() {
        let provider = EastmoneyProvider::default();
        assert_eq!(provider.name(), "eastmoney");
        assert!(!provider.description().is_empty());
    }
}
