//! Eastmoney mobile app API provider.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use fund_core::{
    DataProvider, FetchFailure, FundCode, HistoryProvider, HistorySeries, HttpRequest, Result,
    extract_json, normalize,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::row_from_item;

/// Historical net value list endpoint of the mobile API.
const HIS_NET_LIST_URL: &str = "https://fundmobapi.eastmoney.com/FundMNewApi/FundMNHisNetList";

/// User agent of the Android app.
const MOBILE_USER_AGENT: &str = "okhttp/3.12.13";

/// Bounds for the requested page size.
const MIN_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 20_000;

const TIMEOUT: Duration = Duration::from_secs(15);

/// Eastmoney mobile API provider.
///
/// The endpoint returns the newest rows first and ignores date filters, so
/// the page size is sized to reach back to the requested start date and the
/// range is applied during normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct EastmoneyMobileProvider;

impl EastmoneyMobileProvider {
    /// Create a new mobile API provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Number of rows needed to reach back from `today` to `start`.
///
/// Calendar days over-count trading days, so this always covers the range.
fn page_size_for(start: NaiveDate, today: NaiveDate) -> i64 {
    ((today - start).num_days() + 1).clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

impl DataProvider for EastmoneyMobileProvider {
    fn name(&self) -> &str {
        "eastmoney_mobile"
    }

    fn description(&self) -> &str {
        "Eastmoney mobile app API: historical net values (FundMNHisNetList)"
    }
}

impl HistoryProvider for EastmoneyMobileProvider {
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

        let page_size = page_size_for(start, Utc::now().date_naive());
        Ok(HttpRequest::get(HIS_NET_LIST_URL)
            .query("FCODE", fund)
            .query("IsShareNet", "true")
            .query("appType", "ttjj")
            .query("product", "EFund")
            .query("plat", "Android")
            .query("deviceid", "fund-data")
            .query("Version", "1")
            .query("pageIndex", 1)
            .query("pagesize", page_size)
            .header("User-Agent", MOBILE_USER_AGENT)
            .timeout(TIMEOUT))
    }

    fn parse_response(&self, raw: &str, start: NaiveDate, end: NaiveDate) -> Result<HistorySeries> {
        let response: HisNetListResponse = serde_json::from_value(extract_json(raw)?)
            .map_err(|e| FetchFailure::SchemaMismatch(e.to_string()))?;

        if let Some(code) = response.err_code.filter(|&c| c != 0) {
            return Err(FetchFailure::SchemaMismatch(format!(
                "API error {code}: {}",
                response.err_msg.unwrap_or_default()
            )));
        }

        let items = response
            .datas
            .ok_or_else(|| FetchFailure::SchemaMismatch("response has no Datas".into()))?;
        debug!(rows = items.len(), "Parsed FundMNHisNetList response");

        let rows = items.iter().map(row_from_item).collect::<Result<Vec<_>>>()?;
        Ok(normalize(rows, start, end))
    }
}

/// Mobile history API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HisNetListResponse {
    datas: Option<Vec<Map<String, Value>>>,
    err_code: Option<i64>,
    err_msg: Option<String>,
}
