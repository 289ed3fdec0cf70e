//! Normalization of provider rows into a [`HistorySeries`].
//!
//! Two rules here are deliberate policy, not error handling:
//!
//! - **Lenient numerics** ([`coerce_decimal`]): upstream feeds routinely send
//!   `""`, `"--"` or `null` for a value they do not have. A present but
//!   unparseable numeric field becomes `0.0` instead of failing the row.
//! - **Last row wins**: when a source emits the same date twice, the row that
//!   appears later in the response replaces the earlier one.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{CanonicalRow, HistorySeries, RawRow};

/// Date formats accepted from upstream sources, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Coerces a JSON field into a decimal.
///
/// Numbers pass through; strings are trimmed (a trailing `%` is ignored) and
/// parsed. Anything else, including empty or unparseable strings and `null`,
/// yields `0.0`.
#[must_use]
pub fn coerce_decimal(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Coerces an optional JSON field: `None` when the field is absent, otherwise
/// the result of [`coerce_decimal`].
#[must_use]
pub fn coerce_field(value: Option<&Value>) -> Option<f64> {
    value.map(coerce_decimal)
}

/// Parses a date in one of the formats upstream sources use.
///
/// Timestamps with a time component (`2024-01-08 15:00`) are truncated to
/// their date.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split([' ', 'T']).next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Normalizes raw provider rows into a series covering `[start, end]`.
///
/// Rows with an unparseable date or a negative net value are dropped. The
/// result is ascending by date with one row per date. A missing, negative or
/// non-finite cumulative value is replaced by the net value; a missing growth
/// rate is derived from the previous row's net value, or `0.0` when there is
/// none.
#[must_use]
pub fn normalize(rows: Vec<RawRow>, start: NaiveDate, end: NaiveDate) -> HistorySeries {
    let total = rows.len();
    let mut by_date: BTreeMap<NaiveDate, RawRow> = BTreeMap::new();

    for row in rows {
        let Some(date) = parse_date(&row.date) else {
            warn!(date = %row.date, "Dropping row with unparseable date");
            continue;
        };
        if !row.net_value.is_finite() || row.net_value < 0.0 {
            warn!(%date, net_value = row.net_value, "Dropping row with invalid net value");
            continue;
        }
        by_date.insert(date, row);
    }

    let mut previous_net: Option<f64> = None;
    let mut normalized = Vec::with_capacity(by_date.len());
    for (date, row) in by_date {
        let growth_rate = row.growth_rate.unwrap_or_else(|| match previous_net {
            Some(prev) if prev > 0.0 => (row.net_value / prev - 1.0) * 100.0,
            _ => 0.0,
        });
        previous_net = Some(row.net_value);

        if date < start || date > end {
            continue;
        }
        let cumulative_value = match row.cumulative_value {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            Some(v) => {
                warn!(%date, cumulative_value = v, "Replacing invalid cumulative value");
                row.net_value
            }
            None => row.net_value,
        };
        normalized.push(
            CanonicalRow::new(date, row.net_value)
                .with_cumulative_value(cumulative_value)
                .with_growth_rate(growth_rate),
        );
    }

    debug!(
        input = total,
        output = normalized.len(),
        %start,
        %end,
        "Normalized rows"
    );
    HistorySeries::from_rows(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_coerce_decimal() {
        assert_eq!(coerce_decimal(&json!("1.2340")), 1.234);
        assert_eq!(coerce_decimal(&json!(1.5)), 1.5);
        assert_eq!(coerce_decimal(&json!("-0.97")), -0.97);
        assert_eq!(coerce_decimal(&json!("0.72%")), 0.72);
        assert_eq!(coerce_decimal(&json!("")), 0.0);
        assert_eq!(coerce_decimal(&json!("--")), 0.0);
        assert_eq!(coerce_decimal(&Value::Null), 0.0);
        assert_eq!(coerce_field(None), None);
        assert_eq!(coerce_field(Some(&json!(""))), Some(0.0));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-08"), Some(date(2024, 1, 8)));
        assert_eq!(parse_date("2024/01/08"), Some(date(2024, 1, 8)));
        assert_eq!(parse_date("20240108"), Some(date(2024, 1, 8)));
        assert_eq!(parse_date("2024-01-08 15:00"), Some(date(2024, 1, 8)));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_normalize_sorts_and_filters() {
        let rows = vec![
            RawRow::new("2024-01-12", 1.30).with_growth_rate(0.1),
            RawRow::new("2024-01-08", 1.229).with_growth_rate(-0.97),
            RawRow::new("2023-12-29", 1.20).with_growth_rate(0.2),
            RawRow::new("2024-01-03", 1.234).with_growth_rate(0.3),
            RawRow::new("2024-01-05", 1.240).with_growth_rate(0.49),
        ];
        let series = normalize(rows, date(2024, 1, 1), date(2024, 1, 10));

        let dates: Vec<_> = series.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 3), date(2024, 1, 5), date(2024, 1, 8)]
        );
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_normalize_range_is_inclusive() {
        let rows = vec![
            RawRow::new("2024-01-01", 1.0),
            RawRow::new("2024-01-10", 1.1),
            RawRow::new("2024-01-11", 1.2),
        ];
        let series = normalize(rows, date(2024, 1, 1), date(2024, 1, 10));
        assert_eq!(series.len(), 2);
        assert!(
            series
                .iter()
                .all(|r| r.date >= date(2024, 1, 1) && r.date <= date(2024, 1, 10))
        );
    }

    #[test]
    fn test_normalize_duplicate_dates_keep_last() {
        let rows = vec![
            RawRow::new("2024-01-05", 1.0),
            RawRow::new("2024-01-03", 0.9),
            RawRow::new("2024-01-05", 2.0),
        ];
        let series = normalize(rows, date(2024, 1, 1), date(2024, 1, 31));
        assert_eq!(series.len(), 2);
        assert_eq!(series.rows()[1].net_value, 2.0);
    }

    #[test]
    fn test_empty_growth_string_is_zero() {
        let item = json!({"FSRQ": "2024-01-03", "DWJZ": "1.234", "JZZZL": ""});
        let row = RawRow {
            date: "2024-01-03".to_string(),
            net_value: coerce_decimal(&item["DWJZ"]),
            cumulative_value: coerce_field(item.get("LJJZ")),
            growth_rate: coerce_field(item.get("JZZZL")),
        };
        let series = normalize(vec![row], date(2024, 1, 1), date(2024, 1, 10));
        assert_eq!(series.len(), 1);
        assert_eq!(series.rows()[0].growth_rate, 0.0);
        assert_eq!(series.rows()[0].cumulative_value, 1.234);
    }

    #[test]
    fn test_missing_growth_is_derived() {
        let rows = vec![
            RawRow::new("2024-01-02", 1.00),
            RawRow::new("2024-01-03", 1.10),
        ];
        let series = normalize(rows, date(2024, 1, 1), date(2024, 1, 10));
        assert_eq!(series.rows()[0].growth_rate, 0.0);
        assert!((series.rows()[1].growth_rate - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_derivation_uses_rows_before_range() {
        let rows = vec![
            RawRow::new("2023-12-29", 2.0),
            RawRow::new("2024-01-02", 2.2),
        ];
        let series = normalize(rows, date(2024, 1, 1), date(2024, 1, 10));
        assert_eq!(series.len(), 1);
        assert!((series.rows()[0].growth_rate - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_rows_dropped() {
        let rows = vec![
            RawRow::new("not a date", 1.0),
            RawRow::new("2024-01-04", -1.0),
            RawRow::new("2024-01-05", 1.0),
        ];
        let series = normalize(rows, date(2024, 1, 1), date(2024, 1, 10));
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_invalid_cumulative_falls_back_to_net_value() {
        let rows = vec![
            RawRow::new("2024-01-04", 1.1).with_cumulative_value(-1.0),
            RawRow::new("2024-01-05", 1.2).with_cumulative_value(f64::NAN),
            RawRow::new("2024-01-08", 1.3).with_cumulative_value(3.4),
        ];
        let series = normalize(rows, date(2024, 1, 1), date(2024, 1, 10));

        let cumulative: Vec<_> = series.iter().map(|r| r.cumulative_value).collect();
        assert_eq!(cumulative, vec![1.1, 1.2, 3.4]);
        assert!(series.iter().all(|r| r.cumulative_value >= 0.0));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let rows = vec![RawRow::new("2024-01-05", 1.0)];
        let series = normalize(rows, date(2024, 1, 10), date(2024, 1, 1));
        assert!(series.is_empty());
    }
}
