//! Command implementations.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{Days, Local, NaiveDate};
use futures::future::join_all;
use polars::prelude::{CsvWriter, SerWriter};
use tracing::{info, warn};

use fund::{
    FetchConfig, FundCode, FundDataRegistry, FundSnapshot, HistoryReport, HistorySeries,
    HttpTransport, POPULAR_FUNDS,
};

/// Length of the history window when no start date is given.
const DEFAULT_WINDOW_DAYS: u64 = 365;

/// Reads fetch settings from `path`, or returns the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<FetchConfig> {
    let Some(path) = path else {
        return Ok(FetchConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    FetchConfig::from_toml_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn build_registry(config: &FetchConfig) -> Result<FundDataRegistry> {
    let transport = Arc::new(HttpTransport::new()?);
    let registry = FundDataRegistry::from_config(transport, config)?;
    info!(providers = ?registry.history_provider_names(), "Registry ready");
    Ok(registry)
}

/// Resolves the requested window, defaulting to the last year up to `today`.
fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = end.map(parse_date_arg).transpose()?.unwrap_or(today);
    let start = match start {
        Some(s) => parse_date_arg(s)?,
        None => end
            .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
            .context("end date is too early")?,
    };
    if start > end {
        bail!("start date {start} is after end date {end}");
    }
    Ok((start, end))
}

fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    fund::parse_date(s).with_context(|| format!("invalid date {s:?}, expected YYYY-MM-DD"))
}

fn default_output(fund: &FundCode) -> PathBuf {
    PathBuf::from(format!("{fund}_data.csv"))
}

/// Writes `series` to `path` as CSV with a header row.
fn write_csv(series: &HistorySeries, path: &Path) -> Result<()> {
    let mut df = series.to_dataframe()?;
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn format_snapshot(snapshot: &FundSnapshot) -> String {
    let nav_date = snapshot
        .net_value_date
        .map_or_else(|| "-".to_string(), |d| d.to_string());
    let updated = snapshot
        .update_time
        .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());

    format!(
        "{} {}\n  net value  {:.4} ({})\n  estimate   {:.4} ({:+.2}%) at {}",
        snapshot.code,
        snapshot.name,
        snapshot.last_net_value,
        nav_date,
        snapshot.estimated_value,
        snapshot.estimated_growth_rate,
        updated,
    )
}

fn summarize(fund: &FundCode, report: &HistoryReport) -> String {
    let series = &report.series;
    let mut summary = format!("{fund}: {} rows", series.len());
    if let Some((first, last)) = series.date_range() {
        summary.push_str(&format!(" from {first} to {last}"));
    }
    if let Some(latest) = series.latest() {
        summary.push_str(&format!(", latest net value {:.4}", latest.net_value));
    }
    summary.push_str(&format!(" (via {})", report.provider));
    summary
}

/// `fund quote`: one quick-quote per code, fetched concurrently.
pub(crate) async fn run_quote(codes: &[String]) -> Result<()> {
    let funds = codes
        .iter()
        .map(|c| c.parse::<FundCode>())
        .collect::<fund::Result<Vec<_>>>()?;
    let registry = build_registry(&FetchConfig::default())?;

    let results = join_all(funds.iter().map(|f| registry.get_snapshot(f))).await;

    let mut failed = 0;
    for (fund, result) in funds.iter().zip(results) {
        match result {
            Ok(snapshot) => println!("{}", format_snapshot(&snapshot)),
            Err(e) => {
                failed += 1;
                eprintln!("{fund}: {e}");
            }
        }
    }
    if failed == funds.len() {
        bail!("no quote could be fetched");
    }
    Ok(())
}

/// `fund history`: fetch with fallback, write CSV, print a summary.
pub(crate) async fn run_history(
    code: &str,
    start: Option<&str>,
    end: Option<&str>,
    output: Option<PathBuf>,
    config: &FetchConfig,
) -> Result<()> {
    let fund: FundCode = code.parse()?;
    let (start, end) = resolve_range(start, end, Local::now().date_naive())?;
    let registry = build_registry(config)?;

    let report = registry
        .get_history_with_report(&fund, start, end)
        .await
        .with_context(|| format!("failed to fetch history for {fund}"))?;
    for failure in &report.failures {
        warn!(provider = %failure.provider, error = %failure.reason, "Provider skipped");
    }

    let path = output.unwrap_or_else(|| default_output(&fund));
    write_csv(&report.series, &path)?;

    println!("{}", summarize(&fund, &report));
    println!("Saved to {}", path.display());
    Ok(())
}

/// `fund popular`: code and name of each popular fund whose quote succeeds.
pub(crate) async fn run_popular() -> Result<()> {
    let registry = build_registry(&FetchConfig::default())?;
    let funds: Vec<FundCode> = POPULAR_FUNDS.iter().map(|&c| FundCode::new(c)).collect();

    let results = join_all(funds.iter().map(|f| registry.get_snapshot(f))).await;

    println!("Popular funds:");
    for (fund, result) in funds.iter().zip(results) {
        match result {
            Ok(snapshot) => println!("  {fund}  {}", snapshot.name),
            Err(e) => warn!(fund = %fund, error = %e, "Quote failed"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fund::{CanonicalRow, FetchFailure, ProviderFailure, ProviderKind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series() -> HistorySeries {
        HistorySeries::from_rows(vec![
            CanonicalRow::new(date(2024, 1, 3), 1.234),
            CanonicalRow::new(date(2024, 1, 5), 1.24),
            CanonicalRow::new(date(2024, 1, 8), 1.229),
        ])
    }

    #[test]
    fn test_resolve_range_defaults_to_last_year() {
        let today = date(2024, 6, 30);
        let (start, end) = resolve_range(None, None, today).unwrap();
        assert_eq!(end, today);
        assert_eq!(start, date(2023, 7, 1));
    }

    #[test]
    fn test_resolve_range_explicit() {
        let today = date(2024, 6, 30);
        let (start, end) = resolve_range(Some("2024-01-01"), Some("2024-01-10"), today).unwrap();
        assert_eq!((start, end), (date(2024, 1, 1), date(2024, 1, 10)));

        let (start, _) = resolve_range(None, Some("2024-01-10"), today).unwrap();
        assert_eq!(start, date(2023, 1, 10));
    }

    #[test]
    fn test_resolve_range_rejects_bad_input() {
        let today = date(2024, 6, 30);
        assert!(resolve_range(Some("2024-02-01"), Some("2024-01-01"), today).is_err());
        assert!(resolve_range(Some("yesterday"), None, today).is_err());
    }

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(&FundCode::new("110022")),
            PathBuf::from("110022_data.csv")
        );
    }

    #[test]
    fn test_load_config_default_and_file() {
        assert_eq!(load_config(None).unwrap(), FetchConfig::default());

        let path = std::env::temp_dir().join(format!("fund-cli-config-{}.toml", std::process::id()));
        std::fs::write(&path, "providers = [\"eastmoney_mobile\"]\nmax_attempts = 1\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.providers, vec![ProviderKind::EastmoneyMobile]);
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_write_csv() {
        let path = std::env::temp_dir().join(format!("fund-cli-{}.csv", std::process::id()));

        write_csv(&series(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("date,net_value,cumulative_value,growth_rate")
        );
        assert!(lines.next().unwrap().starts_with("2024-01-03,1.234,"));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_summarize() {
        let report = HistoryReport {
            series: series(),
            provider: "eastmoney_mobile".to_string(),
            failures: vec![ProviderFailure::new(
                "eastmoney",
                FetchFailure::Unreachable("reset".into()),
            )],
        };

        assert_eq!(
            summarize(&FundCode::new("110022"), &report),
            "110022: 3 rows from 2024-01-03 to 2024-01-08, latest net value 1.2290 (via eastmoney_mobile)"
        );
    }

    #[test]
    fn test_format_snapshot() {
        let snapshot = FundSnapshot {
            code: FundCode::new("110022"),
            name: "易方达消费行业股票".to_string(),
            net_value_date: Some(date(2024, 1, 9)),
            last_net_value: 1.229,
            estimated_value: 1.2355,
            estimated_growth_rate: 0.53,
            update_time: date(2024, 1, 10).and_hms_opt(15, 0, 0),
        };

        let text = format_snapshot(&snapshot);

        assert!(text.starts_with("110022 易方达消费行业股票"));
        assert!(text.contains("1.2290 (2024-01-09)"));
        assert!(text.contains("1.2355 (+0.53%) at 2024-01-10 15:00"));
    }
}
