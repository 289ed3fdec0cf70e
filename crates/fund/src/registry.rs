//! Fund data registry: ordered history providers with retry and fallback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use tokio::time::{Instant, timeout};
use tracing::{debug, error, info, warn};

use fund_core::{
    FetchFailure, FundCode, FundSnapshot, HistoryProvider, HistorySeries, HttpRequest,
    ProviderFailure, Result, RetryPolicy, SnapshotProvider, Transport, with_retry_until,
};

use crate::config::{FetchConfig, ProviderKind};

/// Default timeout for a single provider attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of a successful history fetch, with diagnostics for the providers
/// that were skipped on the way.
#[derive(Clone, Debug)]
pub struct HistoryReport {
    /// The non-empty series returned by the winning provider.
    pub series: HistorySeries,
    /// Name of the provider that produced `series`.
    pub provider: String,
    /// Failures of the providers tried before it, in priority order.
    pub failures: Vec<ProviderFailure>,
}

/// Registry of fund data providers with automatic fallback.
///
/// History providers are tried strictly in registration order. Each one is
/// run under the retry policy, every attempt is bounded by the attempt
/// timeout, and the first non-empty series wins. Later providers are never
/// invoked once one succeeds.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use fund::{FundCode, FundDataRegistry, HttpTransport};
/// use chrono::NaiveDate;
///
/// let registry = FundDataRegistry::new(Arc::new(HttpTransport::new()?))
///     .with_eastmoney()
///     .with_eastmoney_mobile();
///
/// let series = registry.get_history(
///     &FundCode::new("110022"),
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
/// ).await?;
/// ```
pub struct FundDataRegistry {
    transport: Arc<dyn Transport>,
    history_providers: Vec<Arc<dyn HistoryProvider>>,
    snapshot_provider: Option<Arc<dyn SnapshotProvider>>,
    retry: RetryPolicy,
    attempt_timeout: Duration,
    deadline: Option<Duration>,
}

impl std::fmt::Debug for FundDataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundDataRegistry")
            .field("transport", &self.transport)
            .field("history_providers", &self.history_provider_names())
            .field(
                "snapshot_provider",
                &self.snapshot_provider.as_ref().map(|p| p.name()),
            )
            .field("retry", &self.retry)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl FundDataRegistry {
    /// Create an empty registry that sends requests through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            history_providers: Vec::new(),
            snapshot_provider: None,
            retry: RetryPolicy::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            deadline: None,
        }
    }

    /// Create a registry from configuration.
    ///
    /// Providers are registered in the order listed in `config`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or names a provider whose cargo
    /// feature is disabled.
    pub fn from_config(transport: Arc<dyn Transport>, config: &FetchConfig) -> Result<Self> {
        config.validate()?;

        let mut registry = Self::new(transport)
            .with_retry_policy(config.retry_policy())
            .with_attempt_timeout(config.attempt_timeout());
        if let Some(deadline) = config.deadline() {
            registry = registry.with_deadline(deadline);
        }

        for kind in &config.providers {
            registry = registry.with_provider(*kind)?;
        }
        Ok(registry)
    }

    /// Register a history provider at the lowest priority.
    pub fn register_history(&mut self, provider: Arc<dyn HistoryProvider>) {
        debug!(provider = provider.name(), "Registering history provider");
        self.history_providers.push(provider);
    }

    /// Set the provider used for quick quotes.
    pub fn set_snapshot_provider(&mut self, provider: Arc<dyn SnapshotProvider>) {
        debug!(provider = provider.name(), "Setting snapshot provider");
        self.snapshot_provider = Some(provider);
    }

    /// Set the retry policy applied to each history provider.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the timeout for a single provider attempt.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Bound every history request by an overall budget.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Names of the registered history providers, highest priority first.
    #[must_use]
    pub fn history_provider_names(&self) -> Vec<&str> {
        self.history_providers.iter().map(|p| p.name()).collect()
    }

    /// Fetch the net-value history of `fund` over `[start, end]`.
    ///
    /// Returns the first non-empty series in provider order, or
    /// [`FetchFailure::AllProvidersFailed`] listing why each provider was
    /// skipped.
    pub async fn get_history(
        &self,
        fund: &FundCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HistorySeries> {
        self.get_history_with_report(fund, start, end)
            .await
            .map(|report| report.series)
    }

    /// Like [`get_history`](Self::get_history), but stops at `deadline` even
    /// if the configured budget is longer.
    pub async fn get_history_until(
        &self,
        fund: &FundCode,
        start: NaiveDate,
        end: NaiveDate,
        deadline: Instant,
    ) -> Result<HistorySeries> {
        let deadline = self
            .configured_deadline()
            .map_or(deadline, |configured| configured.min(deadline));
        self.fetch_with_fallback(fund, start, end, Some(deadline))
            .await
            .map(|report| report.series)
    }

    /// Like [`get_history`](Self::get_history), but also reports which
    /// provider answered and which ones failed before it.
    pub async fn get_history_with_report(
        &self,
        fund: &FundCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HistoryReport> {
        self.fetch_with_fallback(fund, start, end, self.configured_deadline())
            .await
    }

    /// Fetch several funds concurrently.
    ///
    /// Each fund runs its own independent fallback chain; results come back
    /// in input order.
    pub async fn get_history_batch(
        &self,
        funds: &[FundCode],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<(FundCode, Result<HistorySeries>)> {
        let futures = funds.iter().map(|fund| async move {
            let result = self.get_history(fund, start, end).await;
            (fund.clone(), result)
        });
        join_all(futures).await
    }

    /// Fetch the real-time valuation estimate for `fund`.
    ///
    /// Quick quotes are best-effort: a single attempt against the snapshot
    /// provider, with no retry or fallback.
    pub async fn get_snapshot(&self, fund: &FundCode) -> Result<FundSnapshot> {
        let provider = self.snapshot_provider.as_ref().ok_or_else(|| {
            FetchFailure::ProviderNotConfigured("No snapshot provider registered".to_string())
        })?;
        validate_fund(fund)?;

        info!(provider = provider.name(), fund = %fund, "Fetching snapshot");
        let result = match timeout(
            self.attempt_timeout,
            provider.fetch_snapshot(&self.bounded(self.attempt_timeout), fund),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchFailure::Timeout(self.attempt_timeout)),
        };

        match &result {
            Ok(snapshot) => info!(
                provider = provider.name(),
                fund = %fund,
                estimated_value = snapshot.estimated_value,
                "Snapshot fetched"
            ),
            Err(e) => error!(provider = provider.name(), fund = %fund, error = %e, "Snapshot failed"),
        }
        result
    }

    /// A budget too large to represent means no deadline.
    fn configured_deadline(&self) -> Option<Instant> {
        self.deadline
            .and_then(|budget| Instant::now().checked_add(budget))
    }

    fn bounded(&self, timeout: Duration) -> BoundedTransport<'_> {
        BoundedTransport {
            inner: self.transport.as_ref(),
            timeout,
        }
    }

    /// Timeout for the next attempt, clipped to the remaining deadline.
    fn attempt_budget(&self, deadline: Option<Instant>) -> Duration {
        deadline.map_or(self.attempt_timeout, |d| {
            self.attempt_timeout
                .min(d.saturating_duration_since(Instant::now()))
        })
    }

    async fn fetch_with_fallback(
        &self,
        fund: &FundCode,
        start: NaiveDate,
        end: NaiveDate,
        deadline: Option<Instant>,
    ) -> Result<HistoryReport> {
        if self.history_providers.is_empty() {
            return Err(FetchFailure::ProviderNotConfigured(
                "No history providers registered".to_string(),
            ));
        }
        validate_fund(fund)?;
        if start > end {
            return Err(FetchFailure::InvalidParameter(format!(
                "Start date {start} is after end date {end}"
            )));
        }

        let mut failures = Vec::new();
        for provider in &self.history_providers {
            let outcome = with_retry_until(&self.retry, deadline, move |attempt| async move {
                info!(provider = provider.name(), fund = %fund, attempt, "Fetching history");
                let budget = self.attempt_budget(deadline);
                let result = match timeout(
                    budget,
                    provider.fetch_history(&self.bounded(budget), fund, start, end),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(FetchFailure::Timeout(budget)),
                };
                if let Err(e) = &result {
                    error!(
                        provider = provider.name(),
                        fund = %fund,
                        attempt,
                        error = %e,
                        "History attempt failed"
                    );
                }
                result
            })
            .await;

            let reason = match outcome {
                Ok(series) if !series.is_empty() => {
                    info!(
                        provider = provider.name(),
                        fund = %fund,
                        rows = series.len(),
                        "History fetched"
                    );
                    return Ok(HistoryReport {
                        series,
                        provider: provider.name().to_string(),
                        failures,
                    });
                }
                Ok(_) => FetchFailure::EmptyResult {
                    fund: fund.to_string(),
                    start: start.to_string(),
                    end: end.to_string(),
                },
                Err(e) => e,
            };

            warn!(
                provider = provider.name(),
                fund = %fund,
                error = %reason,
                "Provider failed, trying next"
            );
            failures.push(ProviderFailure::new(provider.name(), reason));
        }

        Err(FetchFailure::AllProvidersFailed(failures))
    }

    #[allow(unreachable_patterns)]
    fn with_provider(self, kind: ProviderKind) -> Result<Self> {
        match kind {
            #[cfg(feature = "eastmoney")]
            ProviderKind::Eastmoney => Ok(self.with_eastmoney()),
            #[cfg(feature = "eastmoney")]
            ProviderKind::EastmoneyMobile => Ok(self.with_eastmoney_mobile()),
            #[cfg(feature = "sina")]
            ProviderKind::Sina => Ok(self.with_sina()),
            other => Err(FetchFailure::ProviderNotConfigured(format!(
                "{other} support is not compiled in"
            ))),
        }
    }
}

/// Transport view that gives every request the attempt's timeout.
#[derive(Debug)]
struct BoundedTransport<'a> {
    inner: &'a dyn Transport,
    timeout: Duration,
}

#[async_trait]
impl Transport for BoundedTransport<'_> {
    async fn request(&self, request: &HttpRequest) -> Result<String> {
        let request = request.clone().timeout(self.timeout);
        self.inner.request(&request).await
    }
}

fn validate_fund(fund: &FundCode) -> Result<()> {
    if fund.as_str().is_empty() {
        return Err(FetchFailure::InvalidParameter(
            "Fund code must not be empty".to_string(),
        ));
    }
    Ok(())
}

// Provider convenience methods
impl FundDataRegistry {
    /// Add the Eastmoney web provider for history, and for quick quotes if
    /// no snapshot provider is set yet.
    #[cfg(feature = "eastmoney")]
    #[must_use]
    pub fn with_eastmoney(mut self) -> Self {
        let provider = Arc::new(fund_eastmoney::EastmoneyProvider::new());
        self.register_history(provider.clone());
        if self.snapshot_provider.is_none() {
            self.set_snapshot_provider(provider);
        }
        self
    }

    /// Add the Eastmoney mobile history provider.
    #[cfg(feature = "eastmoney")]
    #[must_use]
    pub fn with_eastmoney_mobile(mut self) -> Self {
        self.register_history(Arc::new(fund_eastmoney::EastmoneyMobileProvider::new()));
        self
    }

    /// Add the Sina Finance provider.
    #[cfg(feature = "sina")]
    #[must_use]
    pub fn with_sina(mut self) -> Self {
        self.register_history(Arc::new(fund_sina::SinaProvider::new()));
        self
    }
}
