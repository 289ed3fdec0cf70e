//! Fetch configuration: which providers to use, in which order, and with
//! what retry and timeout budget.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fund_core::{FetchFailure, Result, RetryPolicy};

/// A provider that can be enabled from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Eastmoney web history API (`f10/lsjz`).
    Eastmoney,
    /// Eastmoney mobile history API.
    EastmoneyMobile,
    /// Sina Finance (not yet implemented).
    Sina,
}

impl ProviderKind {
    /// Returns the configuration name of this provider.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eastmoney => "eastmoney",
            Self::EastmoneyMobile => "eastmoney_mobile",
            Self::Sina => "sina",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = FetchFailure;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "eastmoney" => Ok(Self::Eastmoney),
            "eastmoney_mobile" => Ok(Self::EastmoneyMobile),
            "sina" => Ok(Self::Sina),
            other => Err(FetchFailure::InvalidParameter(format!(
                "Unknown provider: {other}. Supported: eastmoney, eastmoney_mobile, sina"
            ))),
        }
    }
}

/// Configuration for history fetching.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// providers = ["eastmoney_mobile", "eastmoney"]
/// max_attempts = 5
/// deadline_secs = 60
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Providers to try, highest priority first.
    pub providers: Vec<ProviderKind>,
    /// Attempts per provider, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts, in seconds.
    pub backoff_secs: u64,
    /// Timeout for a single attempt, in seconds.
    pub attempt_timeout_secs: u64,
    /// Overall budget for one history request, in seconds.
    pub deadline_secs: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            providers: vec![ProviderKind::Eastmoney, ProviderKind::EastmoneyMobile],
            max_attempts: retry.max_attempts,
            backoff_secs: retry.backoff.as_secs(),
            attempt_timeout_secs: 15,
            deadline_secs: None,
        }
    }
}

impl FetchConfig {
    /// Parses a configuration from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| FetchFailure::InvalidParameter(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(FetchFailure::InvalidParameter(
                "At least one provider must be configured".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(FetchFailure::InvalidParameter(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.attempt_timeout_secs == 0 {
            return Err(FetchFailure::InvalidParameter(
                "attempt_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the retry policy described by this configuration.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.backoff_secs))
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub const fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Returns the overall deadline budget, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(
            config.providers,
            vec![ProviderKind::Eastmoney, ProviderKind::EastmoneyMobile]
        );
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.attempt_timeout(), Duration::from_secs(15));
        assert!(config.deadline().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = FetchConfig::from_toml_str(
            r#"
            providers = ["eastmoney_mobile", "sina", "eastmoney"]
            max_attempts = 5
            deadline_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.providers[0], ProviderKind::EastmoneyMobile);
        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.backoff_secs, 2);
        assert_eq!(config.deadline(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_from_toml_rejects_bad_input() {
        assert!(FetchConfig::from_toml_str("providers = []").is_err());
        assert!(FetchConfig::from_toml_str(r#"providers = ["yahoo"]"#).is_err());
        assert!(FetchConfig::from_toml_str("max_attempts = 0").is_err());
        assert!(FetchConfig::from_toml_str("retries = 3").is_err());
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(
            "Eastmoney-Mobile".parse::<ProviderKind>().unwrap(),
            ProviderKind::EastmoneyMobile
        );
        assert_eq!(ProviderKind::Sina.to_string(), "sina");
        assert!("yahoo".parse::<ProviderKind>().is_err());
    }
}
