#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fund-data/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Unified interface for mutual-fund valuation data.
//!
//! This crate re-exports the core types and the provider implementations,
//! and provides a [`FundDataRegistry`] that tries history providers in
//! priority order with bounded retry and automatic fallback.
//!
//! # Features
//!
//! - `eastmoney` - Eastmoney web and mobile providers, and quick quotes
//! - `sina` - Sina Finance provider (registered, but not yet implemented)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fund::{FetchConfig, FundCode, FundDataRegistry, HttpTransport};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> fund::Result<()> {
//!     let transport = Arc::new(HttpTransport::new()?);
//!     let registry = FundDataRegistry::from_config(transport, &FetchConfig::default())?;
//!
//!     let fund = FundCode::new("110022");
//!     let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//!     let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
//!
//!     let series = registry.get_history(&fund, start, end).await?;
//!     println!("{:?}", series.to_dataframe()?);
//!
//!     let quote = registry.get_snapshot(&fund).await?;
//!     println!("{} {}", quote.name, quote.estimated_value);
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use fund_core::*;

// Transport
pub use fund_http::HttpTransport;

// Providers
#[cfg(feature = "eastmoney")]
pub use fund_eastmoney::{EastmoneyMobileProvider, EastmoneyProvider};
#[cfg(feature = "sina")]
pub use fund_sina::SinaProvider;

mod config;
pub use config::{FetchConfig, ProviderKind};

mod registry;
pub use registry::{DEFAULT_ATTEMPT_TIMEOUT, FundDataRegistry, HistoryReport};
