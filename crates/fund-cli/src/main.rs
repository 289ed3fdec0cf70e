//! `fund` CLI: real-time quotes, net-value history and popular funds.
//!
//! Commands:
//! - `quote` - print the intraday estimate for one or more funds
//! - `history` - fetch a net-value series with fallback and write it as CSV
//! - `popular` - list commonly watched funds with their names

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fund::ProviderKind;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fund", version, about = "Mutual-fund quotes and net-value history")]
struct Cli {
    /// Log debug output (default level is info). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the real-time valuation estimate for each fund.
    Quote {
        /// Fund codes (e.g., 110022 161725).
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Fetch the net-value history of a fund and write it as CSV.
    History {
        /// Fund code (e.g., 110022).
        code: String,

        /// Start date (YYYY-MM-DD). Defaults to 365 days before the end date.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Output CSV path. Defaults to {code}_data.csv.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// TOML file with fetch settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Providers to try in order, overriding the config file.
        #[arg(long, value_delimiter = ',')]
        providers: Option<Vec<ProviderKind>>,

        /// Attempts per provider, overriding the config file.
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Overall time budget in seconds, overriding the config file.
        #[arg(long)]
        deadline_secs: Option<u64>,
    },
    /// List commonly watched funds with their names.
    Popular,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Quote { codes } => commands::run_quote(&codes).await,
        Commands::History {
            code,
            start,
            end,
            output,
            config,
            providers,
            max_attempts,
            deadline_secs,
        } => {
            let mut fetch = commands::load_config(config.as_deref())?;
            if let Some(providers) = providers {
                fetch.providers = providers;
            }
            if let Some(max_attempts) = max_attempts {
                fetch.max_attempts = max_attempts;
            }
            if deadline_secs.is_some() {
                fetch.deadline_secs = deadline_secs;
            }
            commands::run_history(&code, start.as_deref(), end.as_deref(), output, &fetch).await
        }
        Commands::Popular => commands::run_popular().await,
    }
}

/// Log level used when `RUST_LOG` is unset.
const fn default_level(verbose: u8) -> &'static str {
    if verbose == 0 { "info" } else { "debug" }
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
