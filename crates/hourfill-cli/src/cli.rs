use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use hourfill_core::config::CliConfigOverrides;
use hourfill_core::models::TimeUnit;
use std::path::PathBuf;

/// Hourfill - Backfill and refresh hourly series from the EIA API
#[derive(Parser, Debug)]
#[command(name = "hourfill")]
#[command(about = "Chunked backfill and incremental refresh of hourly time series", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show planned actions without executing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(flatten)]
    pub paths: PathArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// File locations shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// Configuration file (defaults to ./hourfill.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Series catalog (JSON)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Dataset CSV
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Run ledger CSV
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,
}

impl PathArgs {
    /// Overrides carrying only the path flags
    pub fn overrides(&self) -> CliConfigOverrides {
        CliConfigOverrides {
            catalog_path: self.catalog.clone(),
            data_path: self.data.clone(),
            ledger_path: self.ledger.clone(),
            ..CliConfigOverrides::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull a historical range for every catalog series
    Backfill(BackfillArgs),

    /// Fetch what became available since the last successful run
    Refresh(RefreshArgs),

    /// Show the refresh windows without fetching data
    Plan,

    /// Show the latest ledger entry per series
    Status(StatusArgs),

    /// Show the upstream coverage of the catalog route
    Probe,

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
pub struct BackfillArgs {
    /// First timestamp to pull (e.g. 2024-01-01T00)
    #[arg(long, value_parser = parse_timestamp)]
    pub start: NaiveDateTime,

    /// Last timestamp to pull, inclusive
    #[arg(long, value_parser = parse_timestamp)]
    pub end: NaiveDateTime,

    /// Create a new dataset and ledger instead of appending
    #[arg(long)]
    pub init: bool,

    /// Replace an existing ledger (requires --init)
    #[arg(long, requires = "init")]
    pub overwrite: bool,

    /// Chunk size in catalog units
    #[arg(long)]
    pub offset: Option<i64>,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Parser, Debug)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub tuning: TuningArgs,
}

/// Run tunables that can override the configuration
#[derive(Args, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Fraction of missing values still accepted as a successful run
    #[arg(long)]
    pub missing_tolerance: Option<f64>,

    /// Retries per page on transient upstream errors
    #[arg(long)]
    pub max_retries: Option<u32>,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// List every ledger entry instead of the latest per series
    #[arg(long)]
    pub history: bool,
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    TimeUnit::parse_period(s).map_err(|e| e.to_string())
}
