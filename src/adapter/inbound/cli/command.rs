//! Command-line interface definitions.
//!
//! Every subcommand reads the same TOML configuration, selected with the
//! global `--config` flag.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Market-data synchronization pipeline
#[derive(Parser, Debug)]
#[command(name = "marketsync")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (defaults apply when it does not exist)
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler in the foreground until Ctrl-C
    Run,

    /// Run one sync cycle now and print its summary
    Sync(SyncArgs),

    /// List stored assets by market capitalization
    Assets(AssetsArgs),

    /// Show stored daily history for one asset
    History(HistoryArgs),

    /// Apply pending database migrations
    Migrate,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Refresh a single asset by upstream id instead of the top-N set
    #[arg(long, value_name = "ID")]
    pub asset: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AssetsArgs {
    /// Maximum number of assets to list
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Print assets as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Upstream asset id (e.g. "bitcoin")
    pub id: String,

    /// First date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,

    /// Print observations as JSON
    #[arg(long)]
    pub json: bool,
}
