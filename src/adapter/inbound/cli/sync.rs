//! Handler for the `sync` command.
//!
//! Runs one cycle in this process. A scheduler in a running `marketsync run`
//! is not consulted; concurrent writers to the same database are reconciled
//! by SQLite transactions, with colliding history rows counted as conflicts.

use serde_json::json;

use crate::adapter::inbound::cli::command::SyncArgs;
use crate::adapter::inbound::cli::output;
use crate::domain::{ExternalId, SyncSummary};
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

/// Run one cycle against the configured database and print the summary.
pub async fn execute(args: &SyncArgs, config: &Config) -> Result<()> {
    let store = bootstrap::open_store(config)?;
    let engine = bootstrap::build_engine(config, store)?;

    let summary = match &args.asset {
        Some(id) => engine.sync_asset(&ExternalId::new(id.trim())).await?,
        None => engine.sync().await?,
    };

    if args.json {
        output::json_output(json!({
            "command": "sync",
            "summary": summary,
        }));
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &SyncSummary) {
    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Assets");
    output::field("Inserted", summary.assets_inserted);
    output::field("Updated", summary.assets_updated);
    output::field("Unchanged", summary.assets_unchanged);

    output::section("Observations");
    output::field("Inserted", summary.observations_inserted);
    output::field("Skipped", summary.observations_skipped);
    if summary.observations_conflicted > 0 {
        output::field("Conflicted", summary.observations_conflicted);
    }

    if !summary.history_failures.is_empty() {
        output::section("Failures");
        for failure in &summary.history_failures {
            output::warning(&format!(
                "{} ({:?}): {}",
                failure.external_id, failure.stage, failure.reason
            ));
        }
    }

    println!();
    if summary.cancelled {
        output::warning("Cycle cancelled before all assets were processed");
    } else if summary.is_clean() {
        output::success("Sync complete");
    } else {
        output::warning("Sync finished with history failures");
    }
}
