//! Handler for the `assets` command.

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::command::AssetsArgs;
use crate::adapter::inbound::cli::output;
use crate::domain::Asset;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::store::MarketStore;

#[derive(Tabled)]
struct AssetRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "ID")]
    external_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Market Cap")]
    market_cap: String,
    #[tabled(rename = "Volume")]
    volume: String,
    #[tabled(rename = "Updated")]
    last_updated: String,
}

impl AssetRow {
    fn new(rank: usize, asset: &Asset) -> Self {
        Self {
            rank,
            external_id: asset.external_id.to_string(),
            name: asset.name.clone(),
            price: asset.price.to_string(),
            market_cap: asset.market_cap.to_string(),
            volume: asset.volume.to_string(),
            last_updated: asset.last_updated.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// List stored assets, largest market capitalization first.
pub async fn execute(args: &AssetsArgs, config: &Config) -> Result<()> {
    let store = bootstrap::open_store(config)?;
    let assets = store.assets_by_market_cap(args.limit).await?;

    if args.json {
        output::json_output(json!({
            "command": "assets",
            "assets": assets,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    if assets.is_empty() {
        output::note("No assets stored yet. Run `marketsync sync` first.");
        return Ok(());
    }

    output::section("Assets by market cap");
    let rows = assets
        .iter()
        .enumerate()
        .map(|(i, asset)| AssetRow::new(i + 1, asset));
    output::lines(&Table::new(rows).to_string());
    Ok(())
}
