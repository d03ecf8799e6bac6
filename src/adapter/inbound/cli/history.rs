//! Handler for the `history` command.

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::command::HistoryArgs;
use crate::adapter::inbound::cli::output;
use crate::domain::{DailyObservation, DateRange, ExternalId};
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::store::MarketStore;

#[derive(Tabled)]
struct ObservationRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Market Cap")]
    market_cap: String,
    #[tabled(rename = "Volume")]
    volume: String,
}

impl From<&DailyObservation> for ObservationRow {
    fn from(obs: &DailyObservation) -> Self {
        let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        Self {
            date: obs.date.to_string(),
            price: obs.price.to_string(),
            market_cap: or_dash(obs.market_cap.map(|v| v.to_string())),
            volume: or_dash(obs.volume.map(|v| v.to_string())),
        }
    }
}

/// Print stored observations for one asset, oldest first.
pub async fn execute(args: &HistoryArgs, config: &Config) -> Result<()> {
    if let (Some(from), Some(to)) = (args.from, args.to) {
        if from > to {
            return Err(Error::Parse(format!("--from {from} is after --to {to}")));
        }
    }

    let store = bootstrap::open_store(config)?;
    let external_id = ExternalId::new(args.id.trim());
    let asset = store
        .asset(&external_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no stored asset '{external_id}'")))?;

    let range = DateRange {
        from: args.from,
        to: args.to,
    };
    let observations = store.observations(asset.id, range).await?;

    if args.json {
        output::json_output(json!({
            "command": "history",
            "asset": &asset.external_id,
            "observations": observations,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section(&format!("{} ({})", asset.name, asset.external_id));
    if observations.is_empty() {
        output::note("No observations in range.");
        return Ok(());
    }
    let rows: Vec<ObservationRow> = observations.iter().map(ObservationRow::from).collect();
    output::lines(&Table::new(rows).to_string());
    Ok(())
}
