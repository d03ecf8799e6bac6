//! Pure planning of store changes from fetched data.
//!
//! Nothing here touches the store or the network: given what is persisted
//! and what was fetched, these functions decide the minimal set of writes.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, trace};

use crate::domain::money;
use crate::domain::timestamp::to_calendar_date;
use crate::domain::{Asset, AssetId, AssetSnapshot, DailyObservation, ExternalId, HistorySeries};
use crate::port::outbound::store::{AssetBatch, AssetChange, AssetUpdate, ObservationBatch};

/// Decide what to do with one fetched snapshot.
///
/// A stored asset is rewritten only when its price moved or the snapshot
/// supplies a supply figure the record is missing. Supply figures absent
/// from the snapshot keep their stored value.
#[must_use]
pub fn plan_asset(existing: Option<&Asset>, snapshot: &AssetSnapshot) -> AssetChange {
    let Some(prior) = existing else {
        return AssetChange::Insert(snapshot.clone());
    };

    let price_changed = prior.price != snapshot.price;
    let fills_supply = snapshot.supply.fills_gap_in(&prior.supply);
    if !price_changed && !fills_supply {
        return AssetChange::Unchanged(snapshot.external_id.clone());
    }

    AssetChange::Update(AssetUpdate {
        external_id: snapshot.external_id.clone(),
        name: snapshot.name.clone(),
        price: snapshot.price,
        market_cap: snapshot.market_cap,
        volume: snapshot.volume,
        supply: snapshot.supply.merged_over(&prior.supply),
    })
}

/// Plan the snapshot phase for a whole response.
///
/// Changes keep the response order. A provider returning the same id twice
/// gets its first entry applied.
#[must_use]
pub fn plan_assets(
    existing: &[Asset],
    snapshots: &[AssetSnapshot],
    observed_at: DateTime<Utc>,
) -> AssetBatch {
    let by_id: HashMap<&ExternalId, &Asset> =
        existing.iter().map(|a| (&a.external_id, a)).collect();
    let mut seen: HashSet<&ExternalId> = HashSet::with_capacity(snapshots.len());
    let mut batch = AssetBatch::new(observed_at);

    for snapshot in snapshots {
        if !seen.insert(&snapshot.external_id) {
            debug!(asset = %snapshot.external_id, "Duplicate asset in snapshot, ignoring");
            continue;
        }
        let prior = by_id.get(&snapshot.external_id).copied();
        batch.changes.push(plan_asset(prior, snapshot));
    }

    batch
}

/// Staged history writes for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPlan {
    pub batch: ObservationBatch,
    /// Distinct dates that were already recorded.
    pub skipped: usize,
    /// Price points dropped for a missing value or unusable timestamp.
    pub invalid: usize,
}

/// Stage observations for dates not yet recorded.
///
/// Market cap and volume are taken from the entries whose raw timestamp
/// equals the price point's; without an exact match the field stays empty.
/// When the series has several points on one date, the first one (the
/// series is oldest first) is staged.
#[must_use]
pub fn plan_history(
    asset_id: AssetId,
    series: &HistorySeries,
    recorded: &HashSet<NaiveDate>,
) -> HistoryPlan {
    let caps = index_by_timestamp(&series.market_caps);
    let volumes = index_by_timestamp(&series.volumes);

    let mut staged: HashSet<NaiveDate> = HashSet::new();
    let mut skipped: HashSet<NaiveDate> = HashSet::new();
    let mut rows = Vec::new();
    let mut invalid = 0;

    for point in &series.prices {
        let date = match to_calendar_date(point.timestamp) {
            Ok(date) => date,
            Err(e) => {
                debug!(asset = %asset_id, error = %e, "Dropping history point");
                invalid += 1;
                continue;
            }
        };
        if recorded.contains(&date) {
            skipped.insert(date);
            continue;
        }
        if staged.contains(&date) {
            continue;
        }

        let Some(price) = point.value.and_then(|v| money::price(v).ok()) else {
            trace!(asset = %asset_id, %date, "History point without usable price");
            invalid += 1;
            continue;
        };

        let key = point.timestamp.to_bits();
        let market_cap = caps
            .get(&key)
            .and_then(|v| money::amount("market_cap", *v).ok());
        let volume = volumes
            .get(&key)
            .and_then(|v| money::amount("volume", *v).ok());

        staged.insert(date);
        rows.push(DailyObservation {
            asset_id,
            date,
            price,
            market_cap,
            volume,
        });
    }

    HistoryPlan {
        batch: ObservationBatch { asset_id, rows },
        skipped: skipped.len(),
        invalid,
    }
}

fn index_by_timestamp(points: &[crate::domain::SeriesPoint]) -> HashMap<u64, f64> {
    let mut index = HashMap::with_capacity(points.len());
    for point in points {
        if let Some(value) = point.value {
            index.entry(point.timestamp.to_bits()).or_insert(value);
        }
    }
    index
}
