//! In-memory [`MarketStore`] with the same uniqueness rules as the SQLite
//! schema: one asset per external id, one observation per (asset, date).

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::domain::{Asset, AssetId, DailyObservation, DateRange, ExternalId};
use crate::error::Result;
use crate::port::outbound::store::{AssetBatch, AssetChange, MarketStore, ObservationBatch};

#[derive(Default)]
struct State {
    assets: Vec<Asset>,
    next_id: i32,
    observations: BTreeMap<(AssetId, NaiveDate), DailyObservation>,
    asset_commits: usize,
}

impl State {
    fn find(&self, id: &ExternalId) -> Option<&Asset> {
        self.assets.iter().find(|a| &a.external_id == id)
    }

    fn find_mut(&mut self, id: &ExternalId) -> Option<&mut Asset> {
        self.assets.iter_mut().find(|a| &a.external_id == id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset_count(&self) -> usize {
        self.state.lock().assets.len()
    }

    pub fn observation_count(&self) -> usize {
        self.state.lock().observations.len()
    }

    /// Number of `commit_assets` calls so far.
    pub fn asset_commits(&self) -> usize {
        self.state.lock().asset_commits
    }

    /// Full copy of the stored rows, for before/after comparisons.
    pub fn dump(&self) -> (Vec<Asset>, Vec<DailyObservation>) {
        let state = self.state.lock();
        (
            state.assets.clone(),
            state.observations.values().cloned().collect(),
        )
    }
}

impl MarketStore for MemoryStore {
    async fn find_assets(&self, ids: &[ExternalId]) -> Result<Vec<Asset>> {
        let state = self.state.lock();
        Ok(state
            .assets
            .iter()
            .filter(|a| ids.contains(&a.external_id))
            .cloned()
            .collect())
    }

    async fn commit_assets(&self, batch: &AssetBatch) -> Result<Vec<Asset>> {
        let mut state = self.state.lock();
        state.asset_commits += 1;
        let mut committed = Vec::with_capacity(batch.changes.len());

        for change in &batch.changes {
            match change {
                AssetChange::Insert(s) => {
                    if let Some(existing) = state.find_mut(&s.external_id) {
                        existing.name.clone_from(&s.name);
                        existing.price = s.price;
                        existing.market_cap = s.market_cap;
                        existing.volume = s.volume;
                        existing.supply = s.supply.merged_over(&existing.supply);
                        existing.last_updated = batch.observed_at;
                    } else {
                        state.next_id += 1;
                        let id = AssetId::new(state.next_id);
                        state.assets.push(Asset {
                            id,
                            external_id: s.external_id.clone(),
                            name: s.name.clone(),
                            price: s.price,
                            market_cap: s.market_cap,
                            volume: s.volume,
                            supply: s.supply,
                            last_updated: batch.observed_at,
                        });
                    }
                }
                AssetChange::Update(u) => {
                    if let Some(existing) = state.find_mut(&u.external_id) {
                        existing.name.clone_from(&u.name);
                        existing.price = u.price;
                        existing.market_cap = u.market_cap;
                        existing.volume = u.volume;
                        existing.supply = u.supply;
                        existing.last_updated = batch.observed_at;
                    }
                }
                AssetChange::Unchanged(_) => {}
            }
            if let Some(asset) = state.find(change.external_id()) {
                committed.push(asset.clone());
            }
        }
        Ok(committed)
    }

    async fn observed_dates(&self, asset: AssetId, range: DateRange) -> Result<HashSet<NaiveDate>> {
        let state = self.state.lock();
        Ok(state
            .observations
            .keys()
            .filter(|(id, date)| *id == asset && range.contains(*date))
            .map(|(_, date)| *date)
            .collect())
    }

    async fn insert_observations(&self, batch: &ObservationBatch) -> Result<usize> {
        let mut state = self.state.lock();
        let mut inserted = 0;
        for row in &batch.rows {
            let key = (row.asset_id, row.date);
            if !state.observations.contains_key(&key) {
                state.observations.insert(key, row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn asset(&self, external_id: &ExternalId) -> Result<Option<Asset>> {
        Ok(self.state.lock().find(external_id).cloned())
    }

    async fn assets_by_market_cap(&self, limit: usize) -> Result<Vec<Asset>> {
        let mut assets = self.state.lock().assets.clone();
        assets.sort_by(|a, b| b.market_cap.cmp(&a.market_cap));
        assets.truncate(limit);
        Ok(assets)
    }

    async fn observations(&self, asset: AssetId, range: DateRange) -> Result<Vec<DailyObservation>> {
        let state = self.state.lock();
        Ok(state
            .observations
            .iter()
            .filter(|((id, date), _)| *id == asset && range.contains(*date))
            .map(|(_, row)| row.clone())
            .collect())
    }
}
