//! Persistence port for assets and their daily observations.
//!
//! Writes go through explicit unit-of-work values: an [`AssetBatch`] holds
//! every asset change of one snapshot phase, an [`ObservationBatch`] holds the
//! staged history rows of one asset. Each is applied atomically.

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::money::{Amount, Price};
use crate::domain::{
    Asset, AssetId, AssetSnapshot, DailyObservation, DateRange, ExternalId, Supply,
};
use crate::error::Result;

/// New field values for an existing asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpdate {
    pub external_id: ExternalId,
    pub name: String,
    pub price: Price,
    pub market_cap: Amount,
    pub volume: Amount,
    /// Already merged with the prior supply values.
    pub supply: Supply,
}

/// What the snapshot phase decided for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetChange {
    Insert(AssetSnapshot),
    Update(AssetUpdate),
    Unchanged(ExternalId),
}

impl AssetChange {
    #[must_use]
    pub fn external_id(&self) -> &ExternalId {
        match self {
            Self::Insert(snapshot) => &snapshot.external_id,
            Self::Update(update) => &update.external_id,
            Self::Unchanged(id) => id,
        }
    }
}

/// Unit of work for the snapshot phase of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBatch {
    /// Written as `last_updated` on every inserted or updated row.
    pub observed_at: DateTime<Utc>,
    pub changes: Vec<AssetChange>,
}

impl AssetBatch {
    #[must_use]
    pub fn new(observed_at: DateTime<Utc>) -> Self {
        Self {
            observed_at,
            changes: Vec::new(),
        }
    }

    #[must_use]
    pub fn inserted(&self) -> usize {
        self.count(|c| matches!(c, AssetChange::Insert(_)))
    }

    #[must_use]
    pub fn updated(&self) -> usize {
        self.count(|c| matches!(c, AssetChange::Update(_)))
    }

    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(|c| matches!(c, AssetChange::Unchanged(_)))
    }

    /// True when applying the batch would write nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changes
            .iter()
            .all(|c| matches!(c, AssetChange::Unchanged(_)))
    }

    fn count(&self, pred: impl Fn(&AssetChange) -> bool) -> usize {
        self.changes.iter().filter(|c| pred(c)).count()
    }
}

/// Unit of work for the history phase of one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationBatch {
    pub asset_id: AssetId,
    pub rows: Vec<DailyObservation>,
}

impl ObservationBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Storage operations for assets and daily observations.
pub trait MarketStore: Send + Sync {
    /// Existing assets among `ids`. Unknown ids are simply absent.
    fn find_assets(&self, ids: &[ExternalId]) -> impl Future<Output = Result<Vec<Asset>>> + Send;

    /// Apply a snapshot batch in one transaction. Inserts are upserts keyed on
    /// the external id. Returns the persisted rows in batch order.
    fn commit_assets(&self, batch: &AssetBatch) -> impl Future<Output = Result<Vec<Asset>>> + Send;

    /// Dates already recorded for `asset` within `range`.
    fn observed_dates(
        &self,
        asset: AssetId,
        range: DateRange,
    ) -> impl Future<Output = Result<HashSet<NaiveDate>>> + Send;

    /// Insert staged observations in one transaction, silently discarding
    /// rows that collide on (asset, date). Returns the number inserted.
    fn insert_observations(
        &self,
        batch: &ObservationBatch,
    ) -> impl Future<Output = Result<usize>> + Send;

    /// Look up one asset by external id.
    fn asset(&self, external_id: &ExternalId) -> impl Future<Output = Result<Option<Asset>>> + Send;

    /// Stored assets ordered by market capitalization, largest first.
    fn assets_by_market_cap(&self, limit: usize) -> impl Future<Output = Result<Vec<Asset>>> + Send;

    /// Observations for `asset` within `range`, oldest first.
    fn observations(
        &self,
        asset: AssetId,
        range: DateRange,
    ) -> impl Future<Output = Result<Vec<DailyObservation>>> + Send;
}
