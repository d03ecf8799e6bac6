//! Sync engine: drives one reconciliation cycle against the ports.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::reconcile::{plan_assets, plan_history};
use super::settings::SyncSettings;
use crate::domain::{
    Asset, AssetSnapshot, ExternalId, FailureStage, HistoryFailure, HistoryOutcome, SyncSummary,
};
use crate::error::{Result, SyncError};
use crate::port::inbound::sync::{CancelSignal, SyncTrigger};
use crate::port::outbound::market_data::MarketDataSource;
use crate::port::outbound::store::{AssetBatch, MarketStore};

/// Where the engine is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    FetchingSnapshot,
    ReconcilingAssets,
    /// Fetching history for the asset at this position in the cycle.
    FetchingHistory(usize),
    ReconcilingHistory(usize),
}

/// Resets the phase to `Idle` however the cycle ends.
struct PhaseReset<'a>(&'a RwLock<SyncPhase>);

impl Drop for PhaseReset<'_> {
    fn drop(&mut self) {
        *self.0.write() = SyncPhase::Idle;
    }
}

/// Reconciles upstream market data into the store.
///
/// Every entry point takes the same cycle guard, so a manual trigger that
/// overlaps a scheduled run waits for it instead of interleaving writes.
pub struct SyncEngine<S> {
    source: Arc<dyn MarketDataSource>,
    store: Arc<S>,
    settings: SyncSettings,
    cycle: Mutex<()>,
    phase: RwLock<SyncPhase>,
}

impl<S: MarketStore> SyncEngine<S> {
    pub fn new(source: Arc<dyn MarketDataSource>, store: Arc<S>, settings: SyncSettings) -> Self {
        Self {
            source,
            store,
            settings,
            cycle: Mutex::new(()),
            phase: RwLock::new(SyncPhase::Idle),
        }
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        *self.phase.read()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run one full cycle, waiting for any cycle already in progress.
    ///
    /// # Errors
    /// [`SyncError::UpstreamUnavailable`] when the snapshot fetch fails (no
    /// rows are written), or a store error from the snapshot commit. History
    /// failures are reported in the summary instead.
    pub async fn sync(&self) -> Result<SyncSummary> {
        self.sync_with(CancelSignal::never()).await
    }

    /// Like [`Self::sync`], stopping at the next asset boundary once `cancel`
    /// fires.
    ///
    /// # Errors
    /// See [`Self::sync`].
    pub async fn sync_with(&self, cancel: CancelSignal) -> Result<SyncSummary> {
        let _cycle = self.cycle.lock().await;
        self.run_cycle(&cancel).await
    }

    /// Run one full cycle unless another is in progress.
    ///
    /// # Errors
    /// [`SyncError::AlreadyRunning`] if a cycle holds the guard, otherwise as
    /// [`Self::sync`].
    pub async fn try_sync(&self) -> Result<SyncSummary> {
        let Ok(_cycle) = self.cycle.try_lock() else {
            return Err(SyncError::AlreadyRunning.into());
        };
        self.run_cycle(&CancelSignal::never()).await
    }

    /// Snapshot and history sync for a single asset.
    ///
    /// # Errors
    /// [`SyncError::UnknownAsset`] if the provider does not list the id,
    /// otherwise as [`Self::sync`].
    pub async fn sync_asset(&self, external_id: &ExternalId) -> Result<SyncSummary> {
        let _cycle = self.cycle.lock().await;
        let _reset = self.enter(SyncPhase::FetchingSnapshot);
        let mut summary = SyncSummary {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        info!(asset = %external_id, source = self.source.source_name(), "Single-asset sync started");
        let snapshot = self
            .source
            .fetch_asset(external_id)
            .await
            .map_err(|e| {
                warn!(asset = %external_id, error = %e, "Snapshot fetch failed");
                SyncError::UpstreamUnavailable(e)
            })?
            .ok_or_else(|| SyncError::UnknownAsset(external_id.clone()))?;

        let assets = self.reconcile_assets(&[snapshot], &mut summary).await?;
        self.sync_histories(&assets, &CancelSignal::never(), &mut summary)
            .await;

        summary.finished_at = Some(Utc::now());
        Ok(summary)
    }

    async fn run_cycle(&self, cancel: &CancelSignal) -> Result<SyncSummary> {
        let _reset = self.enter(SyncPhase::FetchingSnapshot);
        let mut summary = SyncSummary {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        if cancel.is_cancelled() {
            summary.cancelled = true;
            summary.finished_at = summary.started_at;
            return Ok(summary);
        }

        info!(
            source = self.source.source_name(),
            top_n = self.settings.top_n,
            "Sync cycle started"
        );

        let snapshots = match self.source.fetch_top_assets(self.settings.top_n).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!(error = %e, "Snapshot fetch failed, aborting cycle");
                return Err(SyncError::UpstreamUnavailable(e).into());
            }
        };
        debug!(count = snapshots.len(), "Fetched asset snapshots");

        let assets = self.reconcile_assets(&snapshots, &mut summary).await?;
        self.sync_histories(&assets, cancel, &mut summary).await;

        summary.finished_at = Some(Utc::now());
        info!(
            assets_inserted = summary.assets_inserted,
            assets_updated = summary.assets_updated,
            assets_unchanged = summary.assets_unchanged,
            observations_inserted = summary.observations_inserted,
            observations_skipped = summary.observations_skipped,
            observations_conflicted = summary.observations_conflicted,
            history_failures = summary.history_failures.len(),
            cancelled = summary.cancelled,
            "Sync cycle finished"
        );
        Ok(summary)
    }

    async fn reconcile_assets(
        &self,
        snapshots: &[AssetSnapshot],
        summary: &mut SyncSummary,
    ) -> Result<Vec<Asset>> {
        self.set_phase(SyncPhase::ReconcilingAssets);

        let ids: Vec<ExternalId> = snapshots.iter().map(|s| s.external_id.clone()).collect();
        let existing = self.store.find_assets(&ids).await?;
        let batch = plan_assets(&existing, snapshots, Utc::now());

        let assets = match unchanged_assets(&batch, existing) {
            Some(assets) => {
                debug!(count = assets.len(), "Snapshot matches stored assets, skipping write");
                assets
            }
            None => self.store.commit_assets(&batch).await?,
        };
        summary.assets_inserted += batch.inserted();
        summary.assets_updated += batch.updated();
        summary.assets_unchanged += batch.unchanged();

        debug!(
            inserted = batch.inserted(),
            updated = batch.updated(),
            unchanged = batch.unchanged(),
            "Committed asset batch"
        );
        Ok(assets)
    }

    async fn sync_histories(
        &self,
        assets: &[Asset],
        cancel: &CancelSignal,
        summary: &mut SyncSummary,
    ) {
        let pace_every = self.settings.pace_every.max(1);
        let pace_delay = self.settings.pace_delay();

        for (index, asset) in assets.iter().enumerate() {
            if index > 0 && index % pace_every == 0 && !pace_delay.is_zero() {
                debug!(delay_ms = self.settings.pace_delay_ms, "Pacing history requests");
                tokio::time::sleep(pace_delay).await;
            }
            if cancel.is_cancelled() {
                info!(remaining = assets.len() - index, "Sync cancelled at asset boundary");
                summary.cancelled = true;
                break;
            }

            match self.sync_history(index, asset).await {
                Ok(outcome) => summary.absorb(outcome),
                Err(failure) => {
                    warn!(
                        asset = %failure.external_id,
                        stage = ?failure.stage,
                        reason = %failure.reason,
                        "History sync failed, continuing with next asset"
                    );
                    summary.history_failures.push(failure);
                }
            }
        }
    }

    async fn sync_history(
        &self,
        index: usize,
        asset: &Asset,
    ) -> std::result::Result<HistoryOutcome, HistoryFailure> {
        let failure = |stage, reason: String| HistoryFailure {
            external_id: asset.external_id.clone(),
            stage,
            reason,
        };

        self.set_phase(SyncPhase::FetchingHistory(index));
        let series = self
            .source
            .fetch_history(&asset.external_id, self.settings.history_days)
            .await
            .map_err(|e| failure(FailureStage::Fetch, e.to_string()))?;

        self.set_phase(SyncPhase::ReconcilingHistory(index));
        if series.is_empty() {
            debug!(asset = %asset.external_id, "Empty history series");
            return Ok(HistoryOutcome::default());
        }
        let Some(span) = series.date_span() else {
            debug!(asset = %asset.external_id, "No datable points in history series");
            return Ok(HistoryOutcome::default());
        };

        let recorded = self
            .store
            .observed_dates(asset.id, span)
            .await
            .map_err(|e| failure(FailureStage::Store, e.to_string()))?;
        let plan = plan_history(asset.id, &series, &recorded);

        let inserted = if plan.batch.is_empty() {
            0
        } else {
            self.store
                .insert_observations(&plan.batch)
                .await
                .map_err(|e| failure(FailureStage::Store, e.to_string()))?
        };

        let outcome = HistoryOutcome {
            inserted,
            skipped: plan.skipped,
            conflicted: plan.batch.len().saturating_sub(inserted),
        };
        debug!(
            asset = %asset.external_id,
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            conflicted = outcome.conflicted,
            invalid = plan.invalid,
            "History reconciled"
        );
        Ok(outcome)
    }

    fn enter(&self, phase: SyncPhase) -> PhaseReset<'_> {
        self.set_phase(phase);
        PhaseReset(&self.phase)
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.write() = phase;
    }
}

/// The stored rows in batch order when `batch` writes nothing, or `None` if
/// the batch has changes or names an asset missing from `existing`.
fn unchanged_assets(batch: &AssetBatch, existing: Vec<Asset>) -> Option<Vec<Asset>> {
    if !batch.is_noop() {
        return None;
    }
    let mut by_id: HashMap<ExternalId, Asset> = existing
        .into_iter()
        .map(|asset| (asset.external_id.clone(), asset))
        .collect();
    batch
        .changes
        .iter()
        .map(|change| by_id.remove(change.external_id()))
        .collect()
}

#[async_trait]
impl<S: MarketStore + 'static> SyncTrigger for SyncEngine<S> {
    async fn trigger(&self, cancel: CancelSignal) -> Result<SyncSummary> {
        self.sync_with(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetId, DateRange, HistorySeries, Supply};
    use crate::error::{Error, FetchError};
    use crate::port::outbound::store::AssetChange;
    use crate::testkit::market_data::{snapshot, ScriptedMarketData};
    use crate::testkit::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn settings() -> SyncSettings {
        SyncSettings {
            pace_delay_ms: 0,
            ..Default::default()
        }
    }

    fn engine(source: Arc<ScriptedMarketData>) -> SyncEngine<MemoryStore> {
        SyncEngine::new(source, Arc::new(MemoryStore::new()), settings())
    }

    fn three_assets() -> Arc<ScriptedMarketData> {
        Arc::new(
            ScriptedMarketData::new()
                .with_assets(vec![
                    snapshot("alpha", dec!(1)),
                    snapshot("beta", dec!(2)),
                    snapshot("gamma", dec!(3)),
                ])
                .with_daily_history("alpha", 5)
                .with_daily_history("beta", 5)
                .with_daily_history("gamma", 5),
        )
    }

    #[tokio::test]
    async fn first_sync_inserts_assets_and_history() {
        let engine = engine(three_assets());
        let summary = engine.sync().await.unwrap();

        assert_eq!(summary.assets_inserted, 3);
        assert_eq!(summary.observations_inserted, 15);
        assert!(summary.is_clean());
        assert_eq!(engine.store().asset_count(), 3);
        assert_eq!(engine.store().observation_count(), 15);
    }

    #[tokio::test]
    async fn second_sync_is_a_noop() {
        let engine = engine(three_assets());
        engine.sync().await.unwrap();
        let before = engine.store().dump();

        let summary = engine.sync().await.unwrap();
        assert_eq!(summary.assets_inserted, 0);
        assert_eq!(summary.assets_updated, 0);
        assert_eq!(summary.assets_unchanged, 3);
        assert_eq!(summary.observations_inserted, 0);
        assert_eq!(summary.observations_skipped, 15);
        assert_eq!(engine.store().dump(), before);
    }

    #[tokio::test]
    async fn unchanged_snapshot_skips_the_asset_write() {
        let engine = engine(three_assets());
        engine.sync().await.unwrap();
        assert_eq!(engine.store().asset_commits(), 1);

        let summary = engine.sync().await.unwrap();
        assert_eq!(summary.assets_unchanged, 3);
        assert_eq!(summary.observations_skipped, 15);
        assert_eq!(engine.store().asset_commits(), 1);
    }

    #[tokio::test]
    async fn changed_snapshot_is_committed() {
        let source = three_assets();
        let engine = engine(source.clone());
        engine.sync().await.unwrap();

        source.set_price("beta", dec!(2.5));
        let summary = engine.sync().await.unwrap();
        assert_eq!(summary.assets_updated, 1);
        assert_eq!(engine.store().asset_commits(), 2);
    }

    #[test]
    fn unchanged_assets_follow_batch_order() {
        let asset = |id: i32, ext: &str| Asset {
            id: AssetId::new(id),
            external_id: ExternalId::new(ext),
            name: ext.to_uppercase(),
            price: dec!(1),
            market_cap: dec!(1),
            volume: dec!(1),
            supply: Supply::default(),
            last_updated: Utc::now(),
        };
        let mut batch = AssetBatch::new(Utc::now());
        batch.changes = vec![
            AssetChange::Unchanged(ExternalId::new("beta")),
            AssetChange::Unchanged(ExternalId::new("alpha")),
        ];

        let ordered =
            unchanged_assets(&batch, vec![asset(1, "alpha"), asset(2, "beta")]).unwrap();
        let ids: Vec<&str> = ordered.iter().map(|a| a.external_id.as_str()).collect();
        assert_eq!(ids, vec!["beta", "alpha"]);

        assert!(unchanged_assets(&batch, vec![asset(1, "alpha")]).is_none());

        batch.changes.push(AssetChange::Insert(snapshot("gamma", dec!(3))));
        assert!(unchanged_assets(&batch, vec![asset(1, "alpha"), asset(2, "beta")]).is_none());
    }

    #[tokio::test]
    async fn empty_history_series_writes_nothing() {
        let source = Arc::new(
            ScriptedMarketData::new()
                .with_assets(vec![snapshot("alpha", dec!(1))])
                .with_history("alpha", HistorySeries::default()),
        );
        let engine = engine(source);

        let summary = engine.sync().await.unwrap();
        assert_eq!(summary.assets_inserted, 1);
        assert_eq!(summary.observations_inserted, 0);
        assert!(summary.is_clean());
        assert_eq!(engine.store().observation_count(), 0);
    }

    #[tokio::test]
    async fn snapshot_failure_aborts_without_writes() {
        let source = Arc::new(ScriptedMarketData::new().failing_snapshot(
            FetchError::ExhaustedRetries {
                attempts: 3,
                last: "HTTP 429".into(),
            },
        ));
        let engine = engine(source);

        let err = engine.sync().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Sync(SyncError::UpstreamUnavailable(_))
        ));
        assert_eq!(engine.store().asset_count(), 0);
        assert_eq!(engine.store().observation_count(), 0);
        assert_eq!(engine.phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn history_failure_is_isolated_to_one_asset() {
        let source = Arc::new(
            ScriptedMarketData::new()
                .with_assets(vec![
                    snapshot("alpha", dec!(1)),
                    snapshot("beta", dec!(2)),
                    snapshot("gamma", dec!(3)),
                ])
                .with_daily_history("alpha", 4)
                .failing_history(
                    "beta",
                    FetchError::Unavailable {
                        status: 500,
                        attempts: 3,
                    },
                )
                .with_daily_history("gamma", 4),
        );
        let engine = engine(source);

        let summary = engine.sync().await.unwrap();
        assert_eq!(summary.assets_inserted, 3);
        assert_eq!(summary.observations_inserted, 8);
        assert_eq!(summary.history_failures.len(), 1);
        assert_eq!(summary.history_failures[0].external_id.as_str(), "beta");
        assert_eq!(summary.history_failures[0].stage, FailureStage::Fetch);
    }

    #[tokio::test]
    async fn recorded_observations_are_never_rewritten() {
        let source = three_assets();
        let engine = engine(source.clone());
        engine.sync().await.unwrap();

        let alpha = engine
            .store()
            .asset(&ExternalId::new("alpha"))
            .await
            .unwrap()
            .unwrap();
        let before = engine
            .store()
            .observations(alpha.id, DateRange::all())
            .await
            .unwrap();

        source.scale_history("alpha", 10.0);
        engine.sync().await.unwrap();

        let after = engine
            .store()
            .observations(alpha.id, DateRange::all())
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn price_change_updates_asset_in_place() {
        let source = three_assets();
        let engine = engine(source.clone());
        engine.sync().await.unwrap();

        source.set_price("beta", dec!(2.5));
        let summary = engine.sync().await.unwrap();
        assert_eq!(summary.assets_updated, 1);
        assert_eq!(summary.assets_unchanged, 2);

        let beta = engine
            .store()
            .asset(&ExternalId::new("beta"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(beta.price, dec!(2.5));
        assert_eq!(engine.store().asset_count(), 3);
    }

    #[tokio::test]
    async fn missing_supply_preserves_stored_value() {
        let source = three_assets();
        let engine = engine(source.clone());
        engine.sync().await.unwrap();

        source.set_price("alpha", dec!(9));
        source.set_supply("alpha", Supply::default());
        engine.sync().await.unwrap();

        let alpha = engine
            .store()
            .asset(&ExternalId::new("alpha"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alpha.price, dec!(9));
        assert!(alpha.supply.circulating.is_some());
    }

    #[tokio::test]
    async fn cancelled_signal_stops_before_history() {
        let engine = engine(three_assets());
        let (handle, signal) = CancelSignal::pair();
        handle.cancel();

        let summary = engine.sync_with(signal).await.unwrap();
        assert!(summary.cancelled);
        assert_eq!(engine.store().asset_count(), 0);
    }

    #[tokio::test]
    async fn try_sync_refuses_while_a_cycle_runs() {
        let engine = engine(three_assets());
        let _held = engine.cycle.lock().await;
        let err = engine.try_sync().await.unwrap_err();
        assert!(matches!(err, Error::Sync(SyncError::AlreadyRunning)));
    }

    #[tokio::test]
    async fn sync_asset_handles_unknown_ids() {
        let engine = engine(three_assets());
        let err = engine
            .sync_asset(&ExternalId::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sync(SyncError::UnknownAsset(_))));

        let summary = engine.sync_asset(&ExternalId::new("beta")).await.unwrap();
        assert_eq!(summary.assets_inserted, 1);
        assert_eq!(summary.observations_inserted, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn history_requests_are_paced() {
        let source = Arc::new(
            ScriptedMarketData::new()
                .with_assets((0..7).map(|i| snapshot(&format!("a{i}"), dec!(1))).collect()),
        );
        let engine = SyncEngine::new(
            source.clone(),
            Arc::new(MemoryStore::new()),
            SyncSettings {
                pace_every: 3,
                pace_delay_ms: 10_000,
                ..Default::default()
            },
        );

        let start = tokio::time::Instant::now();
        engine.sync().await.unwrap();
        // Pauses before the 4th and 7th request.
        let elapsed = start.elapsed();
        assert!(elapsed >= std::time::Duration::from_secs(20));
        assert!(elapsed < std::time::Duration::from_secs(21));
        assert_eq!(source.history_calls(), 7);
    }
}
