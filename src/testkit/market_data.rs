//! In-memory [`MarketDataSource`] with scripted snapshots and histories.
//!
//! Builders configure the initial script; the `&self` mutators change it
//! between cycles so tests can simulate upstream drift.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{AssetSnapshot, ExternalId, HistorySeries, SeriesPoint, Supply};
use crate::error::FetchError;
use crate::port::outbound::market_data::MarketDataSource;

/// 2023-11-14T22:13:20Z in milliseconds.
pub const BASE_TIMESTAMP_MS: f64 = 1_700_000_000_000.0;

/// One day in milliseconds.
pub const DAY_MS: f64 = 86_400_000.0;

/// Snapshot with fixed cap/volume and a fully known supply.
pub fn snapshot(id: &str, price: Decimal) -> AssetSnapshot {
    AssetSnapshot {
        external_id: ExternalId::new(id),
        name: id.to_uppercase(),
        price,
        market_cap: dec!(1000000.00),
        volume: dec!(50000.00),
        supply: Supply {
            circulating: Some(dec!(1000)),
            total: Some(dec!(2000)),
            max: Some(dec!(2000)),
        },
    }
}

/// `days` consecutive daily points starting at [`BASE_TIMESTAMP_MS`].
pub fn daily_series(days: usize) -> HistorySeries {
    let points = |base: f64| {
        (0..days)
            .map(|i| SeriesPoint::new(BASE_TIMESTAMP_MS + i as f64 * DAY_MS, base + i as f64))
            .collect::<Vec<_>>()
    };
    HistorySeries {
        prices: points(100.0),
        market_caps: points(1_000_000.0),
        volumes: points(5_000.0),
    }
}

#[derive(Default)]
struct Script {
    assets: Vec<AssetSnapshot>,
    histories: HashMap<ExternalId, HistorySeries>,
    snapshot_failure: Option<FetchError>,
    history_failures: HashMap<ExternalId, FetchError>,
}

pub struct ScriptedMarketData {
    script: Mutex<Script>,
    history_calls: AtomicUsize,
}

impl ScriptedMarketData {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_assets(self, assets: Vec<AssetSnapshot>) -> Self {
        self.script.lock().assets = assets;
        self
    }

    pub fn with_history(self, id: &str, series: HistorySeries) -> Self {
        self.script.lock().histories.insert(ExternalId::new(id), series);
        self
    }

    pub fn with_daily_history(self, id: &str, days: usize) -> Self {
        self.with_history(id, daily_series(days))
    }

    pub fn failing_snapshot(self, err: FetchError) -> Self {
        self.script.lock().snapshot_failure = Some(err);
        self
    }

    pub fn failing_history(self, id: &str, err: FetchError) -> Self {
        self.script.lock().history_failures.insert(ExternalId::new(id), err);
        self
    }

    /// Multiply every history value of `id` by `factor`.
    pub fn scale_history(&self, id: &str, factor: f64) {
        let mut script = self.script.lock();
        if let Some(series) = script.histories.get_mut(&ExternalId::new(id)) {
            for point in series
                .prices
                .iter_mut()
                .chain(series.market_caps.iter_mut())
                .chain(series.volumes.iter_mut())
            {
                point.value = point.value.map(|v| v * factor);
            }
        }
    }

    pub fn set_price(&self, id: &str, price: Decimal) {
        self.update(id, |s| s.price = price);
    }

    pub fn set_supply(&self, id: &str, supply: Supply) {
        self.update(id, |s| s.supply = supply);
    }

    fn update(&self, id: &str, apply: impl Fn(&mut AssetSnapshot)) {
        let mut script = self.script.lock();
        script
            .assets
            .iter_mut()
            .filter(|s| s.external_id.as_str() == id)
            .for_each(apply);
    }

    /// Number of `fetch_history` calls so far.
    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for ScriptedMarketData {
    async fn fetch_top_assets(&self, n: usize) -> Result<Vec<AssetSnapshot>, FetchError> {
        let script = self.script.lock();
        if let Some(err) = &script.snapshot_failure {
            return Err(err.clone());
        }
        Ok(script.assets.iter().take(n).cloned().collect())
    }

    async fn fetch_history(
        &self,
        external_id: &ExternalId,
        _days: u32,
    ) -> Result<HistorySeries, FetchError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock();
        if let Some(err) = script.history_failures.get(external_id) {
            return Err(err.clone());
        }
        Ok(script.histories.get(external_id).cloned().unwrap_or_default())
    }

    async fn fetch_asset(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<AssetSnapshot>, FetchError> {
        let script = self.script.lock();
        if let Some(err) = &script.snapshot_failure {
            return Err(err.clone());
        }
        Ok(script
            .assets
            .iter()
            .find(|s| &s.external_id == external_id)
            .cloned())
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}
