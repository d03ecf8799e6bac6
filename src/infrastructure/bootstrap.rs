//! Composition root: turns a [`Config`] into wired runtime components.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::coingecko::CoinGeckoClient;
use crate::adapter::outbound::sqlite::{create_pool, run_migrations, SqliteMarketStore};
use crate::application::scheduler::Scheduler;
use crate::application::sync::SyncEngine;
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Config;
use crate::port::inbound::sync::SyncTrigger;
use crate::port::outbound::market_data::MarketDataSource;

/// Open the configured database and bring its schema up to date.
pub fn open_store(config: &Config) -> Result<Arc<SqliteMarketStore>> {
    let pool = create_pool(&config.database)?;
    run_migrations(&pool)?;
    info!(database = %config.database, "Database ready");
    Ok(Arc::new(SqliteMarketStore::new(pool)))
}

/// Build a sync engine backed by the configured upstream and `store`.
pub fn build_engine(
    config: &Config,
    store: Arc<SqliteMarketStore>,
) -> Result<Arc<SyncEngine<SqliteMarketStore>>> {
    let client = CoinGeckoClient::from_config(&config.upstream)?;
    let source: Arc<dyn MarketDataSource> = Arc::new(client);
    info!(
        source = source.source_name(),
        top_n = config.sync.top_n,
        history_days = config.sync.history_days,
        "Sync engine configured"
    );
    Ok(Arc::new(SyncEngine::new(source, store, config.sync.clone())))
}

/// Register `engine` as the configured scheduled job. The scheduler is not
/// started.
pub fn build_scheduler(config: &Config, engine: Arc<dyn SyncTrigger>) -> Result<Scheduler> {
    let mut scheduler = Scheduler::new();
    if !scheduler.add_job(&config.schedule, engine) {
        return Err(ConfigError::InvalidValue {
            field: "job_name",
            reason: format!("job '{}' is already registered", config.schedule.job_name),
        }
        .into());
    }
    Ok(scheduler)
}
