#![allow(dead_code)]

pub mod architecture;

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use marketsync::adapter::outbound::sqlite::{create_pool, run_migrations, SqliteMarketStore};
use marketsync::application::sync::{SyncEngine, SyncSettings};
use marketsync::testkit::market_data::ScriptedMarketData;

/// A migrated SQLite file in a temporary directory, removed on drop.
pub struct TempDb {
    dir: TempDir,
    path: PathBuf,
}

impl TempDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("marketsync.db");
        Self { dir, path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn url(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Open a fresh pool on the file and apply migrations.
    pub fn store(&self) -> Arc<SqliteMarketStore> {
        let pool = create_pool(&self.url()).expect("create pool");
        run_migrations(&pool).expect("run migrations");
        Arc::new(SqliteMarketStore::new(pool))
    }
}

/// Settings without pacing pauses.
pub fn fast_settings() -> SyncSettings {
    SyncSettings {
        pace_delay_ms: 0,
        ..Default::default()
    }
}

pub fn engine(
    source: Arc<ScriptedMarketData>,
    store: Arc<SqliteMarketStore>,
) -> SyncEngine<SqliteMarketStore> {
    SyncEngine::new(source, store, fast_settings())
}
