//! SQLite persistence adapter.
//!
//! Implements [`MarketStore`](crate::port::outbound::store::MarketStore) on
//! top of Diesel with embedded migrations.

pub mod database;
pub mod store;

pub use database::connection::{create_pool, run_migrations, DbPool};
pub use store::SqliteMarketStore;
