//! marketsync - keep a local SQLite mirror of top crypto assets and their
//! daily history in step with an upstream market-data API.
//!
//! # Architecture
//!
//! The crate follows a ports-and-adapters layout:
//!
//! - [`domain`] - Provider-agnostic assets, observations, and sync summaries
//! - [`port`] - Traits for the market-data source, the store, and sync triggers
//! - [`application`] - The reconciling sync engine and the interval scheduler
//! - [`adapter`] - CoinGecko client, Diesel/SQLite store, and the CLI
//! - [`infrastructure`] - Configuration, logging, and runtime wiring
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `testkit` - Scripted transports, in-memory stores, and fixtures for tests
//!
//! # Example
//!
//! ```no_run
//! use marketsync::infrastructure::bootstrap;
//! use marketsync::infrastructure::config::settings::Config;
//!
//! # async fn run() -> marketsync::error::Result<()> {
//! let config = Config::load_or_default("config.toml")?;
//! let store = bootstrap::open_store(&config)?;
//! let engine = bootstrap::build_engine(&config, store)?;
//! let summary = engine.sync().await?;
//! println!("{} assets processed", summary.assets_processed());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
