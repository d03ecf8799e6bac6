//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! # Architecture
//!
//! ```text
//!   Scheduler / CLI ──▶ SyncTrigger ──▶ SyncEngine
//!                                         │    │
//!                          MarketDataSource    MarketStore
//!                                 │                 │
//!                          CoinGecko client    SQLite store
//! ```

pub mod inbound;
pub mod outbound;

pub use inbound::sync::{CancelHandle, CancelSignal, SyncTrigger};
pub use outbound::market_data::MarketDataSource;
pub use outbound::store::{AssetBatch, AssetChange, AssetUpdate, MarketStore, ObservationBatch};
