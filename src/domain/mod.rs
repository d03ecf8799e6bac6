//! Provider-agnostic domain types for market-data synchronization.

pub mod asset;
pub mod error;
pub mod id;
pub mod money;
pub mod observation;
pub mod summary;
pub mod timestamp;

pub use asset::{Asset, AssetSnapshot, Supply};
pub use id::{AssetId, ExternalId};
pub use observation::{DailyObservation, DateRange, HistorySeries, SeriesPoint};
pub use summary::{FailureStage, HistoryFailure, HistoryOutcome, SyncSummary};
