//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to implement the application's use cases.

pub mod scheduler;
pub mod sync;

pub use scheduler::{ScheduleConfig, Scheduler};
pub use sync::{SyncEngine, SyncPhase, SyncSettings};
