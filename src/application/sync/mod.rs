//! The synchronization pipeline.
//!
//! # Cycle
//!
//! ```text
//! Idle ─▶ FetchingSnapshot ─▶ ReconcilingAssets ─┬▶ FetchingHistory(i) ─▶ ReconcilingHistory(i) ─┐
//!  ▲                │                             └───────────────────◀─── next asset ◀─────────┘
//!  └── snapshot failure (no writes)                                         │
//!  └────────────────────────────────────────────────────────────────── done / cancelled
//! ```
//!
//! [`reconcile`] holds the pure planning functions; [`engine`] drives a
//! cycle against the ports.

pub mod engine;
pub mod reconcile;
pub mod settings;

pub use engine::{SyncEngine, SyncPhase};
pub use settings::SyncSettings;
