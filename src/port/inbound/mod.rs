//! Inbound (driving) ports consumed by inbound adapters.
//!
//! - [`sync`]: the zero-argument sync entry point shared by the scheduler and
//!   manual triggers, plus cooperative cancellation.

pub mod sync;
