//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`market_data`]: `ScriptedMarketData`, a scripted upstream with
//!   snapshot/history builders and between-cycle mutators.
//! - [`store`]: `MemoryStore`, an in-memory store with the schema's
//!   uniqueness rules.
//! - [`transport`]: `ScriptedTransport`, canned HTTP replies for retry tests.
//! - [`trigger`]: `CountingTrigger`, a sync trigger that records invocations.

pub mod market_data;
pub mod store;
pub mod transport;
pub mod trigger;
