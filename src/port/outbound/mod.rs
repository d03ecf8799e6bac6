//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the upstream market-data provider and the
//! relational store.

pub mod market_data;
pub mod store;
