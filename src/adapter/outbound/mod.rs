//! Outbound adapters (driven side).

pub mod coingecko;
pub mod sqlite;
