//! Implementations of ports (hexagonal adapters).
//!
//! - `inbound`: the `clap` command line that drives the application
//! - `outbound`: the CoinGecko market-data client and the SQLite store

pub mod inbound;
pub mod outbound;
