//! CoinGecko market-data adapter.

mod client;
mod dto;
mod settings;
mod transport;

pub use client::CoinGeckoClient;
pub use dto::{CoinMarket, MarketChart};
pub use settings::{CoinGeckoConfig, RetryPolicy};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
