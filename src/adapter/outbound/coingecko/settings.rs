//! CoinGecko client configuration.

use std::time::Duration;

use serde::Deserialize;

/// Bounded retry policy shared by every upstream request.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait after a 429 that carries no usable `Retry-After` header.
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    /// Wait after a non-2xx status or a transport error.
    #[serde(default = "default_error_delay_ms")]
    pub error_delay_ms: u64,
    /// Upper bound on any single wait, including upstream-suggested ones.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_rate_limit_delay_ms() -> u64 {
    5_000
}

const fn default_error_delay_ms() -> u64 {
    5_000
}

const fn default_max_delay_ms() -> u64 {
    120_000
}

impl RetryPolicy {
    /// Delay before retrying a rate-limited request.
    #[must_use]
    pub fn rate_limit_delay(&self, retry_after_secs: Option<u64>) -> Duration {
        let delay = retry_after_secs
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_millis(self.rate_limit_delay_ms));
        delay.min(Duration::from_millis(self.max_delay_ms))
    }

    /// Delay before retrying after a non-2xx status or transport error.
    #[must_use]
    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms.min(self.max_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            error_delay_ms: default_error_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Upstream API configuration (`[upstream]` table).
#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoConfig {
    /// API base URL, without a trailing endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Quote currency for prices, capitalization and volume.
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_base_url() -> String {
    "https://api.coingecko.com/api/v3".into()
}

fn default_vs_currency() -> String {
    "usd".into()
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            vs_currency: default_vs_currency(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }
}
