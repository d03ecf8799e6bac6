//! Application configuration loading and validation.
//!
//! Every field has a default, so an empty file (or no file at all, via
//! [`Config::load_or_default`]) yields a working configuration. The database
//! path can be overridden with `DATABASE_URL`.
//!
//! # Example
//!
//! ```no_run
//! use marketsync::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.logging.init();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use url::Url;

use super::logging::LoggingConfig;
use crate::adapter::outbound::coingecko::CoinGeckoConfig;
use crate::application::scheduler::ScheduleConfig;
use crate::application::sync::SyncSettings;
use crate::error::{ConfigError, Result};

/// Environment variable that replaces [`Config::database`].
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Upstream caps `per_page` at this value.
const MAX_TOP_N: usize = 250;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub database: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Market-data API settings, including `[upstream.retry]`.
    #[serde(default)]
    pub upstream: CoinGeckoConfig,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_database_path() -> String {
    "marketsync.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            logging: LoggingConfig::default(),
            upstream: CoinGeckoConfig::default(),
            sync: SyncSettings::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document. Does not consult the environment.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, apply environment overrides, and validate.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config = Self::parse_toml(&content)?;
        config.with_database_override(std::env::var(DATABASE_URL_ENV).ok())
    }

    /// Like [`Config::load`], but a missing file means all defaults.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        Self::default().with_database_override(std::env::var(DATABASE_URL_ENV).ok())
    }

    /// Replace the database path when `database_url` is set and non-blank.
    #[allow(clippy::result_large_err)]
    pub fn with_database_override(mut self, database_url: Option<String>) -> Result<Self> {
        if let Some(url) = database_url.filter(|url| !url.trim().is_empty()) {
            self.database = url;
            self.validate()?;
        }
        Ok(self)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }

        if self.sync.top_n == 0 || self.sync.top_n > MAX_TOP_N {
            return Err(ConfigError::InvalidValue {
                field: "top_n",
                reason: format!("must be between 1 and {MAX_TOP_N}"),
            }
            .into());
        }
        if self.sync.history_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "history_days",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.sync.pace_every == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pace_every",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.schedule.job_name.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "job_name" }.into());
        }

        let upstream = &self.upstream;
        if let Err(e) = Url::parse(&upstream.base_url) {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: e.to_string(),
            }
            .into());
        }
        if upstream.vs_currency.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "vs_currency",
            }
            .into());
        }
        if upstream.timeout_ms == 0 || upstream.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms",
                reason: "timeouts must be greater than 0".to_string(),
            }
            .into());
        }
        if upstream.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if upstream.retry.max_delay_ms < upstream.retry.error_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "max_delay_ms",
                reason: "must be >= error_delay_ms".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
