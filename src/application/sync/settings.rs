//! Tunables of the sync cycle.

use std::time::Duration;

use serde::Deserialize;

/// Sync cycle configuration (`[sync]` table).
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    /// Number of top assets by market cap to track.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Days of history requested per asset.
    #[serde(default = "default_history_days")]
    pub history_days: u32,
    /// Pause after this many history requests.
    #[serde(default = "default_pace_every")]
    pub pace_every: usize,
    /// Length of the pacing pause in milliseconds.
    #[serde(default = "default_pace_delay_ms")]
    pub pace_delay_ms: u64,
}

const fn default_top_n() -> usize {
    10
}

const fn default_history_days() -> u32 {
    30
}

const fn default_pace_every() -> usize {
    3
}

const fn default_pace_delay_ms() -> u64 {
    10_000
}

impl SyncSettings {
    #[must_use]
    pub fn pace_delay(&self) -> Duration {
        Duration::from_millis(self.pace_delay_ms)
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            history_days: default_history_days(),
            pace_every: default_pace_every(),
            pace_delay_ms: default_pace_delay_ms(),
        }
    }
}
