//! Outcome report of one synchronization cycle.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::ExternalId;

/// Where a per-asset history step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The upstream history request failed after retries.
    Fetch,
    /// Persisting the staged observations failed.
    Store,
}

/// A history step that did not complete for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryFailure {
    pub external_id: ExternalId,
    pub stage: FailureStage,
    pub reason: String,
}

/// Counts of what one history step did for one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryOutcome {
    /// Rows written.
    pub inserted: usize,
    /// Dates already recorded before this cycle.
    pub skipped: usize,
    /// Staged rows the store discarded on the (asset, date) constraint.
    pub conflicted: usize,
}

/// Summary of one sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub assets_inserted: usize,
    pub assets_updated: usize,
    pub assets_unchanged: usize,
    pub observations_inserted: usize,
    pub observations_skipped: usize,
    pub observations_conflicted: usize,
    pub history_failures: Vec<HistoryFailure>,
    /// True when the cycle stopped early at an asset boundary.
    pub cancelled: bool,
}

impl SyncSummary {
    /// Fold one asset's history outcome into the totals.
    pub fn absorb(&mut self, outcome: HistoryOutcome) {
        self.observations_inserted += outcome.inserted;
        self.observations_skipped += outcome.skipped;
        self.observations_conflicted += outcome.conflicted;
    }

    /// Assets whose snapshot was processed this cycle.
    #[must_use]
    pub fn assets_processed(&self) -> usize {
        self.assets_inserted + self.assets_updated + self.assets_unchanged
    }

    /// True when every asset's history step completed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.history_failures.is_empty() && !self.cancelled
    }
}
