//! [`SyncTrigger`] double that counts invocations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::SyncSummary;
use crate::error::Result;
use crate::port::inbound::sync::{CancelSignal, SyncTrigger};

#[derive(Default)]
pub struct CountingTrigger {
    calls: AtomicUsize,
    cancelled: AtomicUsize,
    work: Duration,
}

impl CountingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend `work` (tokio time) inside every run.
    pub fn with_work(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Runs that saw their cancel signal fire by the time they finished.
    pub fn cancelled_runs(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncTrigger for CountingTrigger {
    async fn trigger(&self, cancel: CancelSignal) -> Result<SyncSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        let cancelled = cancel.is_cancelled();
        if cancelled {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
        Ok(SyncSummary {
            started_at: Some(Utc::now()),
            finished_at: Some(Utc::now()),
            cancelled,
            ..Default::default()
        })
    }
}
