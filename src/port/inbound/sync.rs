//! Entry point driven by schedulers and manual triggers.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::SyncSummary;
use crate::error::Result;

/// Cooperative cancellation observed at asset boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Option<watch::Receiver<bool>>);

impl CancelSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        Self(None)
    }

    /// Create a linked handle/signal pair.
    #[must_use]
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), CancelSignal(Some(rx)))
    }

    /// Observe an existing shutdown channel; `true` means cancelled.
    #[must_use]
    pub fn from_receiver(rx: watch::Receiver<bool>) -> Self {
        Self(Some(rx))
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

/// Sending half of a [`CancelSignal`].
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Something that runs one synchronization cycle.
#[async_trait]
pub trait SyncTrigger: Send + Sync {
    /// Run one cycle, stopping early at an asset boundary once `cancel`
    /// fires.
    async fn trigger(&self, cancel: CancelSignal) -> Result<SyncSummary>;
}
