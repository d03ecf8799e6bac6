//! Upstream market-data port.

use async_trait::async_trait;

use crate::domain::{AssetSnapshot, ExternalId, HistorySeries};
use crate::error::FetchError;

/// Read-only access to an upstream market-data provider.
///
/// Implementations apply their own bounded retry policy. A returned
/// [`FetchError`] is final for that call; the caller decides whether to abort
/// or skip.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Top `n` assets ranked by market capitalization, descending.
    async fn fetch_top_assets(&self, n: usize) -> Result<Vec<AssetSnapshot>, FetchError>;

    /// Up to `days` of daily history for one asset.
    async fn fetch_history(
        &self,
        external_id: &ExternalId,
        days: u32,
    ) -> Result<HistorySeries, FetchError>;

    /// Current snapshot of a single asset, `None` if the provider does not
    /// know the id.
    async fn fetch_asset(&self, external_id: &ExternalId)
        -> Result<Option<AssetSnapshot>, FetchError>;

    /// Provider name for logging.
    fn source_name(&self) -> &'static str;
}
