//! CoinGecko REST client.
//!
//! Two endpoints back the sync pipeline:
//! - `/coins/markets` for the current top-N snapshot (and single-asset lookups)
//! - `/coins/{id}/market_chart` for daily history
//!
//! Every request goes through [`CoinGeckoClient::get_json`], which applies
//! the bounded retry policy.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use super::dto::{CoinMarket, MarketChart};
use super::settings::{CoinGeckoConfig, RetryPolicy};
use super::transport::{HttpTransport, ReqwestTransport};
use crate::domain::{AssetSnapshot, ExternalId, HistorySeries};
use crate::error::{FetchError, Result};
use crate::port::outbound::market_data::MarketDataSource;

/// Hard upper bound of `per_page` on `/coins/markets`.
const MAX_PER_PAGE: usize = 250;

pub struct CoinGeckoClient {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    vs_currency: String,
    retry: RetryPolicy,
}

impl CoinGeckoClient {
    /// Create a client over an arbitrary transport.
    ///
    /// # Errors
    /// Returns an error if `config.base_url` is not a valid base URL.
    pub fn new(transport: Arc<dyn HttpTransport>, config: &CoinGeckoConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }
        Ok(Self {
            transport,
            base_url,
            vs_currency: config.vs_currency.clone(),
            retry: config.retry.clone(),
        })
    }

    /// Create a client that talks to the network through `reqwest`.
    ///
    /// # Errors
    /// Returns an error if `config.base_url` is not a valid base URL.
    pub fn from_config(config: &CoinGeckoConfig) -> Result<Self> {
        Self::new(Arc::new(ReqwestTransport::from_config(config)), config)
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut().extend_pairs(query);
        url
    }

    async fn get_json<T>(&self, url: &Url) -> std::result::Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let failure = match self.transport.get(url).await {
                Ok(response) if response.is_success() => {
                    return serde_json::from_str(&response.body)
                        .map_err(|e| FetchError::Decode(e.to_string()));
                }
                Ok(response) if response.is_rate_limited() => FetchError::RateLimited {
                    retry_after_secs: response.retry_after_secs,
                },
                Ok(response) => FetchError::Unavailable {
                    status: response.status,
                    attempts: attempt,
                },
                Err(err) => FetchError::Transport(err.0),
            };

            if attempt >= max_attempts {
                return Err(match failure {
                    FetchError::Unavailable { status, .. } => FetchError::Unavailable {
                        status,
                        attempts: attempt,
                    },
                    other => FetchError::ExhaustedRetries {
                        attempts: attempt,
                        last: other.to_string(),
                    },
                });
            }

            let delay = match &failure {
                FetchError::RateLimited { retry_after_secs } => {
                    self.retry.rate_limit_delay(*retry_after_secs)
                }
                _ => self.retry.error_delay(),
            };
            warn!(
                attempt,
                max_attempts,
                kind = ?failure.kind(),
                error = %failure,
                delay_ms = delay.as_millis() as u64,
                "Upstream request failed, retrying"
            );
            sleep(delay).await;
        }
    }

    fn into_snapshots(markets: Vec<CoinMarket>) -> Vec<AssetSnapshot> {
        let mut snapshots = Vec::with_capacity(markets.len());
        for market in markets {
            let id = market.id.clone();
            match AssetSnapshot::try_from(market) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => warn!(asset = %id, error = %err, "Dropping unusable snapshot entry"),
            }
        }
        snapshots
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn fetch_top_assets(&self, n: usize) -> std::result::Result<Vec<AssetSnapshot>, FetchError> {
        let per_page = n.clamp(1, MAX_PER_PAGE).to_string();
        let url = self.endpoint(
            &["coins", "markets"],
            &[
                ("vs_currency", self.vs_currency.as_str()),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
                ("sparkline", "false"),
            ],
        );

        info!(url = %url, n, "Fetching market snapshot");
        let markets: Vec<CoinMarket> = self.get_json(&url).await?;
        let received = markets.len();
        let mut snapshots = Self::into_snapshots(markets);
        snapshots.truncate(n);
        debug!(received, kept = snapshots.len(), "Fetched market snapshot");

        Ok(snapshots)
    }

    async fn fetch_history(
        &self,
        external_id: &ExternalId,
        days: u32,
    ) -> std::result::Result<HistorySeries, FetchError> {
        let days = days.to_string();
        let url = self.endpoint(
            &["coins", external_id.as_str(), "market_chart"],
            &[
                ("vs_currency", self.vs_currency.as_str()),
                ("days", days.as_str()),
                ("interval", "daily"),
            ],
        );

        debug!(asset = %external_id, url = %url, "Fetching history");
        let chart: MarketChart = self.get_json(&url).await?;
        Ok(chart.into())
    }

    async fn fetch_asset(
        &self,
        external_id: &ExternalId,
    ) -> std::result::Result<Option<AssetSnapshot>, FetchError> {
        let url = self.endpoint(
            &["coins", "markets"],
            &[
                ("vs_currency", self.vs_currency.as_str()),
                ("ids", external_id.as_str()),
                ("sparkline", "false"),
            ],
        );

        debug!(asset = %external_id, url = %url, "Fetching single asset");
        let markets: Vec<CoinMarket> = self.get_json(&url).await?;
        markets
            .into_iter()
            .find(|m| m.id == external_id.as_str())
            .map(|m| AssetSnapshot::try_from(m).map_err(|e| FetchError::Decode(e.to_string())))
            .transpose()
    }

    fn source_name(&self) -> &'static str {
        "CoinGecko"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::testkit::transport::ScriptedTransport;

    const ONE_MARKET: &str = r#"[{"id":"bitcoin","name":"Bitcoin","current_price":100.0,
        "market_cap":1000.0,"total_volume":10.0,"circulating_supply":19.0,
        "total_supply":21.0,"max_supply":21.0}]"#;

    fn assert_gap(earlier: Instant, later: Instant, expected: Duration) {
        let gap = later - earlier;
        assert!(
            gap >= expected && gap < expected + Duration::from_millis(10),
            "gap {gap:?}, expected {expected:?}"
        );
    }

    fn client(transport: &Arc<ScriptedTransport>) -> CoinGeckoClient {
        let config = CoinGeckoConfig {
            base_url: "https://api.example.test/api/v3".into(),
            ..Default::default()
        };
        CoinGeckoClient::new(transport.clone(), &config).unwrap()
    }

    #[test]
    fn endpoints_keep_the_base_path() {
        let transport = Arc::new(ScriptedTransport::new());
        let url = client(&transport).endpoint(&["coins", "bitcoin", "market_chart"], &[("days", "30")]);
        assert_eq!(
            url.as_str(),
            "https://api.example.test/api/v3/coins/bitcoin/market_chart?days=30"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = CoinGeckoConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        let transport: Arc<dyn HttpTransport> = Arc::new(ScriptedTransport::new());
        assert!(CoinGeckoClient::new(transport, &config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limits_back_off_then_succeed() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .rate_limited(None)
                .rate_limited(None)
                .ok(ONE_MARKET),
        );
        let client = client(&transport);
        let started = Instant::now();

        let snapshots = client.fetch_top_assets(10).await.unwrap();

        assert_eq!(snapshots.len(), 1);
        assert_eq!(transport.call_count(), 3);
        let times = transport.call_times();
        assert_gap(times[0], times[1], Duration::from_secs(5));
        assert_gap(times[1], times[2], Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_is_honored_and_capped() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .rate_limited(Some(2))
                .rate_limited(Some(10_000))
                .ok(ONE_MARKET),
        );
        let client = client(&transport);

        client.fetch_top_assets(1).await.unwrap();

        let times = transport.call_times();
        assert_gap(times[0], times[1], Duration::from_secs(2));
        assert_gap(times[1], times[2], Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_server_errors_become_unavailable() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .status(503)
                .status(502)
                .status(500),
        );
        let err = client(&transport).fetch_top_assets(10).await.unwrap_err();

        assert_eq!(
            err,
            FetchError::Unavailable {
                status: 500,
                attempts: 3
            }
        );
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_exhaust_retries() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fail("connection reset")
                .fail("connection reset")
                .fail("connection refused"),
        );
        let err = client(&transport)
            .fetch_history(&ExternalId::new("bitcoin"), 30)
            .await
            .unwrap_err();

        match err {
            FetchError::ExhaustedRetries { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("connection refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_exhaustion_is_exhausted_retries() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .rate_limited(None)
                .rate_limited(None)
                .rate_limited(None),
        );
        let err = client(&transport).fetch_top_assets(10).await.unwrap_err();
        assert!(matches!(err, FetchError::ExhaustedRetries { attempts: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_body_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new().ok("{\"oops\":").ok(ONE_MARKET));
        let err = client(&transport).fetch_top_assets(10).await.unwrap_err();

        assert_eq!(err.kind(), crate::error::FailureKind::Decode);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn unusable_entries_are_dropped() {
        let body = r#"[
            {"id":"good","name":"Good","current_price":1.0,"market_cap":2.0,"total_volume":3.0},
            {"id":"noprice","name":"No Price","current_price":null,"market_cap":2.0,"total_volume":3.0}
        ]"#;
        let transport = Arc::new(ScriptedTransport::new().ok(body));
        let snapshots = client(&transport).fetch_top_assets(10).await.unwrap();

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].external_id.as_str(), "good");
    }

    #[tokio::test]
    async fn history_request_targets_market_chart() {
        let body = r#"{"prices":[[1700000000000,35000.5]],"market_caps":[],"total_volumes":[]}"#;
        let transport = Arc::new(ScriptedTransport::new().ok(body));
        let series = client(&transport)
            .fetch_history(&ExternalId::new("bitcoin"), 30)
            .await
            .unwrap();

        assert_eq!(series.prices.len(), 1);
        let url = &transport.requests()[0];
        assert_eq!(url.path(), "/api/v3/coins/bitcoin/market_chart");
        assert!(url.query_pairs().any(|(k, v)| k == "days" && v == "30"));
        assert!(url.query_pairs().any(|(k, v)| k == "vs_currency" && v == "usd"));
    }

    #[tokio::test]
    async fn single_asset_lookup() {
        let transport = Arc::new(ScriptedTransport::new().ok(ONE_MARKET).ok("[]"));
        let client = client(&transport);

        let found = client.fetch_asset(&ExternalId::new("bitcoin")).await.unwrap();
        assert_eq!(found.map(|s| s.name), Some("Bitcoin".to_string()));

        let missing = client.fetch_asset(&ExternalId::new("nope")).await.unwrap();
        assert!(missing.is_none());
    }
}
