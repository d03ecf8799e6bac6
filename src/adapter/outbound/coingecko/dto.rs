//! Wire types of the CoinGecko endpoints used here.

use serde::Deserialize;

use crate::domain::error::DomainError;
use crate::domain::{money, AssetSnapshot, ExternalId, HistorySeries, SeriesPoint, Supply};

/// One entry of `GET /coins/markets`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,
}

impl TryFrom<CoinMarket> for AssetSnapshot {
    type Error = DomainError;

    fn try_from(m: CoinMarket) -> Result<Self, Self::Error> {
        if m.id.trim().is_empty() {
            return Err(DomainError::EmptyExternalId);
        }
        let price = m.current_price.ok_or(DomainError::MissingValue {
            field: "current_price",
        })?;
        let market_cap = m.market_cap.ok_or(DomainError::MissingValue {
            field: "market_cap",
        })?;
        let volume = m.total_volume.ok_or(DomainError::MissingValue {
            field: "total_volume",
        })?;

        let supply = |field, value: Option<f64>| value.and_then(|v| money::supply(field, v).ok());
        let name = if m.name.is_empty() {
            m.id.clone()
        } else {
            m.name
        };

        Ok(AssetSnapshot {
            external_id: ExternalId::new(m.id),
            name,
            price: money::price(price)?,
            market_cap: money::amount("market_cap", market_cap)?,
            volume: money::amount("total_volume", volume)?,
            supply: Supply {
                circulating: supply("circulating_supply", m.circulating_supply),
                total: supply("total_supply", m.total_supply),
                max: supply("max_supply", m.max_supply),
            },
        })
    }
}

/// Body of `GET /coins/{id}/market_chart`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<(f64, Option<f64>)>,
    #[serde(default)]
    pub market_caps: Vec<(f64, Option<f64>)>,
    #[serde(default)]
    pub total_volumes: Vec<(f64, Option<f64>)>,
}

impl From<MarketChart> for HistorySeries {
    fn from(chart: MarketChart) -> Self {
        let points = |raw: Vec<(f64, Option<f64>)>| {
            raw.into_iter()
                .map(|(timestamp, value)| SeriesPoint { timestamp, value })
                .collect()
        };
        Self {
            prices: points(chart.prices),
            market_caps: points(chart.market_caps),
            volumes: points(chart.total_volumes),
        }
    }
}
