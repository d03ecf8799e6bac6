//! Daily observations and the raw history series they are built from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::AssetId;
use super::money::{Amount, Price};
use super::timestamp::to_calendar_date;

/// One `[timestamp, value]` pair from a history series.
///
/// The timestamp is kept raw so market-cap and volume entries can be matched
/// to price entries by exact source timestamp before any normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: f64,
    pub value: Option<f64>,
}

impl SeriesPoint {
    #[must_use]
    pub const fn new(timestamp: f64, value: f64) -> Self {
        Self {
            timestamp,
            value: Some(value),
        }
    }
}

/// Price, market-cap and volume series for one asset, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    pub prices: Vec<SeriesPoint>,
    pub market_caps: Vec<SeriesPoint>,
    pub volumes: Vec<SeriesPoint>,
}

impl HistorySeries {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// The calendar dates covered by the price series, if any point has a
    /// usable timestamp.
    #[must_use]
    pub fn date_span(&self) -> Option<DateRange> {
        let mut dates = self
            .prices
            .iter()
            .filter_map(|p| to_calendar_date(p.timestamp).ok());
        let first = dates.next()?;
        let (from, to) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(DateRange::between(from, to))
    }
}

/// An immutable daily data point for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub asset_id: AssetId,
    pub date: NaiveDate,
    pub price: Price,
    pub market_cap: Option<Amount>,
    pub volume: Option<Amount>,
}

/// Inclusive date range; an open bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// The unbounded range.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    /// Range covering `from..=to`.
    #[must_use]
    pub const fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}
