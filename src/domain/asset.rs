//! Tracked assets: the persisted record and the upstream snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AssetId, ExternalId};
use super::money::{Amount, Price};
use rust_decimal::Decimal;

/// Circulating, total and maximum supply of an asset.
///
/// Any of the three may be unknown. Providers routinely omit `max_supply`
/// for uncapped assets and occasionally drop the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supply {
    pub circulating: Option<Decimal>,
    pub total: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl Supply {
    /// Combine a fresh reading with a prior one: values present in `self`
    /// win, values absent from `self` keep the prior value.
    #[must_use]
    pub fn merged_over(&self, prior: &Supply) -> Supply {
        Supply {
            circulating: self.circulating.or(prior.circulating),
            total: self.total.or(prior.total),
            max: self.max.or(prior.max),
        }
    }

    /// True when `self` provides at least one value that `prior` lacks.
    #[must_use]
    pub fn fills_gap_in(&self, prior: &Supply) -> bool {
        (self.circulating.is_some() && prior.circulating.is_none())
            || (self.total.is_some() && prior.total.is_none())
            || (self.max.is_some() && prior.max.is_none())
    }
}

/// Current-state snapshot of one asset as reported by the upstream API.
///
/// All numbers are already quantized to the store's scales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub external_id: ExternalId,
    pub name: String,
    pub price: Price,
    pub market_cap: Amount,
    pub volume: Amount,
    pub supply: Supply,
}

/// A persisted asset row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub external_id: ExternalId,
    pub name: String,
    pub price: Price,
    pub market_cap: Amount,
    pub volume: Amount,
    pub supply: Supply,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn supply(c: Option<Decimal>, t: Option<Decimal>, m: Option<Decimal>) -> Supply {
        Supply {
            circulating: c,
            total: t,
            max: m,
        }
    }

    #[test]
    fn merge_prefers_fresh_values() {
        let prior = supply(Some(dec!(1)), Some(dec!(2)), Some(dec!(3)));
        let fresh = supply(Some(dec!(10)), Some(dec!(20)), Some(dec!(30)));
        assert_eq!(fresh.merged_over(&prior), fresh);
    }

    #[test]
    fn merge_preserves_prior_when_fresh_is_absent() {
        let prior = supply(Some(dec!(1)), Some(dec!(2)), Some(dec!(3)));
        let fresh = supply(Some(dec!(10)), None, None);
        assert_eq!(
            fresh.merged_over(&prior),
            supply(Some(dec!(10)), Some(dec!(2)), Some(dec!(3)))
        );
    }

    #[test]
    fn fills_gap_only_when_prior_lacks_value() {
        let prior = supply(Some(dec!(1)), None, None);
        assert!(supply(None, Some(dec!(5)), None).fills_gap_in(&prior));
        assert!(!supply(Some(dec!(7)), None, None).fills_gap_in(&prior));
        assert!(!Supply::default().fills_gap_in(&prior));
    }
}
