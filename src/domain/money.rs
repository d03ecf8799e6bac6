//! Fixed-point quantities for prices, capitalization, volume and supply.
//!
//! Upstream values arrive as JSON floats. They are converted to
//! [`Decimal`] once, at the edge, and rounded to the scale the store keeps,
//! so comparisons between a fresh snapshot and a stored row never drift.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::error::DomainError;

/// Price represented as a Decimal for precision.
pub type Price = Decimal;

/// Capitalization and volume amounts.
pub type Amount = Decimal;

/// Fractional digits kept for prices.
pub const PRICE_SCALE: u32 = 8;

/// Fractional digits kept for market capitalization and volume.
pub const AMOUNT_SCALE: u32 = 2;

/// Fractional digits kept for circulating/total/max supply.
pub const SUPPLY_SCALE: u32 = 0;

/// Round a decimal to `scale` fractional digits (half away from zero) and
/// normalize its representation to exactly that scale.
#[must_use]
pub fn quantize(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Convert a float to a decimal at the given scale.
///
/// # Errors
/// Returns [`DomainError::NonFiniteValue`] for NaN, infinities, or values
/// outside the decimal range.
pub fn from_f64(field: &'static str, value: f64, scale: u32) -> Result<Decimal, DomainError> {
    if !value.is_finite() {
        return Err(DomainError::NonFiniteValue { field });
    }
    Decimal::from_f64(value)
        .map(|d| quantize(d, scale))
        .ok_or(DomainError::NonFiniteValue { field })
}

/// Price from a float, rounded to [`PRICE_SCALE`].
///
/// # Errors
/// See [`from_f64`].
pub fn price(value: f64) -> Result<Price, DomainError> {
    from_f64("price", value, PRICE_SCALE)
}

/// Capitalization or volume from a float, rounded to [`AMOUNT_SCALE`].
///
/// # Errors
/// See [`from_f64`].
pub fn amount(field: &'static str, value: f64) -> Result<Amount, DomainError> {
    from_f64(field, value, AMOUNT_SCALE)
}

/// Supply from a float, rounded to [`SUPPLY_SCALE`].
///
/// # Errors
/// See [`from_f64`].
pub fn supply(field: &'static str, value: f64) -> Result<Decimal, DomainError> {
    from_f64(field, value, SUPPLY_SCALE)
}
