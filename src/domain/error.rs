//! Domain validation errors for core domain types.
//!
//! These errors are returned when upstream data cannot be represented in the
//! domain model (for example a price that is not a finite number).
//!
//! # Examples
//!
//! ```
//! use marketsync::domain::error::DomainError;
//! use marketsync::domain::money;
//!
//! let result = money::price(f64::NAN);
//! assert!(matches!(result, Err(DomainError::NonFiniteValue { field: "price" })));
//! ```

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A numeric field was NaN, infinite, or out of decimal range.
    #[error("{field} is not a finite decimal value")]
    NonFiniteValue {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A required numeric field was absent.
    #[error("{field} is missing")]
    MissingValue {
        /// Name of the missing field.
        field: &'static str,
    },

    /// External identifiers must be non-empty.
    #[error("external id cannot be empty")]
    EmptyExternalId,

    /// A raw timestamp could not be mapped to a calendar date.
    #[error("timestamp {raw} is out of range")]
    TimestampOutOfRange {
        /// The raw value as received.
        raw: String,
    },
}
