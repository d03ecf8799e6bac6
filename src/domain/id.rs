//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Provider-assigned asset identifier (e.g. `"bitcoin"`) - newtype for type safety.
///
/// This is the stable key the upstream market-data API uses. Exactly one
/// stored asset exists per external id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId(String);

impl ExternalId {
    /// Create a new `ExternalId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the external ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ExternalId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Store-assigned row identifier of a persisted asset.
///
/// Only the store hands these out; observations reference their owning
/// asset through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(i32);

impl AssetId {
    /// Wrap a raw row id.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// The raw row id.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_id_display_and_as_str_agree() {
        let id = ExternalId::new("bitcoin");
        assert_eq!(id.as_str(), "bitcoin");
        assert_eq!(id.to_string(), "bitcoin");
    }

    #[test]
    fn external_id_from_conversions_are_equal() {
        assert_eq!(ExternalId::from("eth"), ExternalId::from("eth".to_string()));
    }

    #[test]
    fn asset_id_round_trips_raw_value() {
        let id = AssetId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
    }
}
