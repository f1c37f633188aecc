//! Product identifier for the market-data feed
//!
//! The feed addresses trading pairs in dash form ("BTC-USD"). The identifier
//! is validated on construction so downstream code never has to re-check the
//! format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading pair identifier
///
/// Format: "BASE-QUOTE" (e.g., "BTC-USD", "ETH-EUR")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a new ProductId from a string
    ///
    /// # Panics
    /// Panics if the format is invalid (must contain '-')
    pub fn new(symbol: impl Into<String>) -> Self {
        let s = symbol.into();
        assert!(s.contains('-'), "ProductId must be in BASE-QUOTE format");
        Self(s)
    }

    /// Try to create a ProductId, returning None if invalid
    pub fn try_new(symbol: impl Into<String>) -> Option<Self> {
        let s = symbol.into();
        if s.contains('-') {
            Some(Self(s))
        } else {
            None
        }
    }

    /// Get the symbol string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into base and quote assets
    pub fn split(&self) -> (&str, &str) {
        let parts: Vec<&str> = self.0.split('-').collect();
        (parts[0], parts[1])
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_creation() {
        let product = ProductId::new("BTC-USD");
        assert_eq!(product.as_str(), "BTC-USD");

        let (base, quote) = product.split();
        assert_eq!(base, "BTC");
        assert_eq!(quote, "USD");
    }

    #[test]
    fn test_product_id_try_new() {
        assert!(ProductId::try_new("BTC-USD").is_some());
        assert!(ProductId::try_new("INVALID").is_none());
    }

    #[test]
    #[should_panic(expected = "ProductId must be in BASE-QUOTE format")]
    fn test_product_id_invalid_format() {
        ProductId::new("INVALID");
    }

    #[test]
    fn test_product_id_serialization() {
        let product = ProductId::new("ETH-EUR");
        let json = serde_json::to_string(&product).unwrap();
        assert_eq!(json, "\"ETH-EUR\"");

        let deserialized: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(product, deserialized);
    }
}
