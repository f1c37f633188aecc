//! Fixed-point decimal types for prices and sizes
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Feed values arrive as decimal strings and are stored exactly as received;
//! any display rounding happens at the aggregation layer, never here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A price on the book or on the wire.
///
/// Thin wrapper over `Decimal`; serialized as a string so the feed's
/// precision survives round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Wrap a decimal as a price.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create a price from a whole number of quote units.
    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Parse a price from its wire (string) form.
    pub fn from_str(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Self(Decimal::from_str(s)?))
    }

    /// Wrap a decimal, rejecting non-positive values.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Get the inner decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resting or incoming size.
///
/// Sizes on the book are always positive; the store removes a level rather
/// than hold a size at or below zero. The wrapper itself does not enforce
/// sign — callers guarantee it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(Decimal);

impl Size {
    /// Wrap a decimal as a size.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parse a size from its wire (string) form.
    pub fn from_str(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Self(Decimal::from_str(s)?))
    }

    /// Get the inner decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Whether this size is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
