//! Order side types

use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
///
/// Serialized lowercase to match the feed's "buy"/"sell" change tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }

    /// Label for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::BUY => "buy",
            Side::SELL => "sell",
        }
    }
}
