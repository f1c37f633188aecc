//! In-memory price level store
//!
//! Holds the raw book: two mappings from price to resting size, one per
//! side. Uses `BTreeMap` so ranked iteration falls out of key order, and
//! `Decimal` for all prices and sizes.
//!
//! The store is wholly replaced on each snapshot message and incrementally
//! mutated by the matcher; a level never rests at size ≤ 0.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;
use types::ids::ProductId;
use types::numeric::{Price, Size};
use types::order::Side;

/// Raw order book for a single product.
///
/// Bids and asks are keyed by price; `BTreeMap` iteration yields ascending
/// prices, so best bid = last bid key and best ask = first ask key.
#[derive(Debug, Clone)]
pub struct PriceLevelStore {
    /// Trading pair this book mirrors.
    product: ProductId,
    /// Bid levels: price → resting size.
    bids: BTreeMap<Decimal, Decimal>,
    /// Ask levels: price → resting size.
    asks: BTreeMap<Decimal, Decimal>,
}

impl PriceLevelStore {
    /// Create an empty book for the given product.
    pub fn new(product: ProductId) -> Self {
        Self {
            product,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// The product this book tracks.
    pub fn product(&self) -> &ProductId {
        &self.product
    }

    /// Discard all prior state and install the given levels.
    ///
    /// Duplicate prices in the input collapse last-write-wins — no
    /// summation. Sizes are stored as received; entries at size ≤ 0 are
    /// never installed.
    pub fn replace_snapshot(&mut self, bids: Vec<(Price, Size)>, asks: Vec<(Price, Size)>) {
        self.bids.clear();
        self.asks.clear();
        for (price, size) in bids {
            if size.is_positive() {
                self.bids.insert(price.as_decimal(), size.as_decimal());
            }
        }
        for (price, size) in asks {
            if size.is_positive() {
                self.asks.insert(price.as_decimal(), size.as_decimal());
            }
        }
        debug!(
            product = %self.product,
            bid_levels = self.bids.len(),
            ask_levels = self.asks.len(),
            "book snapshot installed"
        );
    }

    /// Live mapping for one side (exposed for matching and aggregation).
    pub fn side(&self, side: Side) -> &BTreeMap<Decimal, Decimal> {
        match side {
            Side::BUY => &self.bids,
            Side::SELL => &self.asks,
        }
    }

    /// Mutable mapping for one side.
    pub fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, Decimal> {
        match side {
            Side::BUY => &mut self.bids,
            Side::SELL => &mut self.asks,
        }
    }

    /// Bid levels, price → size.
    pub fn bids(&self) -> &BTreeMap<Decimal, Decimal> {
        &self.bids
    }

    /// Ask levels, price → size.
    pub fn asks(&self) -> &BTreeMap<Decimal, Decimal> {
        &self.asks
    }

    /// Best (highest) bid price on the book.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().and_then(|d| Price::try_new(*d))
    }

    /// Best (lowest) ask price on the book.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().and_then(|d| Price::try_new(*d))
    }

    /// Mid-market price (average of best bid and best ask).
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => {
                Some((bid.as_decimal() + ask.as_decimal()) / Decimal::from(2))
            }
            _ => None,
        }
    }

    /// Spread between best ask and best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.as_decimal() - bid.as_decimal()),
            _ => None,
        }
    }

    /// Number of bid price levels.
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of ask price levels.
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    /// Total resting size on one side (all levels).
    pub fn total_size(&self, side: Side) -> Decimal {
        self.side(side).values().copied().sum()
    }

    /// Drop every level on both sides.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }
}
