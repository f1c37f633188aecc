//! Bounded best-quote history for charting
//!
//! Keeps a sliding window of the most recent best-bid and best-ask samples
//! reported by ticker messages. Capacity is fixed at 100 per side; the
//! oldest sample is evicted on overflow. Independent of the book itself —
//! these are the upstream feed's own top-of-book reports.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::numeric::{Price, Size};

/// Samples retained per side.
pub const HISTORY_CAPACITY: usize = 100;

/// One observed top-of-book sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestQuoteSample {
    /// ISO-8601 observation time.
    pub time: DateTime<Utc>,
    pub price: Price,
    pub size: Size,
}

/// Rolling per-side buffers of best-quote samples.
#[derive(Debug, Clone)]
pub struct BestQuoteHistory {
    capacity: usize,
    bids: VecDeque<BestQuoteSample>,
    asks: VecDeque<BestQuoteSample>,
}

impl BestQuoteHistory {
    /// Create an empty history with the standard capacity.
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create an empty history with a custom per-side capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            bids: VecDeque::with_capacity(capacity),
            asks: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a best-bid sample, evicting the oldest at capacity.
    pub fn push_bid(&mut self, sample: BestQuoteSample) {
        Self::push(&mut self.bids, self.capacity, sample);
    }

    /// Append a best-ask sample, evicting the oldest at capacity.
    pub fn push_ask(&mut self, sample: BestQuoteSample) {
        Self::push(&mut self.asks, self.capacity, sample);
    }

    fn push(buffer: &mut VecDeque<BestQuoteSample>, capacity: usize, sample: BestQuoteSample) {
        if buffer.len() >= capacity {
            buffer.pop_front();
        }
        buffer.push_back(sample);
    }

    /// Snapshot of the best-bid samples, oldest first.
    pub fn bid_samples(&self) -> Vec<BestQuoteSample> {
        self.bids.iter().cloned().collect()
    }

    /// Snapshot of the best-ask samples, oldest first.
    pub fn ask_samples(&self) -> Vec<BestQuoteSample> {
        self.asks.iter().cloned().collect()
    }

    /// Number of retained best-bid samples.
    pub fn bid_len(&self) -> usize {
        self.bids.len()
    }

    /// Number of retained best-ask samples.
    pub fn ask_len(&self) -> usize {
        self.asks.len()
    }

    /// Clear both sides.
    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }
}

impl Default for BestQuoteHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seq: i64) -> BestQuoteSample {
        BestQuoteSample {
            time: DateTime::from_timestamp_millis(1_708_123_456_000 + seq).unwrap(),
            price: Price::from_u64(50_000 + seq as u64),
            size: Size::from_str("1.0").unwrap(),
        }
    }

    #[test]
    fn test_push_and_read_back_in_order() {
        let mut history = BestQuoteHistory::new();
        history.push_bid(sample(1));
        history.push_bid(sample(2));

        let samples = history.bid_samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], sample(1));
        assert_eq!(samples[1], sample(2));
    }

    #[test]
    fn test_capacity_bound_retains_latest() {
        let mut history = BestQuoteHistory::new();
        for seq in 0..150 {
            history.push_bid(sample(seq));
        }

        assert_eq!(history.bid_len(), HISTORY_CAPACITY);
        let samples = history.bid_samples();
        // the latest 100 in arrival order
        assert_eq!(samples[0], sample(50));
        assert_eq!(samples[99], sample(149));
    }

    #[test]
    fn test_sides_are_independent() {
        let mut history = BestQuoteHistory::new();
        history.push_bid(sample(1));

        assert_eq!(history.bid_len(), 1);
        assert_eq!(history.ask_len(), 0);
    }

    #[test]
    fn test_reset_clears_both_sides() {
        let mut history = BestQuoteHistory::new();
        history.push_bid(sample(1));
        history.push_ask(sample(2));

        history.reset();

        assert_eq!(history.bid_len(), 0);
        assert_eq!(history.ask_len(), 0);
    }

    #[test]
    fn test_sample_serializes_iso8601() {
        let json = serde_json::to_string(&sample(0)).unwrap();
        assert!(json.contains("2024-02-16T"));
    }
}
