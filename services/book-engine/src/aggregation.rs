//! Price level aggregation and ranking
//!
//! Compresses raw price levels into fixed-width buckets and ranks the top
//! N per side for display. Bucket assignment is `floor(price / tick) *
//! tick`, keyed at two decimal places; all raw levels mapping to the same
//! bucket have their sizes summed. Percentages are computed over the
//! displayed subset only, so they do not represent book-wide share once
//! levels are truncated.
//!
//! The aggregated view is recomputed in full from the live book after
//! every snapshot, every delta application, and every configuration
//! change — there is no incremental maintenance.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::info;
use types::errors::ConfigError;
use types::numeric::{Price, Size};
use types::order::Side;

/// Display aggregation settings, mutable at runtime.
///
/// Setters reject invalid values before mutating, leaving prior values
/// intact; any accepted change must be followed by a full re-aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationConfig {
    /// Bucket width for price grouping. Always positive.
    tick: Decimal,
    /// Number of best-ranked buckets retained per side. Always ≥ 1.
    top_n: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            tick: Decimal::new(1, 2), // 0.01
            top_n: 10,
        }
    }
}

impl AggregationConfig {
    /// Create a config, validating both fields.
    pub fn new(tick: Decimal, top_n: usize) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.set_tick(tick)?;
        config.set_top_n(top_n)?;
        Ok(config)
    }

    /// Current bucket width.
    pub fn tick(&self) -> Decimal {
        self.tick
    }

    /// Current top-N depth.
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Change the bucket width. Rejects non-positive ticks.
    pub fn set_tick(&mut self, tick: Decimal) -> Result<(), ConfigError> {
        if tick <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveTick(tick.to_string()));
        }
        info!(%tick, "aggregation tick changed");
        self.tick = tick;
        Ok(())
    }

    /// Change the top-N depth. Rejects zero.
    pub fn set_top_n(&mut self, top_n: usize) -> Result<(), ConfigError> {
        if top_n == 0 {
            return Err(ConfigError::ZeroTopN);
        }
        info!(top_n, "top-N depth changed");
        self.top_n = top_n;
        Ok(())
    }
}

/// One ranked display bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedLevel {
    /// Bucket price (floor-aligned to the tick, 2 decimal places).
    pub price: Price,
    /// Summed size across the bucket's raw levels, 8 significant digits.
    pub size: Size,
    /// Share of the displayed top-N total, 2 fractional digits.
    pub percentage: String,
}

/// Assign a raw price to its display bucket.
///
/// Bucket keys carry exactly 2 decimal places, so two buckets that render
/// identically merge.
fn bucket_price(price: Decimal, tick: Decimal) -> Decimal {
    ((price / tick).floor() * tick)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum raw levels into buckets for one side.
fn bucket_side(levels: &BTreeMap<Decimal, Decimal>, tick: Decimal) -> BTreeMap<Decimal, Decimal> {
    let mut buckets: BTreeMap<Decimal, Decimal> = BTreeMap::new();
    for (&price, &size) in levels {
        *buckets
            .entry(bucket_price(price, tick))
            .or_insert(Decimal::ZERO) += size;
    }
    buckets
}

/// Percentage of `total`, rendered with exactly 2 fractional digits.
///
/// "0.00" whenever the displayed total is zero.
fn format_percentage(size: Decimal, total: Decimal) -> String {
    if total <= Decimal::ZERO {
        return "0.00".to_string();
    }
    let mut pct = (size / total * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    pct.rescale(2);
    pct.to_string()
}

/// Bucket, rank, and truncate one side of the book.
///
/// Bids are ranked by bucket price descending (best bid first), asks
/// ascending (best ask first). Truncation to `top_n` happens after
/// bucketing. Sizes are rounded to 8 significant digits for display;
/// percentages are computed from the unrounded sums.
pub fn aggregate_side(
    levels: &BTreeMap<Decimal, Decimal>,
    side: Side,
    config: &AggregationConfig,
) -> Vec<AggregatedLevel> {
    let buckets = bucket_side(levels, config.tick());

    let ranked: Vec<(Decimal, Decimal)> = match side {
        Side::BUY => buckets
            .iter()
            .rev()
            .take(config.top_n())
            .map(|(&p, &s)| (p, s))
            .collect(),
        Side::SELL => buckets
            .iter()
            .take(config.top_n())
            .map(|(&p, &s)| (p, s))
            .collect(),
    };

    let total: Decimal = ranked.iter().map(|&(_, size)| size).sum();

    ranked
        .into_iter()
        .map(|(price, size)| AggregatedLevel {
            price: Price::new(price),
            size: Size::new(size.round_sf(8).unwrap_or(size)),
            percentage: format_percentage(size, total),
        })
        .collect()
}
