//! Taker-side matching of incoming book changes
//!
//! Every incremental change is applied as an aggressive order: it first
//! consumes resting liquidity on the opposing side at crossing prices,
//! best price first, and only the unfilled remainder rests on its own side.
//! A non-crossing change finds no eligible opposing levels and degenerates
//! to a pure rest-at-price operation.
//!
//! Matching runs to completion within one dispatch; the aggregated view is
//! republished only afterwards, so readers never observe a partial walk.

use rust_decimal::Decimal;
use tracing::{debug, trace};
use types::order::Side;

use crate::order_book::PriceLevelStore;

/// Whether an incoming order at `incoming_price` crosses a resting level.
///
/// A buy crosses asks at or below its price; a sell crosses bids at or
/// above its price.
pub fn crosses(incoming_side: Side, incoming_price: Decimal, resting_price: Decimal) -> bool {
    match incoming_side {
        Side::BUY => incoming_price >= resting_price,
        Side::SELL => incoming_price <= resting_price,
    }
}

/// Apply one `(side, price, size)` change as a taker order.
///
/// Consumes eligible opposing levels best-first, then rests the remainder
/// at `price` on the incoming side (overwriting any prior level there).
/// When the incoming size is fully absorbed, nothing is rested and any
/// pre-existing own-side level at `price` is left untouched.
///
/// Returns the rested remainder (zero when fully absorbed). Callers
/// guarantee a positive incoming size.
pub fn apply_change(
    book: &mut PriceLevelStore,
    side: Side,
    price: Decimal,
    size: Decimal,
) -> Decimal {
    let remaining = consume_opposing(book, side, price, size);

    if remaining > Decimal::ZERO {
        book.side_mut(side).insert(price, remaining);
    }
    remaining
}

/// Walk eligible opposing levels best-first, consuming up to `size`.
fn consume_opposing(
    book: &mut PriceLevelStore,
    side: Side,
    price: Decimal,
    size: Decimal,
) -> Decimal {
    let opposing = book.side_mut(side.opposite());

    // Opposing prices the incoming order crosses, best price first:
    // lowest asks for a buy, highest bids for a sell.
    let eligible: Vec<Decimal> = match side {
        Side::BUY => opposing.range(..=price).map(|(p, _)| *p).collect(),
        Side::SELL => opposing.range(price..).rev().map(|(p, _)| *p).collect(),
    };

    let mut remaining = size;
    for level_price in eligible {
        if remaining <= Decimal::ZERO {
            break;
        }
        let resting = match opposing.get(&level_price) {
            Some(&resting) => resting,
            None => continue,
        };

        if resting <= remaining {
            opposing.remove(&level_price);
            remaining -= resting;
            trace!(
                side = side.as_str(),
                %level_price,
                consumed = %resting,
                remaining = %remaining,
                "level fully consumed"
            );
        } else {
            opposing.insert(level_price, resting - remaining);
            trace!(
                side = side.as_str(),
                %level_price,
                consumed = %remaining,
                "level partially consumed"
            );
            remaining = Decimal::ZERO;
        }
    }

    if remaining < size {
        debug!(
            side = side.as_str(),
            %price,
            incoming = %size,
            rested = %remaining,
            "taker change matched opposing liquidity"
        );
    }
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::ProductId;
    use types::numeric::{Price, Size};

    fn level(price: &str, size: &str) -> (Price, Size) {
        (Price::from_str(price).unwrap(), Size::from_str(size).unwrap())
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    fn store_with(bids: Vec<(Price, Size)>, asks: Vec<(Price, Size)>) -> PriceLevelStore {
        let mut store = PriceLevelStore::new(ProductId::new("BTC-USD"));
        store.replace_snapshot(bids, asks);
        store
    }

    #[test]
    fn test_crosses() {
        assert!(crosses(Side::BUY, dec("102"), dec("101")));
        assert!(crosses(Side::BUY, dec("101"), dec("101")));
        assert!(!crosses(Side::BUY, dec("100"), dec("101")));
        assert!(crosses(Side::SELL, dec("99"), dec("100")));
        assert!(!crosses(Side::SELL, dec("101"), dec("100")));
    }

    #[test]
    fn test_sell_fully_absorbed_by_equal_bid() {
        let mut store = store_with(vec![level("100", "5")], vec![]);

        let remaining = apply_change(&mut store, Side::SELL, dec("100"), dec("5"));

        assert_eq!(remaining, Decimal::ZERO);
        assert_eq!(store.bid_depth(), 0);
        assert_eq!(store.ask_depth(), 0);
    }

    #[test]
    fn test_buy_walks_levels_best_first() {
        let mut store = store_with(vec![], vec![level("101", "2"), level("102", "4")]);

        let remaining = apply_change(&mut store, Side::BUY, dec("102"), dec("5"));

        assert_eq!(remaining, Decimal::ZERO);
        // ask@101 fully consumed, ask@102 reduced 4 → 1
        assert_eq!(store.ask_depth(), 1);
        assert_eq!(store.asks().get(&dec("102")), Some(&dec("1")));
        // nothing rested on the bid side
        assert_eq!(store.bid_depth(), 0);
    }

    #[test]
    fn test_non_crossing_buy_rests_full_size() {
        let mut store = store_with(vec![], vec![level("105", "3")]);

        let remaining = apply_change(&mut store, Side::BUY, dec("100"), dec("4"));

        assert_eq!(remaining, dec("4"));
        assert_eq!(store.bids().get(&dec("100")), Some(&dec("4")));
        assert_eq!(store.asks().get(&dec("105")), Some(&dec("3")));
    }

    #[test]
    fn test_partial_fill_rests_remainder() {
        let mut store = store_with(vec![], vec![level("101", "2")]);

        let remaining = apply_change(&mut store, Side::BUY, dec("101"), dec("5"));

        assert_eq!(remaining, dec("3"));
        assert_eq!(store.ask_depth(), 0);
        assert_eq!(store.bids().get(&dec("101")), Some(&dec("3")));
    }

    #[test]
    fn test_rest_overwrites_existing_level() {
        let mut store = store_with(vec![level("100", "9")], vec![]);

        apply_change(&mut store, Side::BUY, dec("100"), dec("2"));

        // Overwrite, not add.
        assert_eq!(store.bids().get(&dec("100")), Some(&dec("2")));
    }

    #[test]
    fn test_fully_absorbed_leaves_own_side_untouched() {
        let mut store = store_with(vec![level("100", "1")], vec![level("101", "5")]);

        let remaining = apply_change(&mut store, Side::BUY, dec("101"), dec("5"));

        assert_eq!(remaining, Decimal::ZERO);
        assert_eq!(store.ask_depth(), 0);
        // the pre-existing bid@100 is not disturbed
        assert_eq!(store.bids().get(&dec("100")), Some(&dec("1")));
        assert_eq!(store.bids().get(&dec("101")), None);
    }

    #[test]
    fn test_sell_matches_highest_bid_first() {
        let mut store = store_with(
            vec![level("98", "1"), level("99", "1"), level("100", "1")],
            vec![],
        );

        let remaining = apply_change(&mut store, Side::SELL, dec("99"), dec("1.5"));

        assert_eq!(remaining, Decimal::ZERO);
        // bid@100 fully consumed, bid@99 reduced 1 → 0.5, bid@98 untouched
        assert_eq!(store.bids().get(&dec("100")), None);
        assert_eq!(store.bids().get(&dec("99")), Some(&dec("0.5")));
        assert_eq!(store.bids().get(&dec("98")), Some(&dec("1")));
    }
}
