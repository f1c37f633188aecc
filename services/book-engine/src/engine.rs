//! Engine dispatcher and published view
//!
//! Routes parsed feed messages through the engine on one logical thread of
//! control: snapshots replace the store, delta batches pass through the
//! coalescer and matcher, tickers feed the best-quote cells and history.
//! After every book or configuration mutation the aggregated view is
//! recomputed in full and republished; readers receive clones of the
//! published state, never references into the mutable store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::errors::ConfigError;
use types::ids::ProductId;
use types::numeric::{Price, Size};
use types::order::Side;

use crate::aggregation::{aggregate_side, AggregatedLevel, AggregationConfig};
use crate::coalesce::UpdateCoalescer;
use crate::feed::{parse_feed_message, FeedMessage};
use crate::history::{BestQuoteHistory, BestQuoteSample};
use crate::matching;
use crate::order_book::PriceLevelStore;

/// Latest instantaneous top-of-book sample for one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestQuote {
    pub price: Price,
    pub size: Size,
}

/// Published derived state consumed by the display layer.
///
/// Always an owned snapshot; a reader can never observe a partially
/// applied batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BookView {
    /// Ranked top-N bid buckets, best first.
    pub top_bids: Vec<AggregatedLevel>,
    /// Ranked top-N ask buckets, best first.
    pub top_asks: Vec<AggregatedLevel>,
    /// Current best bid as reported by the feed's tickers.
    pub best_bid: Option<BestQuote>,
    /// Current best ask as reported by the feed's tickers.
    pub best_ask: Option<BestQuote>,
}

/// Outcome of ingesting one raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestResult {
    /// The message mutated engine state and the view was republished.
    Applied,
    /// A delta batch was buffered behind the coalescing window.
    Buffered,
    /// A recognized-but-unconsumed message type was skipped.
    Ignored,
    /// A malformed message was dropped.
    Dropped,
}

/// The order-book maintenance engine for one product.
pub struct BookEngine {
    book: PriceLevelStore,
    config: AggregationConfig,
    coalescer: UpdateCoalescer,
    history: BestQuoteHistory,
    best_bid: Option<BestQuote>,
    best_ask: Option<BestQuote>,
    view: BookView,
    /// Well-formed messages routed since creation.
    messages_accepted: u64,
    /// Malformed messages dropped since creation.
    messages_dropped: u64,
}

impl BookEngine {
    /// Create an engine with default aggregation settings.
    pub fn new(product: ProductId) -> Self {
        Self::with_config(product, AggregationConfig::default())
    }

    /// Create an engine with explicit aggregation settings.
    pub fn with_config(product: ProductId, config: AggregationConfig) -> Self {
        info!(%product, tick = %config.tick(), top_n = config.top_n(), "book engine created");
        let mut engine = Self {
            book: PriceLevelStore::new(product),
            config,
            coalescer: UpdateCoalescer::new(),
            history: BestQuoteHistory::new(),
            best_bid: None,
            best_ask: None,
            view: BookView::default(),
            messages_accepted: 0,
            messages_dropped: 0,
        };
        engine.republish();
        engine
    }

    /// Ingest one raw feed frame.
    ///
    /// Malformed frames are dropped and logged; ingestion continues with
    /// the next frame. `now` drives the coalescing window and timestamps
    /// history samples.
    pub fn ingest(&mut self, raw: &str, now: DateTime<Utc>) -> IngestResult {
        match parse_feed_message(raw) {
            Ok(message) => self.dispatch(message, now),
            Err(err) => {
                self.messages_dropped += 1;
                warn!(error = %err, dropped = self.messages_dropped, "dropping feed message");
                IngestResult::Dropped
            }
        }
    }

    /// Route one parsed feed message.
    pub fn dispatch(&mut self, message: FeedMessage, now: DateTime<Utc>) -> IngestResult {
        match message {
            FeedMessage::Snapshot { bids, asks } => {
                self.messages_accepted += 1;
                self.book.replace_snapshot(bids, asks);
                self.republish();
                IngestResult::Applied
            }
            FeedMessage::L2Update { changes } => {
                self.messages_accepted += 1;
                self.coalescer.offer(changes, now.timestamp_millis());
                IngestResult::Buffered
            }
            FeedMessage::Ticker {
                best_bid,
                best_bid_size,
                best_ask,
                best_ask_size,
            } => {
                self.messages_accepted += 1;
                self.history.push_bid(BestQuoteSample {
                    time: now,
                    price: best_bid,
                    size: best_bid_size,
                });
                self.history.push_ask(BestQuoteSample {
                    time: now,
                    price: best_ask,
                    size: best_ask_size,
                });
                self.best_bid = Some(BestQuote {
                    price: best_bid,
                    size: best_bid_size,
                });
                self.best_ask = Some(BestQuote {
                    price: best_ask,
                    size: best_ask_size,
                });
                // Tickers bypass the book, so only the quote cells of the
                // published view change.
                self.view.best_bid = self.best_bid;
                self.view.best_ask = self.best_ask;
                IngestResult::Applied
            }
            FeedMessage::Unknown => {
                debug!("ignoring unconsumed feed message type");
                IngestResult::Ignored
            }
        }
    }

    /// Release the coalesced batch if its window has elapsed.
    ///
    /// Applies the batch's changes through the matcher in arrival order,
    /// then republishes the view. Returns whether a batch was applied.
    /// The matcher runs to completion before the view is republished, so a
    /// partially applied batch is never observable.
    pub fn poll_window(&mut self, now: DateTime<Utc>) -> bool {
        let batch = match self.coalescer.poll(now.timestamp_millis()) {
            Some(batch) => batch,
            None => return false,
        };
        debug!(changes = batch.len(), "applying coalesced delta batch");
        for change in &batch {
            matching::apply_change(
                &mut self.book,
                change.side(),
                change.price().as_decimal(),
                change.size().as_decimal(),
            );
        }
        self.republish();
        true
    }

    /// Drop any buffered-but-unapplied delta batch (connection teardown).
    pub fn discard_pending(&mut self) -> bool {
        self.coalescer.discard()
    }

    /// Recompute the published view from the live book.
    fn republish(&mut self) {
        self.view = BookView {
            top_bids: aggregate_side(self.book.bids(), Side::BUY, &self.config),
            top_asks: aggregate_side(self.book.asks(), Side::SELL, &self.config),
            best_bid: self.best_bid,
            best_ask: self.best_ask,
        };
    }

    /// Snapshot of the published view.
    pub fn view(&self) -> BookView {
        self.view.clone()
    }

    /// Snapshot of the best-bid history, oldest first.
    pub fn bid_history(&self) -> Vec<BestQuoteSample> {
        self.history.bid_samples()
    }

    /// Snapshot of the best-ask history, oldest first.
    pub fn ask_history(&self) -> Vec<BestQuoteSample> {
        self.history.ask_samples()
    }

    /// Change the aggregation tick. Triggers a full re-aggregation.
    pub fn set_aggregation_tick(&mut self, tick: Decimal) -> Result<(), ConfigError> {
        self.config.set_tick(tick)?;
        self.republish();
        Ok(())
    }

    /// Change the top-N depth. Triggers a full re-aggregation.
    pub fn set_top_n(&mut self, top_n: usize) -> Result<(), ConfigError> {
        self.config.set_top_n(top_n)?;
        self.republish();
        Ok(())
    }

    /// Current aggregation settings.
    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Clear the book, pending batch, history, and quote cells.
    ///
    /// Message counters survive a reset; they count since creation.
    pub fn reset(&mut self) {
        info!(product = %self.book.product(), "resetting engine state");
        self.book.clear();
        self.coalescer.discard();
        self.history.reset();
        self.best_bid = None;
        self.best_ask = None;
        self.republish();
    }

    /// The product this engine tracks.
    pub fn product(&self) -> &ProductId {
        self.book.product()
    }

    /// Read access to the raw book.
    pub fn book(&self) -> &PriceLevelStore {
        &self.book
    }

    /// Well-formed messages routed since creation.
    pub fn messages_accepted(&self) -> u64 {
        self.messages_accepted
    }

    /// Malformed messages dropped since creation.
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped
    }

    /// Delta batches dropped in favor of a later batch in the same window.
    pub fn batches_superseded(&self) -> u64 {
        self.coalescer.batches_superseded()
    }
}
