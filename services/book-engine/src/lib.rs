//! Order Book Engine
//!
//! Maintains the trading dashboard's limit order book from a market-data
//! feed and produces:
//! - A consistent in-memory book (full snapshot + incremental changes)
//! - Taker-side matching of every incoming change against the opposing side
//! - Bucketed, ranked top-N views with volume percentages for display
//! - Coalesced delta application to bound update frequency
//! - A bounded best-quote history for charting
//!
//! # Architecture
//!
//! ```text
//! Feed frames (snapshot / l2update / ticker)
//!        │
//!    ┌───▼────┐
//!    │ Parse  │  ← Drops malformed frames, logs, continues
//!    └───┬────┘
//!        │
//!   ┌────┴────────┬─────────────┐
//!   │snapshot     │l2update     │ticker
//! ┌─▼────┐   ┌────▼────┐   ┌────▼────┐
//! │Book  │   │Coalesce │   │History +│
//! │replace│  │(500 ms) │   │best cell│
//! └─┬────┘   └────┬────┘   └────┬────┘
//!   │        ┌────▼────┐        │
//!   │        │ Matcher │        │
//!   │        └────┬────┘        │
//! ┌─▼─────────────▼─────────────▼──┐
//! │   Aggregate → published view   │
//! └────────────────────────────────┘
//! ```
//!
//! All ingestion, matching, and aggregation run on one logical thread of
//! control; readers receive clones of published derived state, never
//! references into the mutable store.

pub mod aggregation;
pub mod coalesce;
pub mod connector;
pub mod engine;
pub mod feed;
pub mod history;
pub mod matching;
pub mod order_book;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
