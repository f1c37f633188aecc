//! Feed wire messages and control-message gating
//!
//! Models the inbound frames the connector demultiplexes (snapshot,
//! l2update, ticker) and the outbound subscribe/unsubscribe control
//! messages. All prices and sizes travel as decimal strings and are parsed
//! into `Decimal`-backed types without loss.
//!
//! A malformed frame parses to an error; the caller drops it, logs, and
//! continues with the next frame. Control messages may only be sent while
//! the connection is open — otherwise the send is a no-op logged as an
//! error.

use serde::{Deserialize, Serialize};
use tracing::error;
use types::errors::FeedError;
use types::ids::ProductId;
use types::numeric::{Price, Size};
use types::order::Side;

/// Channels requested from the feed: batched level-2 changes and tickers.
pub const FEED_CHANNELS: [&str; 2] = ["level2_batch", "ticker"];

/// One incremental change tuple: `["buy"|"sell", price, size]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelChange(pub Side, pub Price, pub Size);

impl LevelChange {
    pub fn side(&self) -> Side {
        self.0
    }

    pub fn price(&self) -> Price {
        self.1
    }

    pub fn size(&self) -> Size {
        self.2
    }
}

/// Inbound feed frames, demultiplexed on the `type` field.
///
/// Message types this engine does not consume (heartbeats, subscription
/// acks, ...) parse to `Unknown` and are ignored rather than dropped as
/// malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage {
    /// Full book state; replaces everything held so far.
    Snapshot {
        bids: Vec<(Price, Size)>,
        asks: Vec<(Price, Size)>,
    },
    /// A batch of incremental changes, applied in order.
    #[serde(rename = "l2update", alias = "delta")]
    L2Update { changes: Vec<LevelChange> },
    /// Upstream-reported top of book; bypasses the book entirely.
    Ticker {
        best_bid: Price,
        best_bid_size: Size,
        best_ask: Price,
        best_ask_size: Size,
    },
    #[serde(other)]
    Unknown,
}

/// Parse a raw frame into a feed message.
pub fn parse_feed_message(raw: &str) -> Result<FeedMessage, FeedError> {
    serde_json::from_str(raw).map_err(|err| FeedError::Malformed(err.to_string()))
}

/// Control message direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Subscribe,
    Unsubscribe,
}

/// Outbound subscribe/unsubscribe control message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub kind: ControlKind,
    pub product_ids: Vec<ProductId>,
    pub channels: Vec<String>,
}

impl ControlMessage {
    /// Subscribe to the engine's channels for one product.
    pub fn subscribe(product: &ProductId) -> Self {
        Self::for_kind(ControlKind::Subscribe, product)
    }

    /// Unsubscribe from the engine's channels for one product.
    pub fn unsubscribe(product: &ProductId) -> Self {
        Self::for_kind(ControlKind::Unsubscribe, product)
    }

    fn for_kind(kind: ControlKind, product: &ProductId) -> Self {
        Self {
            kind,
            product_ids: vec![product.clone()],
            channels: FEED_CHANNELS.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

/// Connection lifecycle, mirroring the socket's ready state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        }
    }
}

/// Encode a control message for sending, gated on the connection state.
///
/// On a non-open connection the send must not happen: this logs an error
/// and returns `NotConnected` so the caller can treat it as a no-op.
pub fn encode_control(
    state: ConnectionState,
    message: &ControlMessage,
) -> Result<String, FeedError> {
    if !state.is_open() {
        error!(
            state = state.as_str(),
            kind = ?message.kind,
            "control send attempted on non-open connection"
        );
        return Err(FeedError::NotConnected {
            state: state.as_str().to_string(),
        });
    }
    serde_json::to_string(message).map_err(|err| FeedError::Transport(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot() {
        let raw = r#"{
            "type": "snapshot",
            "bids": [["100.50", "1.5"], ["100.25", "2"]],
            "asks": [["100.75", "0.5"]]
        }"#;

        match parse_feed_message(raw).unwrap() {
            FeedMessage::Snapshot { bids, asks } => {
                assert_eq!(bids.len(), 2);
                assert_eq!(asks.len(), 1);
                assert_eq!(bids[0].0, Price::from_str("100.50").unwrap());
                assert_eq!(bids[0].1, Size::from_str("1.5").unwrap());
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_l2update() {
        let raw = r#"{"type":"l2update","changes":[["buy","100.10","2"],["sell","100.90","0"]]}"#;

        match parse_feed_message(raw).unwrap() {
            FeedMessage::L2Update { changes } => {
                assert_eq!(changes.len(), 2);
                assert_eq!(changes[0].side(), Side::BUY);
                assert_eq!(changes[1].side(), Side::SELL);
                assert_eq!(changes[1].size(), Size::from_str("0").unwrap());
            }
            other => panic!("expected l2update, got {:?}", other),
        }
    }

    #[test]
    fn test_delta_alias_for_l2update() {
        let raw = r#"{"type":"delta","changes":[["buy","100","1"]]}"#;
        assert!(matches!(
            parse_feed_message(raw).unwrap(),
            FeedMessage::L2Update { .. }
        ));
    }

    #[test]
    fn test_parse_ticker() {
        let raw = r#"{
            "type": "ticker",
            "best_bid": "50000.12",
            "best_bid_size": "0.4",
            "best_ask": "50000.35",
            "best_ask_size": "1.1"
        }"#;

        match parse_feed_message(raw).unwrap() {
            FeedMessage::Ticker {
                best_bid,
                best_ask_size,
                ..
            } => {
                assert_eq!(best_bid, Price::from_str("50000.12").unwrap());
                assert_eq!(best_ask_size, Size::from_str("1.1").unwrap());
            }
            other => panic!("expected ticker, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_type_parses_to_unknown() {
        let raw = r#"{"type":"heartbeat","sequence":90}"#;
        assert_eq!(parse_feed_message(raw).unwrap(), FeedMessage::Unknown);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(
            parse_feed_message("{not json"),
            Err(FeedError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_field_is_error() {
        let raw = r#"{"type":"l2update"}"#;
        assert!(matches!(
            parse_feed_message(raw),
            Err(FeedError::Malformed(_))
        ));
    }

    #[test]
    fn test_subscribe_message_wire_form() {
        let msg = ControlMessage::subscribe(&ProductId::new("BTC-USD"));
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"subscribe","product_ids":["BTC-USD"],"channels":["level2_batch","ticker"]}"#
        );
    }

    #[test]
    fn test_unsubscribe_message_wire_form() {
        let msg = ControlMessage::unsubscribe(&ProductId::new("ETH-USD"));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.starts_with(r#"{"type":"unsubscribe""#));
        assert!(json.contains("ETH-USD"));
    }

    #[test]
    fn test_encode_control_requires_open_state() {
        let msg = ControlMessage::subscribe(&ProductId::new("BTC-USD"));

        assert!(encode_control(ConnectionState::Open, &msg).is_ok());

        for state in [
            ConnectionState::Connecting,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            assert_eq!(
                encode_control(state, &msg),
                Err(FeedError::NotConnected {
                    state: state.as_str().to_string(),
                })
            );
        }
    }
}
