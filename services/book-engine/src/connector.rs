//! WebSocket feed connector
//!
//! Owns the network connection: connects, subscribes to the engine's
//! channels, pumps inbound frames into the engine, and drives the
//! coalescing window off the runtime clock. On teardown it unsubscribes
//! (only while the connection is still open) and discards any
//! buffered-but-unapplied delta batch.
//!
//! Connection-level recovery is out of scope: a dropped connection ends
//! the run, and the caller decides whether to start a new one. The engine
//! keeps serving its last-known-good state either way.

use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{info, warn};
use types::errors::FeedError;

use crate::engine::BookEngine;
use crate::feed::{encode_control, ConnectionState, ControlMessage};

/// Public Coinbase Exchange market-data feed.
pub const COINBASE_FEED_URL: &str = "wss://ws-feed.exchange.coinbase.com";

/// How often the coalescing window is polled. A fraction of the window so
/// releases land close to the window edge.
const WINDOW_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Connect to the feed and run the engine until the stream ends or
/// `shutdown` fires.
///
/// The engine is driven synchronously from this single task: frame
/// handling and window polling never overlap, so the book is mutated by
/// one logical flow only.
pub async fn run_feed(
    url: &str,
    engine: &mut BookEngine,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), FeedError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|err| FeedError::Transport(err.to_string()))?;
    info!(url, product = %engine.product(), "feed connected");

    let (mut sink, mut stream) = ws_stream.split();
    let mut state = ConnectionState::Open;

    let subscribe = ControlMessage::subscribe(engine.product());
    if let Ok(payload) = encode_control(state, &subscribe) {
        sink.send(Message::Text(payload))
            .await
            .map_err(|err| FeedError::Transport(err.to_string()))?;
    }

    let mut window = tokio::time::interval(WINDOW_POLL_INTERVAL);
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(raw))) => {
                    engine.ingest(&raw, Utc::now());
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("feed stream closed by remote");
                    state = ConnectionState::Closed;
                    break;
                }
                Some(Ok(_)) => {} // ping/pong/binary frames carry no book data
                Some(Err(err)) => {
                    warn!(error = %err, "feed read failed");
                    state = ConnectionState::Closed;
                    break;
                }
            },
            _ = window.tick() => {
                engine.poll_window(Utc::now());
            }
            _ = &mut shutdown => {
                info!("feed shutdown requested");
                break;
            }
        }
    }

    // Teardown: unsubscribe only while still open; a non-open state makes
    // the send a logged no-op. The pending coalesced batch is discarded,
    // not flushed.
    let unsubscribe = ControlMessage::unsubscribe(engine.product());
    if let Ok(payload) = encode_control(state, &unsubscribe) {
        if let Err(err) = sink.send(Message::Text(payload)).await {
            warn!(error = %err, "unsubscribe send failed");
        }
    }
    engine.discard_pending();
    let _ = sink.close().await;
    Ok(())
}
