//! Error types for the order book engine
//!
//! Comprehensive error taxonomy using thiserror. No error here is fatal to
//! the process: feed errors are recovered by dropping the offending message
//! or send, and configuration errors are rejected before any mutation.

use thiserror::Error;

/// Errors raised at the feed boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    /// Inbound frame could not be parsed into a known message shape.
    /// Recovery: drop the message, log, continue with the next frame.
    #[error("malformed feed message: {0}")]
    Malformed(String),

    /// A control message was attempted while the connection was not open.
    /// Recovery: the send is a logged no-op, no retry.
    #[error("connection not open (state: {state})")]
    NotConnected { state: String },

    /// Transport-level failure (connect, read, or write).
    #[error("feed transport error: {0}")]
    Transport(String),
}

/// Errors raised by configuration setters
///
/// Invalid values are rejected before mutating the configuration, leaving
/// prior values intact.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("aggregation tick must be positive, got {0}")]
    NonPositiveTick(String),

    #[error("top-N must be a positive integer")]
    ZeroTopN,
}
