//! Error types for the bridge.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// No response arrived within the bridge timeout. The message is the
    /// documented literal so callers can tell transport from application
    /// failure.
    #[error("PDM request timeout")]
    Timeout,

    /// The broker answered with an error; the message is its `error` field
    /// verbatim.
    #[error("{0}")]
    Api(String),

    /// The window bus is gone (page torn down).
    #[error("bridge channel closed")]
    ChannelClosed,
}
