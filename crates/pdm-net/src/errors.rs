//! Error types for the network adapter.

use thiserror::Error;

/// Adapter and upstream failures.
///
/// `Clone` because concurrent setup callers share one settlement result.
#[derive(Debug, Clone, Error)]
pub enum NetError {
    /// The auxiliary context could not be brought up, or is gone.
    #[error("network adapter unavailable")]
    AdapterUnavailable,

    /// The call did not complete within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// The remote service answered with a non-2xx status.
    #[error("upstream error ({status}): {error_text}")]
    Upstream { status: u16, error_text: String },

    /// The request could not be transported at all.
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx response body was not valid JSON.
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}
