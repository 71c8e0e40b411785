//! Error types for the secret store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("storage error: {0}")]
    Io(String),

    /// Value could not be serialized or parsed.
    #[error("storage error: {0}")]
    Serialization(String),

    /// Key is outside the reserved namespace or malformed.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}
