//! Error types for session management.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Unlock failed. Covers both a wrong passphrase and a tampered blob;
    /// the two are never distinguished to callers.
    #[error("Failed to unlock: invalid passphrase")]
    BadPassphrase,

    /// No credential blob has been stored yet.
    #[error("No credentials configured")]
    NoCredentials,

    /// The action requires an unlocked session.
    #[error("Session is locked")]
    Locked,

    /// The persisted blob could not be decoded.
    #[error("stored credentials are malformed: {0}")]
    InvalidBlob(String),

    /// Crypto failure outside the decrypt-auth path.
    #[error("cryptographic failure: {0}")]
    Crypto(String),

    #[error(transparent)]
    Store(#[from] pdm_store::StoreError),
}

impl From<pdm_crypto::CryptoError> for SessionError {
    fn from(err: pdm_crypto::CryptoError) -> Self {
        match err {
            pdm_crypto::CryptoError::DecryptionFailed => SessionError::BadPassphrase,
            other => SessionError::Crypto(other.to_string()),
        }
    }
}
