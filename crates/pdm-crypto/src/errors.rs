//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors produced by the crypto primitives.
///
/// Decryption failure is deliberately a single opaque variant: a wrong
/// passphrase and a tampered ciphertext are indistinguishable to callers,
/// so nothing downstream can leak which one occurred.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Authenticated decryption failed (wrong key or modified ciphertext).
    #[error("decryption failed")]
    DecryptionFailed,

    /// Encryption could not be performed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// A parameter had the wrong shape or size.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
