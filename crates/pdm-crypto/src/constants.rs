//! Cryptographic constants.
//!
//! These values are normative for the credential blob format: changing any of
//! them invalidates every blob already persisted by the secret store.

/// PBKDF2-HMAC-SHA-256 iteration count for passphrase-derived keys
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Size of derived symmetric keys in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the per-blob random salt in bytes
pub const SALT_SIZE: usize = 16;

/// Size of AES-GCM nonces in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of AES-GCM authentication tags in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of SHA-256 digests in bytes
pub const DIGEST_SIZE: usize = 32;
