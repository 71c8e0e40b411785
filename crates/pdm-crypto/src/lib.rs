//! # pdm-crypto
//!
//! Cryptographic primitives for the PDM private-data broker: PBKDF2-HMAC-SHA-256
//! passphrase derivation, AES-256-GCM authenticated encryption, SHA-256 hashing,
//! CSPRNG helpers, and identifier minting.
//!
//! Key material produced here is wrapped in [`zeroize::Zeroizing`] and never
//! leaves the crate without an explicit export by the caller.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod encryption;
pub mod errors;
pub mod hashing;
pub mod kdf;
pub mod utils;

pub use constants::*;
pub use encryption::{decrypt, encrypt};
pub use errors::CryptoError;
pub use hashing::{constant_time_eq, sha256};
pub use kdf::derive_key;
pub use utils::{current_timestamp_millis, generate_random_bytes, new_uuid, random_vec};
