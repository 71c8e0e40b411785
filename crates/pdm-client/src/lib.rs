//! # pdm-client
//!
//! Typed operations against the remote secret-storage service, with a
//! permanent local-persistence fallback that preserves the same contract.
//!
//! The client's mode is a sum type: it is either fully `Online` or fully
//! `Fallback`, never in between. The first upstream failure flips it to
//! `Fallback` for the remainder of the process and persists a flag so later
//! processes start there directly. There is no reconciliation path back.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod api;
mod backend;
mod client;
mod errors;
mod records;

pub use client::{ClientMode, StorageClient};
pub use errors::ClientError;
pub use records::{DocumentRecord, UserIdentity};

/// Persistent key of the stable user DID.
pub const USER_DID_KEY: &str = "pdm_user_did";

/// Persistent key of the sticky fallback-mode flag.
pub const DEMO_MODE_KEY: &str = "pdm_demo_mode";

/// Persistent key of the plaintext identity record.
pub const USER_IDENTITY_KEY: &str = "pdm_user_identity";

/// Key prefix of per-DID fallback document lists.
pub const DEMO_DATA_PREFIX: &str = "pdm_demo_data_";
