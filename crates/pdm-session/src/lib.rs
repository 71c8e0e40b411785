//! # pdm-session
//!
//! Session management for the PDM broker: the credential blob at rest, the
//! unlock/lock state machine with its inactivity timeout, and the ephemeral
//! restore token that lets a short process restart skip re-unlock.
//!
//! The session manager exclusively owns the in-memory session and the derived
//! key; the credential blob is only ever read on the unlock path and only
//! ever written by an explicit re-store.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod credentials;
mod errors;
mod manager;

pub use credentials::{has_credentials, store_credentials, CredentialBlob, Credentials};
pub use errors::SessionError;
pub use manager::{SessionManager, SessionStatus};

/// Inactivity timeout: 15 minutes.
pub const SESSION_TIMEOUT_MS: u64 = 15 * 60 * 1000;

/// Persistent key of the encrypted credential blob.
pub const CREDENTIALS_KEY: &str = "pdm_nillion_credentials";

/// Ephemeral restore-token keys.
pub const SESSION_ACTIVE_KEY: &str = "pdm_session_active";
pub const SESSION_PASSWORD_KEY: &str = "pdm_session_password";
pub const LAST_ACTIVITY_KEY: &str = "pdm_last_activity";
