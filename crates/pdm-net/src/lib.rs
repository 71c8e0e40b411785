//! # pdm-net
//!
//! Network adapter for the PDM broker. The background context is not allowed
//! to originate outbound requests itself, so a dedicated auxiliary task owns
//! the HTTP client and the adapter forwards call envelopes to it over typed
//! channels: a readiness handshake at setup, a liveness probe, and one
//! oneshot reply per call. Correlation is the channel itself; there is no id
//! bookkeeping.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod adapter;
mod errors;

pub use adapter::{Method, NetworkAdapter};
pub use errors::NetError;

use std::time::Duration;

/// Auxiliary setup must signal READY within this window.
pub const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Every cross-boundary call fails after this long.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP connect budget for the auxiliary's HTTP client.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Liveness probe window; a silent auxiliary is considered stale.
pub const PING_TIMEOUT: Duration = Duration::from_secs(2);
