//! # pdm-policy
//!
//! Origin policy for the PDM broker: which caller origins are known, which
//! actions each may invoke, and how fast. Origin configs persist across
//! restarts; rate buckets are in-memory only, so a restart grants a fresh
//! budget.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod errors;
mod origin;
mod types;

pub use errors::{AdmitRejection, PolicyError};
pub use origin::OriginPolicy;
pub use types::{OriginConfig, RateLimitConfig};

/// Whitelist installed by a `connect` that requests no specific action set.
/// An origin that has never connected is not whitelisted at all: any known
/// action is admitted, subject to the blocked flag and the rate bucket.
pub const DEFAULT_ALLOWED_ACTIONS: &[&str] =
    &["ping", "get_identity", "store_data", "retrieve_data"];

/// Session-control and handshake actions are admitted for every origin; the
/// per-origin whitelist governs data actions only. Rate limits still apply.
pub const ALWAYS_ALLOWED_ACTIONS: &[&str] =
    &["connect", "disconnect", "unlock", "lock", "is_unlocked"];

/// Default rate ceiling: 50 requests per 60 seconds.
pub const DEFAULT_MAX_REQUESTS: u32 = 50;
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Persistent key of the origin-config array.
pub const ORIGIN_CONFIGS_KEY: &str = "pdm_origin_configs";
