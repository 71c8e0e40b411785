//! Origin policy records.

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS};

/// Request ceiling over a sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

/// Per-origin policy record. Persisted; the matching rate bucket is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginConfig {
    pub origin: String,
    /// `None` until the origin issues an explicit `connect`: an unconnected
    /// origin may invoke any known action. A `connect` installs the
    /// narrowing whitelist.
    #[serde(default)]
    pub allowed_actions: Option<Vec<String>>,
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub blocked: bool,
    pub created_at: u64,
    pub last_used_at: u64,
}

impl OriginConfig {
    /// Fresh record for a first-seen origin: no whitelist yet, default rate
    /// limit.
    pub fn with_defaults(origin: &str, now_ms: u64) -> Self {
        Self {
            origin: origin.to_string(),
            allowed_actions: None,
            rate_limit: RateLimitConfig::default(),
            blocked: false,
            created_at: now_ms,
            last_used_at: now_ms,
        }
    }
}
