//! Error types for the origin policy.

use thiserror::Error;

/// Why `admit` refused a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmitRejection {
    /// The action is not in this origin's allowed set.
    #[error("Action '{action}' not allowed for this origin")]
    NotAllowed { action: String },

    /// The origin has been blocked outright.
    #[error("Origin is blocked")]
    Blocked,

    /// The origin exhausted its request budget for the current window.
    #[error("Rate limit exceeded")]
    RateLimited,
}

#[derive(Debug, Error)]
pub enum PolicyError {
    /// A connect carried an unusable rate limit.
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),

    #[error(transparent)]
    Store(#[from] pdm_store::StoreError),
}
