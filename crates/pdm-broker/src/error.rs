//! Broker-level error mapping.
//!
//! Each component surfaces its own kind; the router turns whatever reaches
//! it into the envelope's `error` string via `Display`. Nothing below is
//! recovered silently; the only silent recovery in the system is the
//! storage client's Online-to-Fallback transition, which happens beneath
//! `ClientError` and is logged there.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    /// Structural validation failure or malformed payload.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The message sender is not an accepted surface.
    #[error("Unauthorized sender: {0}")]
    InvalidSender(String),

    /// Action requires an unlocked session.
    #[error("Session is locked. Unlock first.")]
    Locked,

    /// The session idled past its timeout; this request locked it.
    #[error("Session expired due to inactivity. Unlock again.")]
    SessionExpired,

    #[error(transparent)]
    Admission(#[from] pdm_policy::AdmitRejection),

    #[error(transparent)]
    Policy(#[from] pdm_policy::PolicyError),

    #[error(transparent)]
    Session(#[from] pdm_session::SessionError),

    #[error(transparent)]
    Client(#[from] pdm_client::ClientError),

    #[error(transparent)]
    Store(#[from] pdm_store::StoreError),

    /// Should-not-happen serialization failures inside dispatch.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BrokerError {
    /// Rate-limit refusals must not charge session activity.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            BrokerError::Admission(pdm_policy::AdmitRejection::RateLimited)
        )
    }
}
