//! Error types for the storage client.

use pdm_net::NetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Every operation requires an initialized client.
    #[error("Storage client is not initialized. Unlock first.")]
    Locked,

    /// Missing or malformed argument (empty collection id, empty grant set).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Document or grant id unknown.
    #[error("{0} not found")]
    NotFound(String),

    /// The remote service answered but not with success.
    #[error("upstream failure ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// The remote service answered 2xx with an unusable body.
    #[error("unexpected response shape: {0}")]
    BadResponse(String),

    /// Transport-level failure (adapter down, timeout, connection).
    #[error(transparent)]
    Net(NetError),

    #[error(transparent)]
    Store(#[from] pdm_store::StoreError),
}

impl ClientError {
    /// Whether an Online-path failure flips the client into Fallback.
    ///
    /// Application-level results (`NotFound`, `InvalidArgument`) pass
    /// through; everything that means "the remote path is unhealthy" flips.
    pub(crate) fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            ClientError::Upstream { .. } | ClientError::BadResponse(_) | ClientError::Net(_)
        )
    }
}

impl From<NetError> for ClientError {
    fn from(err: NetError) -> Self {
        match err {
            NetError::Upstream { status, error_text } => ClientError::Upstream {
                status,
                message: error_text,
            },
            other => ClientError::Net(other),
        }
    }
}

impl From<pdm_ledger::LedgerError> for ClientError {
    fn from(err: pdm_ledger::LedgerError) -> Self {
        match err {
            pdm_ledger::LedgerError::NotFound => ClientError::NotFound("Grant".into()),
            pdm_ledger::LedgerError::EmptyPermissions => {
                ClientError::InvalidArgument("permissions must not be empty".into())
            }
            pdm_ledger::LedgerError::Store(e) => ClientError::Store(e),
        }
    }
}
