//! Error types for the permission ledger.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A grant must carry at least one permission.
    #[error("permission set must not be empty")]
    EmptyPermissions,

    /// No grant matched the revocation target.
    #[error("grant not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] pdm_store::StoreError),
}
