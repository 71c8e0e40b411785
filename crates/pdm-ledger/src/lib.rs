//! # pdm-ledger
//!
//! The capability grant ledger. A grant authorizes one grantee application to
//! perform a non-empty subset of `{read, write, execute}` against a specific
//! document within a specific collection.
//!
//! In Online mode the authoritative ledger lives on the remote service and
//! this crate's records are a projection; in Fallback mode the local ledger
//! under `pdm_permissions_<did>` is the authority. Listing is insertion order
//! minus tombstones; revocation targets a specific `grant_id`, or every match
//! of a `(document, collection, grantee)` tuple.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod errors;
mod grant;
mod ledger;

pub use errors::LedgerError;
pub use grant::{Grant, Permission};
pub use ledger::PermissionLedger;
