//! # pdm
//!
//! User-owned private-data broker: passphrase-gated sessions, capability
//! grants, and a resilient remote-storage client with a permanent local
//! fallback. This crate is a facade over the workspace members.

#![forbid(unsafe_code)]

pub use pdm_bridge as bridge;
pub use pdm_broker as broker;
pub use pdm_client as client;
pub use pdm_crypto as crypto;
pub use pdm_ledger as ledger;
pub use pdm_net as net;
pub use pdm_policy as policy;
pub use pdm_session as session;
pub use pdm_store as store;
