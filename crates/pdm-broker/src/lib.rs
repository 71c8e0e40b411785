//! # pdm-broker
//!
//! The broker's composition root and its single entry point for external
//! actions. Every request, whatever surface it arrives from, passes the
//! same sequence: structural validation, sender validation, origin
//! admission, the session lock gate, an activity bump, and a table dispatch
//! into the storage client or the permission ledger. Every outcome leaves as
//! the same response envelope.
//!
//! There are no ambient singletons: a [`BrokerContext`] is constructed once
//! at process start and passed explicitly.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod actions;
mod config;
mod context;
mod error;
mod router;

pub use actions::{
    Action, ConnectPayload, DocumentRef, GrantPermissionPayload, ResponseEnvelope,
    RevokePermissionPayload, RouterRequest, StoreDataPayload, UnlockPayload, KNOWN_ACTIONS,
};
pub use config::{BrokerConfig, DEFAULT_SERVER_URL};
pub use context::BrokerContext;
pub use error::BrokerError;
pub use router::{ActionRouter, InternalMessage, Sender, Surface};
