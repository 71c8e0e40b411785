//! # pdm-bridge
//!
//! The capability surface exposed to web pages, split across two contexts
//! the way the host runtime splits them:
//!
//! - the **in-page shim** ([`PageShim`]) that applications call; it mints a
//!   correlation id per request, posts an envelope to its own window with a
//!   targeted origin, and waits on a one-shot listener with a timeout;
//! - the **content relay** ([`ContentRelay`]) in the same window; it
//!   validates source, origin, and shape, forwards to the background router,
//!   and pipes the response back.
//!
//! Same-window message passing is modeled as a broadcast [`WindowBus`]:
//! every participant sees every message, exactly like `postMessage` on a
//! shared `window`. The page never receives key material or the passphrase;
//! only response payloads cross the bus.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod bus;
mod errors;
mod messages;
mod relay;
mod shim;

pub use bus::{WindowBus, WindowId, WindowMessage};
pub use errors::BridgeError;
pub use messages::{PageMessage, PageRequest, PageResponse, FILE_ORIGIN_SENTINEL, WILDCARD_TARGET};
pub use relay::ContentRelay;
pub use shim::PageShim;

use std::time::Duration;

/// Per-request timeout, applied independently on the page side and the
/// relay side.
pub const BRIDGE_TIMEOUT: Duration = Duration::from_secs(30);

/// The literal timeout message callers can match on to distinguish
/// transport failure from application failure.
pub const TIMEOUT_MESSAGE: &str = "PDM request timeout";
