//! The shared-window message bus.

use tokio::sync::broadcast;

use crate::messages::PageMessage;

const BUS_CAPACITY: usize = 64;

/// Identifies a window within one page context. The relay uses it to verify
/// that a request came from the page's own window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowId(pub u32);

/// One posted message: who sent it, from which origin, targeted where.
#[derive(Debug, Clone)]
pub struct WindowMessage {
    pub source: WindowId,
    pub origin: String,
    pub target_origin: String,
    pub message: PageMessage,
}

/// Broadcast stand-in for same-window `postMessage`: every subscriber sees
/// every message and filters for itself.
#[derive(Clone)]
pub struct WindowBus {
    tx: broadcast::Sender<WindowMessage>,
}

impl WindowBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Post to the window. A post with no listeners is silently dropped,
    /// as on a real window.
    pub fn post(&self, message: WindowMessage) {
        let _ = self.tx.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WindowMessage> {
        self.tx.subscribe()
    }
}

impl Default for WindowBus {
    fn default() -> Self {
        Self::new()
    }
}
