//! The content relay: validates page envelopes and tunnels them to the
//! background router.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use pdm_broker::{ActionRouter, RouterRequest, Sender};
use pdm_crypto::current_timestamp_millis;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::bus::{WindowBus, WindowId, WindowMessage};
use crate::messages::{PageMessage, PageRequest, PageResponse, FILE_ORIGIN_SENTINEL, WILDCARD_TARGET};
use crate::{BRIDGE_TIMEOUT, TIMEOUT_MESSAGE};

/// Notice injected into the page when the host runtime is gone.
const HOST_GONE_NOTICE: &str = "PDM was updated or restarted. Please reload this page.";

struct PendingRequest {
    #[allow(dead_code)] // kept for diagnostics of stuck requests
    action: String,
    expires_at: u64,
}

/// Relay between the page window and the background router. Keeps its own
/// per-request timeout, distinct from the page's, and its own pending table.
#[derive(Clone)]
pub struct ContentRelay {
    bus: WindowBus,
    page_window: WindowId,
    page_origin: String,
    router: Weak<ActionRouter>,
    pending: Arc<Mutex<HashMap<String, PendingRequest>>>,
}

fn lock_pending(
    mutex: &Mutex<HashMap<String, PendingRequest>>,
) -> MutexGuard<'_, HashMap<String, PendingRequest>> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ContentRelay {
    pub fn new(
        bus: WindowBus,
        page_window: WindowId,
        page_origin: &str,
        router: &Arc<ActionRouter>,
    ) -> Self {
        Self {
            bus,
            page_window,
            page_origin: page_origin.to_string(),
            router: Arc::downgrade(router),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Install the listener and start relaying. The subscription is taken
    /// before the task spawns, so no message posted after this call is lost.
    pub fn spawn(self) -> JoinHandle<()> {
        let rx = self.bus.subscribe();
        tokio::spawn(self.run(rx))
    }

    async fn run(self, mut rx: tokio::sync::broadcast::Receiver<WindowMessage>) {
        loop {
            match rx.recv().await {
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Relay lagged behind the window bus");
                }
                Ok(message) => self.handle_message(message),
            }
        }
        tracing::debug!("Content relay shutting down");
    }

    fn handle_message(&self, message: WindowMessage) {
        self.sweep_expired();

        // Only requests from the page's own window.
        if message.source != self.page_window {
            return;
        }
        // Origin must match the page, except for the file-scheme case.
        if self.page_origin != FILE_ORIGIN_SENTINEL && message.origin != self.page_origin {
            tracing::debug!(origin = %message.origin, "Dropping request from foreign origin");
            return;
        }
        let PageMessage::Request(request) = message.message else {
            return;
        };
        if request.id.trim().is_empty() {
            return; // nothing to correlate an answer to
        }
        if request.action.trim().is_empty() || request.origin.trim().is_empty() {
            self.post_response(PageResponse {
                id: request.id,
                data: None,
                error: Some("Invalid request: action and origin are required".into()),
                ts: current_timestamp_millis(),
            });
            return;
        }

        // Host-restart detection: the background router is gone.
        let Some(router) = self.router.upgrade() else {
            tracing::warn!("Background router is gone, asking the page to reload");
            self.post_notice(HOST_GONE_NOTICE);
            return;
        };

        let now_ms = current_timestamp_millis();
        lock_pending(&self.pending).insert(
            request.id.clone(),
            PendingRequest {
                action: request.action.clone(),
                expires_at: now_ms + BRIDGE_TIMEOUT.as_millis() as u64,
            },
        );

        // Forwarding is spawned in arrival order; each dispatch is its own
        // task so a slow one cannot stall the relay loop.
        let relay = self.clone();
        tokio::spawn(async move {
            relay.forward(router, request).await;
        });
    }

    async fn forward(&self, router: Arc<ActionRouter>, request: PageRequest) {
        let id = request.id.clone();
        let sender = Sender::relay(&request.origin);
        let router_request = RouterRequest {
            correlation_id: id.clone(),
            action: request.action,
            payload: request.data,
            origin: request.origin,
        };

        let response = match tokio::time::timeout(
            BRIDGE_TIMEOUT,
            router.handle(router_request, &sender),
        )
        .await
        {
            Ok(envelope) => PageResponse {
                id: id.clone(),
                data: envelope.data,
                error: envelope.error,
                ts: envelope.ts,
            },
            Err(_) => PageResponse {
                id: id.clone(),
                data: None,
                error: Some(TIMEOUT_MESSAGE.into()),
                ts: current_timestamp_millis(),
            },
        };

        lock_pending(&self.pending).remove(&id);
        self.post_response(response);
    }

    fn post_response(&self, response: PageResponse) {
        self.bus.post(WindowMessage {
            source: self.page_window,
            origin: self.page_origin.clone(),
            target_origin: self.target(),
            message: PageMessage::Response(response),
        });
    }

    fn post_notice(&self, text: &str) {
        self.bus.post(WindowMessage {
            source: self.page_window,
            origin: self.page_origin.clone(),
            target_origin: self.target(),
            message: PageMessage::Notice {
                text: text.to_string(),
            },
        });
    }

    fn target(&self) -> String {
        if self.page_origin == FILE_ORIGIN_SENTINEL {
            WILDCARD_TARGET.to_string()
        } else {
            self.page_origin.clone()
        }
    }

    fn sweep_expired(&self) {
        let now_ms = current_timestamp_millis();
        lock_pending(&self.pending).retain(|_, pending| pending.expires_at > now_ms);
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        lock_pending(&self.pending).len()
    }
}
