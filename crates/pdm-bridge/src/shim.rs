//! The in-page shim: the fixed capability surface applications call.

use pdm_crypto::{current_timestamp_millis, new_uuid};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;

use crate::bus::{WindowBus, WindowId, WindowMessage};
use crate::errors::BridgeError;
use crate::messages::{PageMessage, PageRequest, FILE_ORIGIN_SENTINEL, WILDCARD_TARGET};
use crate::BRIDGE_TIMEOUT;

/// What a web application holds. Each call mints a correlation id, posts a
/// request envelope to the same window with a targeted origin, and waits on
/// a one-shot listener for the matching response.
pub struct PageShim {
    bus: WindowBus,
    window: WindowId,
    origin: String,
}

impl PageShim {
    pub fn new(bus: WindowBus, window: WindowId, origin: &str) -> Self {
        Self {
            bus,
            window,
            origin: origin.to_string(),
        }
    }

    /// Issue one request and wait for its response.
    ///
    /// The listener verifies the correlation id and, unless the page runs
    /// from the file scheme, the responder's origin. Timeout rejects with
    /// the literal `PDM request timeout`.
    pub async fn request(&self, action: &str, data: Value) -> Result<Value, BridgeError> {
        let id = new_uuid().to_string();

        // Listener first, then post, so the response cannot race past us.
        let mut rx = self.bus.subscribe();

        let target = if self.origin == FILE_ORIGIN_SENTINEL {
            WILDCARD_TARGET
        } else {
            self.origin.as_str()
        };
        self.bus.post(WindowMessage {
            source: self.window,
            origin: self.origin.clone(),
            target_origin: target.to_string(),
            message: PageMessage::Request(PageRequest {
                id: id.clone(),
                action: action.to_string(),
                data,
                origin: self.origin.clone(),
                ts: current_timestamp_millis(),
            }),
        });

        let deadline = Instant::now() + BRIDGE_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let received = match tokio::time::timeout(remaining, rx.recv()).await {
                Err(_) => return Err(BridgeError::Timeout),
                Ok(Err(RecvError::Closed)) => return Err(BridgeError::ChannelClosed),
                Ok(Err(RecvError::Lagged(_))) => continue,
                Ok(Ok(received)) => received,
            };

            let PageMessage::Response(response) = received.message else {
                continue;
            };
            if response.id != id {
                continue;
            }
            if self.origin != FILE_ORIGIN_SENTINEL && received.origin != self.origin {
                tracing::debug!(origin = %received.origin, "Dropping response from foreign origin");
                continue;
            }

            return match response.error {
                Some(error) => Err(BridgeError::Api(error)),
                None => Ok(response.data.unwrap_or(Value::Null)),
            };
        }
    }

    // The fixed capability surface.

    pub async fn ping(&self) -> Result<Value, BridgeError> {
        self.request("ping", json!({})).await
    }

    pub async fn connect(&self, requested_actions: &[&str]) -> Result<Value, BridgeError> {
        self.request("connect", json!({ "requestedActions": requested_actions }))
            .await
    }

    pub async fn disconnect(&self) -> Result<Value, BridgeError> {
        self.request("disconnect", json!({})).await
    }

    pub async fn unlock(&self, password: &str) -> Result<Value, BridgeError> {
        self.request("unlock", json!({ "password": password })).await
    }

    pub async fn lock(&self) -> Result<Value, BridgeError> {
        self.request("lock", json!({})).await
    }

    pub async fn is_unlocked(&self) -> Result<Value, BridgeError> {
        self.request("is_unlocked", json!({})).await
    }

    pub async fn get_identity(&self) -> Result<Value, BridgeError> {
        self.request("get_identity", json!({})).await
    }

    pub async fn store_data(
        &self,
        data: Value,
        collection_id: &str,
    ) -> Result<Value, BridgeError> {
        self.request(
            "store_data",
            json!({ "data": data, "metadata": { "collectionId": collection_id } }),
        )
        .await
    }

    pub async fn retrieve_data(
        &self,
        document_id: &str,
        collection_id: &str,
    ) -> Result<Value, BridgeError> {
        self.request(
            "retrieve_data",
            json!({ "documentId": document_id, "collectionId": collection_id }),
        )
        .await
    }

    pub async fn delete_data(
        &self,
        document_id: &str,
        collection_id: &str,
    ) -> Result<Value, BridgeError> {
        self.request(
            "delete_data",
            json!({ "documentId": document_id, "collectionId": collection_id }),
        )
        .await
    }

    pub async fn get_user_data(&self) -> Result<Value, BridgeError> {
        self.request("get_user_data", json!({})).await
    }

    pub async fn grant_permission(
        &self,
        data_id: &str,
        collection_id: &str,
        app_did: &str,
        permissions: &[&str],
    ) -> Result<Value, BridgeError> {
        self.request(
            "grant_permission",
            json!({
                "dataId": data_id,
                "collectionId": collection_id,
                "appDid": app_did,
                "permissions": permissions,
            }),
        )
        .await
    }

    pub async fn revoke_permission(
        &self,
        data_id: &str,
        collection_id: &str,
        app_did: &str,
        permission_id: Option<&str>,
    ) -> Result<Value, BridgeError> {
        let mut payload = json!({
            "dataId": data_id,
            "collectionId": collection_id,
            "appDid": app_did,
        });
        if let Some(id) = permission_id {
            payload["permissionId"] = json!(id);
        }
        self.request("revoke_permission", payload).await
    }

    pub async fn list_permissions(&self) -> Result<Value, BridgeError> {
        self.request("list_permissions", json!({})).await
    }
}
