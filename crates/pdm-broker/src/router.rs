//! The action router: one entry point for every external action.

use std::sync::Arc;

use pdm_crypto::current_timestamp_millis;
use pdm_session::{Credentials, SessionStatus};
use serde_json::{json, Value};

use crate::actions::{Action, ResponseEnvelope, RouterRequest};
use crate::context::BrokerContext;
use crate::error::BrokerError;

/// Where a message came from. Only web pages (via the content relay) and
/// the host-controlled UI surface are accepted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    ContentRelay,
    HostUi,
    Internal,
}

/// Message sender as declared by the transport.
#[derive(Debug, Clone)]
pub struct Sender {
    pub url: Option<String>,
    pub surface: Surface,
}

impl Sender {
    pub fn relay(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            surface: Surface::ContentRelay,
        }
    }

    pub fn host_ui() -> Self {
        Self {
            url: None,
            surface: Surface::HostUi,
        }
    }
}

/// Host-internal messages from the credential-entry UI, outside the page
/// action table.
#[derive(Debug)]
pub enum InternalMessage {
    CheckCredentials,
    StoreCredentials {
        credentials: Credentials,
        password: String,
    },
}

/// Consolidated entry point. Holds no long-lived state of its own; it reads
/// everything through the context.
pub struct ActionRouter {
    ctx: Arc<BrokerContext>,
}

impl ActionRouter {
    pub fn new(ctx: Arc<BrokerContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<BrokerContext> {
        &self.ctx
    }

    /// Handle one request end to end; every outcome is an envelope.
    pub async fn handle(&self, request: RouterRequest, sender: &Sender) -> ResponseEnvelope {
        let now_ms = current_timestamp_millis();
        let correlation_id = request.correlation_id.clone();
        let action_name = request.action.clone();

        match self.process(request, sender, now_ms).await {
            Ok(data) => ResponseEnvelope::ok(correlation_id, data, current_timestamp_millis()),
            Err(e) => {
                tracing::debug!(action = %action_name, error = %e, "Request rejected");
                ResponseEnvelope::err(correlation_id, e.to_string(), current_timestamp_millis())
            }
        }
    }

    /// Messages from the host UI surface.
    pub async fn handle_internal(
        &self,
        message: InternalMessage,
        sender: &Sender,
    ) -> Result<Value, BrokerError> {
        if sender.surface != Surface::HostUi {
            return Err(BrokerError::InvalidSender(
                "credential messages are accepted from the host UI only".into(),
            ));
        }
        match message {
            InternalMessage::CheckCredentials => {
                Ok(json!({ "hasCredentials": self.ctx.check_credentials() }))
            }
            InternalMessage::StoreCredentials {
                credentials,
                password,
            } => {
                self.ctx.store_credentials(&credentials, &password)?;
                Ok(json!({ "stored": true }))
            }
        }
    }

    async fn process(
        &self,
        request: RouterRequest,
        sender: &Sender,
        now_ms: u64,
    ) -> Result<Value, BrokerError> {
        // 1. Structural validation.
        if request.correlation_id.trim().is_empty() {
            return Err(BrokerError::InvalidArgument(
                "correlationId is required".into(),
            ));
        }
        if request.action.trim().is_empty() {
            return Err(BrokerError::InvalidArgument("action is required".into()));
        }
        if request.origin.trim().is_empty() {
            return Err(BrokerError::InvalidArgument("origin is required".into()));
        }

        // 2. Sender validation.
        validate_sender(sender)?;

        let action = Action::parse(&request.action, request.payload)?;

        // 3. Admission. A RateLimited outcome returns here, before anything
        //    touches the session.
        self.ctx.policy.admit(&request.origin, action.name(), now_ms)?;

        // 4. Lock gate, evaluated before dispatch so no work runs against a
        //    locked session.
        if !action.bypasses_lock_gate() {
            match self.ctx.session.status(now_ms) {
                SessionStatus::Unlocked => {}
                SessionStatus::Locked => return Err(BrokerError::Locked),
                SessionStatus::Expired => {
                    tracing::info!("Session expired by inactivity, locking");
                    self.ctx.session.lock();
                    self.ctx.client.reset().await;
                    return Err(BrokerError::SessionExpired);
                }
            }
        }

        // 5. Activity bump and restore-token re-mirror, before the first
        //    dispatch suspension point.
        match action {
            Action::Unlock(_) | Action::Lock => {}
            _ => {
                if self.ctx.session.is_unlocked(now_ms) {
                    self.ctx.session.touch(now_ms);
                }
            }
        }

        // 6. Dispatch.
        self.dispatch(action, &request.origin, now_ms).await
    }

    async fn dispatch(
        &self,
        action: Action,
        origin: &str,
        now_ms: u64,
    ) -> Result<Value, BrokerError> {
        match action {
            Action::Ping => Ok(json!({
                "status": "pong",
                "ts": now_ms,
                "version": env!("CARGO_PKG_VERSION"),
            })),

            Action::Connect(payload) => {
                let allowed = self.ctx.policy.connect(
                    origin,
                    &payload.requested_actions,
                    payload.rate_limit,
                    now_ms,
                )?;
                Ok(json!({ "origin": origin, "allowedActions": allowed }))
            }

            Action::Disconnect => {
                let removed = self.ctx.policy.disconnect(origin);
                Ok(json!({ "disconnected": removed }))
            }

            Action::Unlock(payload) => {
                let credentials = self.ctx.session.unlock(&payload.password, now_ms)?;
                let did = self.ctx.client.initialize(&credentials).await?;
                self.ctx.session.set_user_did(&did);
                Ok(json!({ "unlocked": true }))
            }

            Action::Lock => {
                self.ctx.session.lock();
                self.ctx.client.reset().await;
                Ok(json!({ "locked": true }))
            }

            Action::IsUnlocked => Ok(json!({
                "unlocked": self.ctx.session.is_unlocked(now_ms)
            })),

            Action::GetIdentity => {
                let did = self.ctx.client.user_did().await?;
                Ok(json!({ "did": did }))
            }

            Action::StoreData(payload) => {
                let id = self
                    .ctx
                    .client
                    .store(&payload.data, &payload.metadata.collection_id)
                    .await?;
                Ok(json!({
                    "documentId": id,
                    "collectionId": payload.metadata.collection_id,
                }))
            }

            Action::RetrieveData(doc) => {
                let record = self
                    .ctx
                    .client
                    .read(&doc.document_id, &doc.collection_id)
                    .await?;
                serde_json::to_value(record).map_err(|e| BrokerError::Internal(e.to_string()))
            }

            Action::DeleteData(doc) => {
                self.ctx
                    .client
                    .delete(&doc.document_id, &doc.collection_id)
                    .await?;
                Ok(json!({ "deleted": true, "documentId": doc.document_id }))
            }

            Action::GetUserData => {
                let records = self.ctx.client.list().await?;
                Ok(json!({ "data": records }))
            }

            Action::GrantPermission(payload) => {
                let grant = self
                    .ctx
                    .client
                    .grant(
                        &payload.data_id,
                        &payload.collection_id,
                        &payload.app_did,
                        &payload.permissions,
                    )
                    .await?;
                serde_json::to_value(grant).map_err(|e| BrokerError::Internal(e.to_string()))
            }

            Action::RevokePermission(payload) => {
                self.ctx
                    .client
                    .revoke(
                        &payload.data_id,
                        &payload.collection_id,
                        &payload.app_did,
                        payload.permission_id,
                    )
                    .await?;
                Ok(json!({ "revoked": true }))
            }

            Action::ListPermissions => {
                let grants = self.ctx.client.list_grants().await?;
                Ok(json!({ "permissions": grants }))
            }
        }
    }
}

fn validate_sender(sender: &Sender) -> Result<(), BrokerError> {
    match sender.surface {
        Surface::HostUi => Ok(()),
        Surface::Internal => Err(BrokerError::InvalidSender(
            "internal surfaces may not issue page actions".into(),
        )),
        Surface::ContentRelay => {
            if sender.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                Err(BrokerError::InvalidSender(
                    "sender must declare a URL".into(),
                ))
            } else {
                Ok(())
            }
        }
    }
}
