//! The storage client facade: initialization, mode, and uniform operations.

use pdm_crypto::{current_timestamp_millis, sha256};
use pdm_ledger::{Grant, Permission};
use pdm_net::NetworkAdapter;
use pdm_session::Credentials;
use pdm_store::SecretStore;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::RemoteApi;
use crate::backend::{DataBackend, FallbackStore, OnlineStore};
use crate::errors::ClientError;
use crate::records::{DocumentRecord, UserIdentity};
use crate::{DEMO_MODE_KEY, USER_DID_KEY, USER_IDENTITY_KEY};

/// Observable operating mode, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    Online,
    Fallback,
}

enum Mode {
    Online(OnlineStore),
    Fallback(FallbackStore),
}

struct ReadyState {
    mode: Mode,
    user_did: String,
}

enum ClientState {
    Locked,
    Ready(ReadyState),
}

/// Typed store / list / read / delete / grant / revoke against the remote
/// service, falling back permanently to local persistence on upstream
/// failure. Same contract in both modes.
///
/// Each operation runs against the current backend; an Online failure that
/// marks the remote path unhealthy performs the one-way transition (persist
/// the flag, retry once on the Fallback path, keep the new mode). Fallback
/// never transitions back within the process.
pub struct StorageClient {
    store: SecretStore,
    adapter: NetworkAdapter,
    state: Mutex<ClientState>,
}

impl StorageClient {
    pub fn new(store: SecretStore, adapter: NetworkAdapter) -> Self {
        Self {
            store,
            adapter,
            state: Mutex::new(ClientState::Locked),
        }
    }

    /// Initialize with unlocked credentials; resolves the user's DID.
    ///
    /// A persisted fallback flag short-circuits straight into Fallback mode.
    /// Otherwise the remote service is asked once; any failure there flips
    /// the client into Fallback permanently and persists the flag.
    pub async fn initialize(&self, credentials: &Credentials) -> Result<String, ClientError> {
        let mut state = self.state.lock().await;

        let sticky_fallback: bool = self
            .store
            .get_persistent(DEMO_MODE_KEY)?
            .unwrap_or(false);
        if sticky_fallback {
            let did = self.fallback_did(credentials)?;
            tracing::info!(did = %did, "Starting in fallback mode (persisted flag)");
            *state = ClientState::Ready(ReadyState {
                mode: Mode::Fallback(FallbackStore::new(self.store.clone(), &did)),
                user_did: did.clone(),
            });
            return Ok(did);
        }

        let api = RemoteApi::new(self.adapter.clone(), credentials.signing_key().to_string());
        match api.user_did().await {
            Ok(did) => {
                self.persist_identity(&did);
                tracing::info!(did = %did, "Storage client online");
                *state = ClientState::Ready(ReadyState {
                    mode: Mode::Online(OnlineStore::new(api)),
                    user_did: did.clone(),
                });
                Ok(did)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote identity lookup failed, entering fallback mode");
                let did = self.fallback_did(credentials)?;
                self.mark_fallback();
                *state = ClientState::Ready(ReadyState {
                    mode: Mode::Fallback(FallbackStore::new(self.store.clone(), &did)),
                    user_did: did.clone(),
                });
                Ok(did)
            }
        }
    }

    /// Forget the initialized state (session lock, process teardown).
    pub async fn reset(&self) {
        *self.state.lock().await = ClientState::Locked;
    }

    pub async fn is_initialized(&self) -> bool {
        matches!(&*self.state.lock().await, ClientState::Ready(_))
    }

    pub async fn mode(&self) -> Option<ClientMode> {
        match &*self.state.lock().await {
            ClientState::Ready(ready) => Some(match ready.mode {
                Mode::Online(_) => ClientMode::Online,
                Mode::Fallback(_) => ClientMode::Fallback,
            }),
            ClientState::Locked => None,
        }
    }

    pub async fn user_did(&self) -> Result<String, ClientError> {
        match &*self.state.lock().await {
            ClientState::Ready(ready) => Ok(ready.user_did.clone()),
            ClientState::Locked => Err(ClientError::Locked),
        }
    }

    /// Probe the remote service's health endpoint. Does not require
    /// initialization and never affects the mode.
    pub async fn health(&self) -> Result<Value, ClientError> {
        Ok(self
            .adapter
            .call("/health", pdm_net::Method::Get, None)
            .await?)
    }

    pub async fn store(&self, payload: &Value, collection_id: &str) -> Result<String, ClientError> {
        require_collection(collection_id)?;
        let mut state = self.state.lock().await;
        let ready = ready_state(&mut state)?;
        match &ready.mode {
            Mode::Fallback(fallback) => fallback.store(payload, collection_id).await,
            Mode::Online(online) => match online.store(payload, collection_id).await {
                Err(e) if e.triggers_fallback() => {
                    let fallback = self.enter_fallback(&ready.user_did, &e);
                    let result = fallback.store(payload, collection_id).await;
                    ready.mode = Mode::Fallback(fallback);
                    result
                }
                other => other,
            },
        }
    }

    pub async fn list(&self) -> Result<Vec<DocumentRecord>, ClientError> {
        let mut state = self.state.lock().await;
        let ready = ready_state(&mut state)?;
        match &ready.mode {
            Mode::Fallback(fallback) => fallback.list().await,
            Mode::Online(online) => match online.list().await {
                Err(e) if e.triggers_fallback() => {
                    let fallback = self.enter_fallback(&ready.user_did, &e);
                    let result = fallback.list().await;
                    ready.mode = Mode::Fallback(fallback);
                    result
                }
                other => other,
            },
        }
    }

    pub async fn read(
        &self,
        document_id: &str,
        collection_id: &str,
    ) -> Result<DocumentRecord, ClientError> {
        require_collection(collection_id)?;
        let mut state = self.state.lock().await;
        let ready = ready_state(&mut state)?;
        match &ready.mode {
            Mode::Fallback(fallback) => fallback.read(document_id, collection_id).await,
            Mode::Online(online) => match online.read(document_id, collection_id).await {
                Err(e) if e.triggers_fallback() => {
                    let fallback = self.enter_fallback(&ready.user_did, &e);
                    let result = fallback.read(document_id, collection_id).await;
                    ready.mode = Mode::Fallback(fallback);
                    result
                }
                other => other,
            },
        }
    }

    pub async fn delete(&self, document_id: &str, collection_id: &str) -> Result<(), ClientError> {
        require_collection(collection_id)?;
        let mut state = self.state.lock().await;
        let ready = ready_state(&mut state)?;
        match &ready.mode {
            Mode::Fallback(fallback) => fallback.delete(document_id, collection_id).await,
            Mode::Online(online) => match online.delete(document_id, collection_id).await {
                Err(e) if e.triggers_fallback() => {
                    let fallback = self.enter_fallback(&ready.user_did, &e);
                    let result = fallback.delete(document_id, collection_id).await;
                    ready.mode = Mode::Fallback(fallback);
                    result
                }
                other => other,
            },
        }
    }

    pub async fn grant(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        permissions: &[Permission],
    ) -> Result<Grant, ClientError> {
        require_collection(collection_id)?;
        if permissions.is_empty() {
            return Err(ClientError::InvalidArgument(
                "permissions must not be empty".into(),
            ));
        }
        let mut state = self.state.lock().await;
        let ready = ready_state(&mut state)?;
        match &ready.mode {
            Mode::Fallback(fallback) => {
                fallback
                    .grant(document_id, collection_id, grantee_id, permissions)
                    .await
            }
            Mode::Online(online) => {
                match online
                    .grant(document_id, collection_id, grantee_id, permissions)
                    .await
                {
                    Err(e) if e.triggers_fallback() => {
                        let fallback = self.enter_fallback(&ready.user_did, &e);
                        let result = fallback
                            .grant(document_id, collection_id, grantee_id, permissions)
                            .await;
                        ready.mode = Mode::Fallback(fallback);
                        result
                    }
                    other => other,
                }
            }
        }
    }

    pub async fn revoke(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        grant_id: Option<Uuid>,
    ) -> Result<(), ClientError> {
        require_collection(collection_id)?;
        let mut state = self.state.lock().await;
        let ready = ready_state(&mut state)?;
        match &ready.mode {
            Mode::Fallback(fallback) => {
                fallback
                    .revoke(document_id, collection_id, grantee_id, grant_id)
                    .await
            }
            Mode::Online(online) => {
                match online
                    .revoke(document_id, collection_id, grantee_id, grant_id)
                    .await
                {
                    Err(e) if e.triggers_fallback() => {
                        let fallback = self.enter_fallback(&ready.user_did, &e);
                        let result = fallback
                            .revoke(document_id, collection_id, grantee_id, grant_id)
                            .await;
                        ready.mode = Mode::Fallback(fallback);
                        result
                    }
                    other => other,
                }
            }
        }
    }

    pub async fn list_grants(&self) -> Result<Vec<Grant>, ClientError> {
        let mut state = self.state.lock().await;
        let ready = ready_state(&mut state)?;
        match &ready.mode {
            Mode::Fallback(fallback) => fallback.list_grants().await,
            Mode::Online(online) => match online.list_grants().await {
                Err(e) if e.triggers_fallback() => {
                    let fallback = self.enter_fallback(&ready.user_did, &e);
                    let result = fallback.list_grants().await;
                    ready.mode = Mode::Fallback(fallback);
                    result
                }
                other => other,
            },
        }
    }

    /// The one-way transition: log it, persist the sticky flag, build the
    /// fallback backend over the same DID.
    fn enter_fallback(&self, user_did: &str, cause: &ClientError) -> FallbackStore {
        tracing::warn!(
            error = %cause,
            "Remote storage failed, switching to fallback mode permanently"
        );
        self.mark_fallback();
        FallbackStore::new(self.store.clone(), user_did)
    }

    /// Stable fallback identity: the persisted DID when one exists,
    /// otherwise a deterministic placeholder derived from the API key.
    fn fallback_did(&self, credentials: &Credentials) -> Result<String, ClientError> {
        if let Some(did) = self.store.get_persistent::<String>(USER_DID_KEY)? {
            return Ok(did);
        }
        let digest = sha256(credentials.api_key.as_bytes());
        let did = format!("did:nil:{}", hex::encode(digest));
        self.persist_identity(&did);
        Ok(did)
    }

    fn persist_identity(&self, did: &str) {
        if let Err(e) = self.store.put_persistent(USER_DID_KEY, &did) {
            tracing::warn!(error = %e, "Failed to persist user DID");
        }
        let exists = matches!(
            self.store.get_persistent::<UserIdentity>(USER_IDENTITY_KEY),
            Ok(Some(_))
        );
        if !exists {
            let identity = UserIdentity {
                did: did.to_string(),
                created_at: current_timestamp_millis(),
            };
            if let Err(e) = self.store.put_persistent(USER_IDENTITY_KEY, &identity) {
                tracing::warn!(error = %e, "Failed to persist identity record");
            }
        }
    }

    fn mark_fallback(&self) {
        if let Err(e) = self.store.put_persistent(DEMO_MODE_KEY, &true) {
            tracing::warn!(error = %e, "Failed to persist fallback flag");
        }
    }
}

fn ready_state(state: &mut ClientState) -> Result<&mut ReadyState, ClientError> {
    match state {
        ClientState::Ready(ready) => Ok(ready),
        ClientState::Locked => Err(ClientError::Locked),
    }
}

fn require_collection(collection_id: &str) -> Result<(), ClientError> {
    if collection_id.trim().is_empty() {
        return Err(ClientError::InvalidArgument(
            "collectionId is required".into(),
        ));
    }
    Ok(())
}
