//! The shared backend contract and its two implementations.
//!
//! `OnlineStore` talks to the remote service; `FallbackStore` preserves the
//! same contract over local persistence. Both are complete: the client
//! switches between whole backends, never between individual code paths.

use async_trait::async_trait;
use pdm_crypto::{current_timestamp_millis, new_uuid};
use pdm_ledger::{Grant, Permission, PermissionLedger};
use pdm_store::SecretStore;
use serde_json::Value;
use uuid::Uuid;

use crate::api::RemoteApi;
use crate::errors::ClientError;
use crate::records::DocumentRecord;
use crate::DEMO_DATA_PREFIX;

#[async_trait]
pub(crate) trait DataBackend: Send + Sync {
    async fn store(&self, payload: &Value, collection_id: &str) -> Result<String, ClientError>;
    async fn list(&self) -> Result<Vec<DocumentRecord>, ClientError>;
    async fn read(
        &self,
        document_id: &str,
        collection_id: &str,
    ) -> Result<DocumentRecord, ClientError>;
    async fn delete(&self, document_id: &str, collection_id: &str) -> Result<(), ClientError>;
    async fn grant(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        permissions: &[Permission],
    ) -> Result<Grant, ClientError>;
    async fn revoke(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        grant_id: Option<Uuid>,
    ) -> Result<(), ClientError>;
    async fn list_grants(&self) -> Result<Vec<Grant>, ClientError>;
}

pub(crate) struct OnlineStore {
    api: RemoteApi,
}

impl OnlineStore {
    pub fn new(api: RemoteApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataBackend for OnlineStore {
    async fn store(&self, payload: &Value, collection_id: &str) -> Result<String, ClientError> {
        self.api.store(collection_id, payload).await
    }

    async fn list(&self) -> Result<Vec<DocumentRecord>, ClientError> {
        self.api.list().await
    }

    async fn read(
        &self,
        document_id: &str,
        collection_id: &str,
    ) -> Result<DocumentRecord, ClientError> {
        self.api.read(document_id, collection_id).await
    }

    async fn delete(&self, document_id: &str, collection_id: &str) -> Result<(), ClientError> {
        self.api.delete(document_id, collection_id).await
    }

    async fn grant(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        permissions: &[Permission],
    ) -> Result<Grant, ClientError> {
        self.api
            .grant(document_id, collection_id, grantee_id, permissions)
            .await
    }

    async fn revoke(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        grant_id: Option<Uuid>,
    ) -> Result<(), ClientError> {
        self.api
            .revoke(document_id, collection_id, grantee_id, grant_id)
            .await
    }

    async fn list_grants(&self) -> Result<Vec<Grant>, ClientError> {
        self.api.list_grants().await
    }
}

pub(crate) struct FallbackStore {
    store: SecretStore,
    ledger: PermissionLedger,
    user_did: String,
    data_key: String,
}

impl FallbackStore {
    pub fn new(store: SecretStore, user_did: &str) -> Self {
        Self {
            ledger: PermissionLedger::new(store.clone(), user_did),
            data_key: format!("{DEMO_DATA_PREFIX}{user_did}"),
            user_did: user_did.to_string(),
            store,
        }
    }

    fn load_documents(&self) -> Result<Vec<DocumentRecord>, ClientError> {
        Ok(self.store.get_persistent(&self.data_key)?.unwrap_or_default())
    }

    fn save_documents(&self, documents: &[DocumentRecord]) -> Result<(), ClientError> {
        self.store.put_persistent(&self.data_key, &documents)?;
        Ok(())
    }

    /// One-time adoption of a sibling DID's document list. Runs only while
    /// this DID's own list is empty, so it cannot clobber real data.
    fn migrate_sibling_data(&self) -> Result<Vec<DocumentRecord>, ClientError> {
        for key in self.store.persistent_keys()? {
            if !key.starts_with(DEMO_DATA_PREFIX) || key == self.data_key {
                continue;
            }
            let documents: Vec<DocumentRecord> =
                self.store.get_persistent(&key)?.unwrap_or_default();
            if documents.is_empty() {
                continue;
            }
            tracing::info!(
                from = %key,
                count = documents.len(),
                "Migrating fallback data from sibling identity"
            );
            self.save_documents(&documents)?;
            self.store.remove_persistent(&key)?;
            return Ok(documents);
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl DataBackend for FallbackStore {
    async fn store(&self, payload: &Value, collection_id: &str) -> Result<String, ClientError> {
        let record = DocumentRecord {
            document_id: new_uuid().to_string(),
            collection_id: collection_id.to_string(),
            owner: self.user_did.clone(),
            payload: payload.clone(),
            stored_at: current_timestamp_millis(),
        };
        let mut documents = self.load_documents()?;
        let id = record.document_id.clone();
        documents.push(record);
        self.save_documents(&documents)?;
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<DocumentRecord>, ClientError> {
        let documents = self.load_documents()?;
        if documents.is_empty() {
            return self.migrate_sibling_data();
        }
        Ok(documents)
    }

    async fn read(
        &self,
        document_id: &str,
        _collection_id: &str,
    ) -> Result<DocumentRecord, ClientError> {
        self.load_documents()?
            .into_iter()
            .find(|d| d.document_id == document_id)
            .ok_or_else(|| ClientError::NotFound("Document".into()))
    }

    async fn delete(&self, document_id: &str, collection_id: &str) -> Result<(), ClientError> {
        let mut documents = self.load_documents()?;
        let before = documents.len();
        documents.retain(|d| d.document_id != document_id);
        if documents.len() == before {
            return Err(ClientError::NotFound("Document".into()));
        }
        self.save_documents(&documents)?;
        self.ledger.tombstone_document(document_id, collection_id)?;
        Ok(())
    }

    async fn grant(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        permissions: &[Permission],
    ) -> Result<Grant, ClientError> {
        Ok(self.ledger.grant(
            document_id,
            collection_id,
            grantee_id,
            permissions,
            current_timestamp_millis(),
        )?)
    }

    async fn revoke(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        grant_id: Option<Uuid>,
    ) -> Result<(), ClientError> {
        self.ledger
            .revoke(document_id, collection_id, grantee_id, grant_id)?;
        Ok(())
    }

    async fn list_grants(&self) -> Result<Vec<Grant>, ClientError> {
        Ok(self.ledger.list()?)
    }
}
