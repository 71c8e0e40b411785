//! The append/tombstone ledger over the fallback keyspace.

use pdm_crypto::new_uuid;
use pdm_store::SecretStore;
use uuid::Uuid;

use crate::errors::LedgerError;
use crate::grant::{normalize_permissions, Grant, Permission};

/// Authoritative grant record in Fallback mode, persisted as one JSON array
/// per user DID under `pdm_permissions_<did>`.
pub struct PermissionLedger {
    store: SecretStore,
    key: String,
}

impl PermissionLedger {
    pub fn new(store: SecretStore, user_did: &str) -> Self {
        Self {
            store,
            key: format!("pdm_permissions_{user_did}"),
        }
    }

    /// Append a fresh grant. Duplicates over the same tuple are permitted.
    pub fn grant(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        permissions: &[Permission],
        now_ms: u64,
    ) -> Result<Grant, LedgerError> {
        let permissions = normalize_permissions(permissions);
        if permissions.is_empty() {
            return Err(LedgerError::EmptyPermissions);
        }

        let grant = Grant {
            grant_id: new_uuid(),
            document_id: document_id.to_string(),
            collection_id: collection_id.to_string(),
            grantee_id: grantee_id.to_string(),
            permissions,
            granted_at: now_ms,
        };

        let mut grants = self.load()?;
        grants.push(grant.clone());
        self.save(&grants)?;
        tracing::debug!(grant_id = %grant.grant_id, grantee = grantee_id, "Grant appended");
        Ok(grant)
    }

    /// Revoke by `grant_id` (removes exactly one) or, absent an id, every
    /// grant matching the `(document, collection, grantee)` tuple.
    ///
    /// Returns how many entries were tombstoned.
    pub fn revoke(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        grant_id: Option<Uuid>,
    ) -> Result<usize, LedgerError> {
        let mut grants = self.load()?;
        let before = grants.len();

        match grant_id {
            Some(id) => {
                let position = grants
                    .iter()
                    .position(|g| g.grant_id == id)
                    .ok_or(LedgerError::NotFound)?;
                grants.remove(position);
            }
            None => {
                grants.retain(|g| !g.matches_tuple(document_id, collection_id, grantee_id));
                if grants.len() == before {
                    return Err(LedgerError::NotFound);
                }
            }
        }

        let removed = before - grants.len();
        self.save(&grants)?;
        tracing::debug!(removed, grantee = grantee_id, "Grants revoked");
        Ok(removed)
    }

    /// All live grants in insertion order.
    pub fn list(&self) -> Result<Vec<Grant>, LedgerError> {
        self.load()
    }

    /// Tombstone every grant over a deleted document. A document with no
    /// grants is not an error.
    pub fn tombstone_document(
        &self,
        document_id: &str,
        collection_id: &str,
    ) -> Result<usize, LedgerError> {
        let mut grants = self.load()?;
        let before = grants.len();
        grants.retain(|g| {
            !(g.document_id == document_id && g.collection_id == collection_id)
        });
        let removed = before - grants.len();
        if removed > 0 {
            self.save(&grants)?;
            tracing::debug!(removed, document_id, "Grants tombstoned with document");
        }
        Ok(removed)
    }

    fn load(&self) -> Result<Vec<Grant>, LedgerError> {
        Ok(self.store.get_persistent(&self.key)?.unwrap_or_default())
    }

    fn save(&self, grants: &[Grant]) -> Result<(), LedgerError> {
        self.store.put_persistent(&self.key, &grants)?;
        Ok(())
    }
}
