//! Grant records and the permission set.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One capability a grantee may hold on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Execute,
}

/// A capability grant.
///
/// `(document_id, collection_id, grantee_id)` is deliberately not unique:
/// several simultaneous grants over the same tuple may exist, told apart
/// only by `grant_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    #[serde(alias = "permissionId", alias = "id")]
    pub grant_id: Uuid,
    #[serde(alias = "dataId")]
    pub document_id: String,
    pub collection_id: String,
    #[serde(alias = "appDid")]
    pub grantee_id: String,
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub granted_at: u64,
}

impl Grant {
    /// Whether this grant covers `(document_id, collection_id, grantee_id)`.
    pub fn matches_tuple(&self, document_id: &str, collection_id: &str, grantee_id: &str) -> bool {
        self.document_id == document_id
            && self.collection_id == collection_id
            && self.grantee_id == grantee_id
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Normalize a requested permission set: preserve first-seen order, drop
/// duplicates. An empty result is the caller's error to surface.
pub(crate) fn normalize_permissions(permissions: &[Permission]) -> Vec<Permission> {
    let mut seen = Vec::with_capacity(permissions.len());
    for p in permissions {
        if !seen.contains(p) {
            seen.push(*p);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_value([Permission::Read, Permission::Execute]).unwrap(),
            serde_json::json!(["read", "execute"])
        );
        let parsed: Vec<Permission> =
            serde_json::from_value(serde_json::json!(["write"])).unwrap();
        assert_eq!(parsed, vec![Permission::Write]);
    }

    #[test]
    fn test_grant_accepts_wire_aliases() {
        let grant: Grant = serde_json::from_value(serde_json::json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "dataId": "doc-1",
            "collectionId": "col1",
            "appDid": "did:nil:app",
            "permissions": ["read", "write"]
        }))
        .unwrap();
        assert_eq!(grant.document_id, "doc-1");
        assert_eq!(grant.grantee_id, "did:nil:app");
        assert!(grant.allows(Permission::Read));
        assert!(!grant.allows(Permission::Execute));
    }

    #[test]
    fn test_normalize_dedupes_preserving_order() {
        let normalized = normalize_permissions(&[
            Permission::Write,
            Permission::Read,
            Permission::Write,
        ]);
        assert_eq!(normalized, vec![Permission::Write, Permission::Read]);
    }

    #[test]
    fn test_matches_tuple() {
        let grant = Grant {
            grant_id: uuid::Uuid::new_v4(),
            document_id: "doc-1".into(),
            collection_id: "col1".into(),
            grantee_id: "did:nil:app".into(),
            permissions: vec![Permission::Read],
            granted_at: 0,
        };
        assert!(grant.matches_tuple("doc-1", "col1", "did:nil:app"));
        assert!(!grant.matches_tuple("doc-1", "col2", "did:nil:app"));
    }
}
