//! Typed actions and the wire envelopes.
//!
//! The wire carries `{correlationId, action, payload, origin}`; parsing
//! turns that into a tagged [`Action`] whose arms carry typed payloads, so
//! dispatch is a total match. Payload field names are the wire's camelCase,
//! with aliases where callers historically used a second spelling.

use pdm_ledger::Permission;
use pdm_policy::RateLimitConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::BrokerError;

/// Every action the router understands.
pub const KNOWN_ACTIONS: &[&str] = &[
    "ping",
    "connect",
    "disconnect",
    "unlock",
    "lock",
    "is_unlocked",
    "get_identity",
    "store_data",
    "retrieve_data",
    "delete_data",
    "get_user_data",
    "grant_permission",
    "revoke_permission",
    "list_permissions",
];

/// An externally initiated request, as the relay delivers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterRequest {
    #[serde(alias = "id")]
    pub correlation_id: String,
    pub action: String,
    #[serde(default)]
    pub payload: Value,
    pub origin: String,
}

/// The uniform outcome envelope: `{correlationId, data? | error?, ts}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub ts: u64,
}

impl ResponseEnvelope {
    pub fn ok(correlation_id: String, data: Value, ts: u64) -> Self {
        Self {
            correlation_id,
            data: Some(data),
            error: None,
            ts,
        }
    }

    pub fn err(correlation_id: String, error: String, ts: u64) -> Self {
        Self {
            correlation_id,
            data: None,
            error: Some(error),
            ts,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectPayload {
    #[serde(default)]
    pub requested_actions: Vec<String>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockPayload {
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetadata {
    #[serde(default)]
    pub collection_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDataPayload {
    pub data: Value,
    #[serde(default)]
    pub metadata: StoreMetadata,
}

/// Identifies one document; retrieve and delete share this shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    #[serde(alias = "dataId")]
    pub document_id: String,
    #[serde(default)]
    pub collection_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionPayload {
    #[serde(alias = "documentId")]
    pub data_id: String,
    #[serde(default)]
    pub collection_id: String,
    pub app_did: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokePermissionPayload {
    #[serde(alias = "documentId")]
    pub data_id: String,
    #[serde(default)]
    pub collection_id: String,
    pub app_did: String,
    /// Preferred revocation target; absent means revoke the whole tuple.
    #[serde(default, alias = "grantId")]
    pub permission_id: Option<Uuid>,
}

/// Tagged request variant. The router is total over this enum.
#[derive(Debug, Clone)]
pub enum Action {
    Ping,
    Connect(ConnectPayload),
    Disconnect,
    Unlock(UnlockPayload),
    Lock,
    IsUnlocked,
    GetIdentity,
    StoreData(StoreDataPayload),
    RetrieveData(DocumentRef),
    DeleteData(DocumentRef),
    GetUserData,
    GrantPermission(GrantPermissionPayload),
    RevokePermission(RevokePermissionPayload),
    ListPermissions,
}

impl Action {
    /// Parse an action name and its payload into a typed variant.
    pub fn parse(name: &str, payload: Value) -> Result<Self, BrokerError> {
        fn typed<T: serde::de::DeserializeOwned>(
            name: &str,
            payload: Value,
        ) -> Result<T, BrokerError> {
            serde_json::from_value(payload).map_err(|e| {
                BrokerError::InvalidArgument(format!("Invalid payload for '{name}': {e}"))
            })
        }

        match name {
            "ping" => Ok(Action::Ping),
            "connect" => Ok(Action::Connect(typed(name, payload)?)),
            "disconnect" => Ok(Action::Disconnect),
            "unlock" => Ok(Action::Unlock(typed(name, payload)?)),
            "lock" => Ok(Action::Lock),
            "is_unlocked" => Ok(Action::IsUnlocked),
            "get_identity" => Ok(Action::GetIdentity),
            "store_data" => Ok(Action::StoreData(typed(name, payload)?)),
            "retrieve_data" => Ok(Action::RetrieveData(typed(name, payload)?)),
            "delete_data" => Ok(Action::DeleteData(typed(name, payload)?)),
            "get_user_data" => Ok(Action::GetUserData),
            "grant_permission" => Ok(Action::GrantPermission(typed(name, payload)?)),
            "revoke_permission" => Ok(Action::RevokePermission(typed(name, payload)?)),
            "list_permissions" => Ok(Action::ListPermissions),
            other => Err(BrokerError::InvalidArgument(format!(
                "Unknown action: {other}"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Ping => "ping",
            Action::Connect(_) => "connect",
            Action::Disconnect => "disconnect",
            Action::Unlock(_) => "unlock",
            Action::Lock => "lock",
            Action::IsUnlocked => "is_unlocked",
            Action::GetIdentity => "get_identity",
            Action::StoreData(_) => "store_data",
            Action::RetrieveData(_) => "retrieve_data",
            Action::DeleteData(_) => "delete_data",
            Action::GetUserData => "get_user_data",
            Action::GrantPermission(_) => "grant_permission",
            Action::RevokePermission(_) => "revoke_permission",
            Action::ListPermissions => "list_permissions",
        }
    }

    /// Unlock, lock, and is-unlocked are the only actions that may run
    /// against a locked session.
    pub fn bypasses_lock_gate(&self) -> bool {
        matches!(self, Action::Unlock(_) | Action::Lock | Action::IsUnlocked)
    }
}
