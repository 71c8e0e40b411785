//! Document and identity records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document as both modes present it. The wire sometimes says
/// `dataId`/`data`; aliases keep the two shapes interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    #[serde(alias = "dataId", alias = "id")]
    pub document_id: String,
    #[serde(default)]
    pub collection_id: String,
    #[serde(default)]
    pub owner: String,
    #[serde(alias = "data")]
    pub payload: Value,
    #[serde(default)]
    pub stored_at: u64,
}

/// Plaintext identity record persisted so the fallback identity stays stable
/// across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub did: String,
    pub created_at: u64,
}
