//! Wire envelopes on the window bus.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the host reports a page loaded from the local file scheme. Only for
/// this sentinel are the origin checks relaxed and the wildcard target used.
pub const FILE_ORIGIN_SENTINEL: &str = "null";

/// Wildcard post target, used only for the file-scheme case.
pub const WILDCARD_TARGET: &str = "*";

/// A request envelope from the page: `{type, id, action, data, origin, ts}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    pub id: String,
    pub action: String,
    #[serde(default)]
    pub data: Value,
    pub origin: String,
    pub ts: u64,
}

/// A response envelope to the page: `{type, id, data? | error?, ts}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub ts: u64,
}

/// Everything that travels over the window bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageMessage {
    #[serde(rename = "REQUEST")]
    Request(PageRequest),
    #[serde(rename = "RESPONSE")]
    Response(PageResponse),
    /// Visible in-page notice, e.g. after a host restart.
    #[serde(rename = "NOTICE")]
    Notice { text: String },
}
