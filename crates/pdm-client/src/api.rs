//! The remote wire contract: JSON-over-HTTP via the network adapter.
//!
//! Every endpoint answers `{success, data?, error?}`. A `success: false`
//! body and a non-2xx status are both upstream failures; a 404 on a
//! document path is mapped to `NotFound` instead (an application result,
//! not an unhealthy remote).

use pdm_ledger::{Grant, Permission};
use pdm_net::{Method, NetworkAdapter};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::ClientError;
use crate::records::DocumentRecord;

#[derive(Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

pub(crate) struct RemoteApi {
    adapter: NetworkAdapter,
    signing_key: String,
}

impl RemoteApi {
    pub fn new(adapter: NetworkAdapter, signing_key: String) -> Self {
        Self {
            adapter,
            signing_key,
        }
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        Ok(self.adapter.call("/health", Method::Get, None).await?)
    }

    pub async fn user_did(&self) -> Result<String, ClientError> {
        let data = self
            .request(
                "/api/user/did",
                Method::Post,
                Some(json!({ "userPrivateKey": self.signing_key })),
            )
            .await?;
        field_str(&data, "did")
    }

    pub async fn store(&self, collection_id: &str, data: &Value) -> Result<String, ClientError> {
        let body = json!({
            "userPrivateKey": self.signing_key,
            "collectionId": collection_id,
            "data": data,
        });
        let data = self.request("/api/data/store", Method::Post, Some(body)).await?;
        field_str(&data, "dataId")
    }

    pub async fn list(&self) -> Result<Vec<DocumentRecord>, ClientError> {
        let endpoint = format!("/api/data/list?userKey={}", self.signing_key);
        let data = self.request(&endpoint, Method::Get, None).await?;
        let records = data.get("data").cloned().unwrap_or(data);
        serde_json::from_value(records).map_err(|e| ClientError::BadResponse(e.to_string()))
    }

    pub async fn read(
        &self,
        document_id: &str,
        collection_id: &str,
    ) -> Result<DocumentRecord, ClientError> {
        let endpoint = format!(
            "/api/data/{document_id}?userKey={}&collection={collection_id}",
            self.signing_key
        );
        let data = self
            .request(&endpoint, Method::Get, None)
            .await
            .map_err(not_found_on_404("Document"))?;
        serde_json::from_value(data).map_err(|e| ClientError::BadResponse(e.to_string()))
    }

    pub async fn delete(&self, document_id: &str, collection_id: &str) -> Result<(), ClientError> {
        let endpoint = format!(
            "/api/data/{document_id}?userKey={}&collection={collection_id}",
            self.signing_key
        );
        self.request(&endpoint, Method::Delete, None)
            .await
            .map_err(not_found_on_404("Document"))?;
        Ok(())
    }

    pub async fn grant(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        permissions: &[Permission],
    ) -> Result<Grant, ClientError> {
        let body = json!({
            "userPrivateKey": self.signing_key,
            "dataId": document_id,
            "collectionId": collection_id,
            "appDid": grantee_id,
            "permissions": permissions,
        });
        let data = self
            .request("/api/permissions/grant", Method::Post, Some(body))
            .await?;
        serde_json::from_value(data).map_err(|e| ClientError::BadResponse(e.to_string()))
    }

    // The wire revokes by tuple; a grant id narrows the match server-side
    // when the service understands it.
    pub async fn revoke(
        &self,
        document_id: &str,
        collection_id: &str,
        grantee_id: &str,
        grant_id: Option<uuid::Uuid>,
    ) -> Result<(), ClientError> {
        let mut body = json!({
            "userPrivateKey": self.signing_key,
            "dataId": document_id,
            "collectionId": collection_id,
            "appDid": grantee_id,
        });
        if let Some(id) = grant_id {
            body["permissionId"] = json!(id);
        }
        self.request("/api/permissions/revoke", Method::Post, Some(body))
            .await
            .map_err(not_found_on_404("Grant"))?;
        Ok(())
    }

    pub async fn list_grants(&self) -> Result<Vec<Grant>, ClientError> {
        let body = json!({ "userPrivateKey": self.signing_key });
        let data = self
            .request("/api/permissions/list", Method::Post, Some(body))
            .await?;
        let grants = data.get("permissions").cloned().unwrap_or(data);
        serde_json::from_value(grants).map_err(|e| ClientError::BadResponse(e.to_string()))
    }

    async fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let value = self.adapter.call(endpoint, method, body).await?;
        let envelope: ApiEnvelope = serde_json::from_value(value)
            .map_err(|e| ClientError::BadResponse(e.to_string()))?;
        if envelope.success {
            Ok(envelope.data.unwrap_or(Value::Null))
        } else {
            Err(ClientError::Upstream {
                status: 200,
                message: envelope
                    .error
                    .unwrap_or_else(|| "remote reported failure".into()),
            })
        }
    }
}

fn field_str(data: &Value, field: &str) -> Result<String, ClientError> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::BadResponse(format!("missing '{field}' field")))
}

fn not_found_on_404(what: &'static str) -> impl Fn(ClientError) -> ClientError {
    move |err| match err {
        ClientError::Upstream { status: 404, .. } => ClientError::NotFound(what.into()),
        other => other,
    }
}
