//! In-process mock of the remote storage service.
//!
//! Mirrors the wire contract: every endpoint answers `{success, data?,
//! error?}`; documents and grants live in one shared state the tests can
//! inspect and fault-inject.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Default)]
pub struct MockState {
    pub documents: Vec<Value>,
    pub grants: Vec<Value>,
    /// Fault injection: make `/api/data/store` answer 500.
    pub fail_store: bool,
    pub request_count: u64,
}

type Shared = Arc<Mutex<MockState>>;

pub struct MockServer {
    pub base_url: String,
    pub state: Shared,
}

impl MockServer {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));

        let app = Router::new()
            .route("/health", get(health))
            .route("/api/user/did", post(user_did))
            .route("/api/data/store", post(store_data))
            .route("/api/data/list", get(list_data))
            .route("/api/data/:id", get(read_data).delete(delete_data))
            .route("/api/permissions/grant", post(grant_permission))
            .route("/api/permissions/revoke", post(revoke_permission))
            .route("/api/permissions/list", post(list_permissions))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, state }
    }

    pub fn fail_store(&self, fail: bool) {
        self.state.lock().unwrap().fail_store = fail;
    }

    pub fn document_count(&self) -> usize {
        self.state.lock().unwrap().documents.len()
    }
}

const USER_DID: &str = "did:nil:0remote0user0did";

fn ok(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

fn fail(error: &str) -> Json<Value> {
    Json(json!({ "success": false, "error": error }))
}

async fn health(State(state): State<Shared>) -> Json<Value> {
    state.lock().unwrap().request_count += 1;
    ok(json!({ "status": "ok" }))
}

async fn user_did(State(state): State<Shared>) -> Json<Value> {
    state.lock().unwrap().request_count += 1;
    ok(json!({ "did": USER_DID }))
}

async fn store_data(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut state = state.lock().unwrap();
    state.request_count += 1;
    if state.fail_store {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            fail("storage backend unavailable"),
        ));
    }

    let document_id = Uuid::new_v4().to_string();
    state.documents.push(json!({
        "documentId": document_id,
        "collectionId": body["collectionId"],
        "owner": USER_DID,
        "payload": body["data"],
        "storedAt": 1,
    }));
    Ok(ok(json!({ "dataId": document_id })))
}

async fn list_data(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.request_count += 1;
    ok(json!({ "data": state.documents.clone() }))
}

async fn read_data(
    State(state): State<Shared>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut state = state.lock().unwrap();
    state.request_count += 1;
    state
        .documents
        .iter()
        .find(|d| d["documentId"] == id.as_str())
        .map(|d| ok(d.clone()))
        .ok_or((StatusCode::NOT_FOUND, fail("Document not found")))
}

async fn delete_data(
    State(state): State<Shared>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut state = state.lock().unwrap();
    state.request_count += 1;
    let before = state.documents.len();
    state.documents.retain(|d| d["documentId"] != id.as_str());
    if state.documents.len() == before {
        return Err((StatusCode::NOT_FOUND, fail("Document not found")));
    }
    state.grants.retain(|g| g["documentId"] != id.as_str());
    Ok(ok(json!({ "deleted": true })))
}

async fn grant_permission(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.request_count += 1;
    let grant = json!({
        "grantId": Uuid::new_v4().to_string(),
        "documentId": body["dataId"],
        "collectionId": body["collectionId"],
        "granteeId": body["appDid"],
        "permissions": body["permissions"],
        "grantedAt": 1,
    });
    state.grants.push(grant.clone());
    ok(grant)
}

async fn revoke_permission(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut state = state.lock().unwrap();
    state.request_count += 1;
    let before = state.grants.len();
    if let Some(id) = body.get("permissionId").and_then(Value::as_str) {
        state.grants.retain(|g| g["grantId"] != id);
    } else {
        state.grants.retain(|g| {
            !(g["documentId"] == body["dataId"]
                && g["collectionId"] == body["collectionId"]
                && g["granteeId"] == body["appDid"])
        });
    }
    if state.grants.len() == before {
        return Err((StatusCode::NOT_FOUND, fail("Grant not found")));
    }
    Ok(ok(json!({ "revoked": true })))
}

async fn list_permissions(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.request_count += 1;
    ok(json!({ "permissions": state.grants.clone() }))
}
