//! End-to-end scenarios: web page → in-page shim → content relay → action
//! router → storage client → remote service (mocked in-process).

use anyhow::Result;
use serde_json::json;

#[path = "../common/mod.rs"]
mod common;
use common::server::MockServer;
use common::{broker_over, page_for};

const ORIGIN: &str = "https://app.example";

#[tokio::test]
async fn test_unlock_then_ping() -> Result<()> {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir()?;
    let router = broker_over(&dir, &server.base_url);
    let page = page_for(&router, ORIGIN);

    let unlocked = page.unlock("demo123").await?;
    assert_eq!(unlocked, json!({ "unlocked": true }));

    let pong = page.ping().await?;
    assert_eq!(pong["status"], "pong");
    assert!(pong["version"].as_str().is_some());
    assert!(pong["ts"].as_u64().is_some());
    Ok(())
}

#[tokio::test]
async fn test_bad_passphrase() -> Result<()> {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir()?;
    let router = broker_over(&dir, &server.base_url);
    let page = page_for(&router, ORIGIN);

    let err = page.unlock("wrong").await.unwrap_err();
    assert!(err.to_string().contains("Failed to unlock"));

    let state = page.is_unlocked().await?;
    assert_eq!(state, json!({ "unlocked": false }));
    Ok(())
}

#[tokio::test]
async fn test_store_grant_revoke_delete() -> Result<()> {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir()?;
    let router = broker_over(&dir, &server.base_url);
    let page = page_for(&router, ORIGIN);

    page.unlock("demo123").await?;

    // Store.
    let stored = page
        .store_data(json!({"title": "T", "content": "C", "type": "note"}), "col1")
        .await?;
    let document_id = stored["documentId"].as_str().unwrap().to_string();

    // Grant, and see it listed exactly once.
    let grant = page
        .grant_permission(&document_id, "col1", "did:nil:app", &["read", "write"])
        .await?;
    let grant_id = grant["grantId"].as_str().unwrap().to_string();

    let listed = page.list_permissions().await?;
    let grants = listed["permissions"].as_array().unwrap();
    let matching: Vec<_> = grants
        .iter()
        .filter(|g| g["grantId"] == grant_id.as_str())
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0]["documentId"], document_id.as_str());
    assert_eq!(matching[0]["collectionId"], "col1");
    assert_eq!(matching[0]["granteeId"], "did:nil:app");
    assert_eq!(matching[0]["permissions"], json!(["read", "write"]));

    // Revoke by the returned grant id.
    let revoked = page
        .revoke_permission(&document_id, "col1", "did:nil:app", Some(&grant_id))
        .await?;
    assert_eq!(revoked["revoked"], true);

    let listed = page.list_permissions().await?;
    assert!(listed["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .all(|g| g["grantId"] != grant_id.as_str()));

    // Delete.
    let deleted = page.delete_data(&document_id, "col1").await?;
    assert_eq!(deleted["deleted"], true);
    assert_eq!(server.document_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_store_read_round_trip() -> Result<()> {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir()?;
    let router = broker_over(&dir, &server.base_url);
    let page = page_for(&router, ORIGIN);

    page.unlock("demo123").await?;

    let payload = json!({"title": "T", "content": "C"});
    let stored = page.store_data(payload.clone(), "col1").await?;
    let document_id = stored["documentId"].as_str().unwrap();

    // Payload-equal up to server-added owner/timestamp fields.
    let record = page.retrieve_data(document_id, "col1").await?;
    assert_eq!(record["payload"], payload);
    assert_eq!(record["documentId"], stored["documentId"]);
    Ok(())
}

#[tokio::test]
async fn test_get_identity_reports_remote_did() -> Result<()> {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir()?;
    let router = broker_over(&dir, &server.base_url);
    let page = page_for(&router, ORIGIN);

    page.unlock("demo123").await?;
    let identity = page.get_identity().await?;
    assert_eq!(identity["did"], "did:nil:0remote0user0did");
    Ok(())
}

#[tokio::test]
async fn test_origin_not_allowed() -> Result<()> {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir()?;
    let router = broker_over(&dir, &server.base_url);
    let page = page_for(&router, "https://a.example");

    page.unlock("demo123").await?;
    let connected = page.connect(&["ping"]).await?;
    assert_eq!(connected["allowedActions"], json!(["ping"]));

    let err = page
        .store_data(json!({"v": 1}), "col1")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not allowed"));

    // ping is still fine.
    page.ping().await?;
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_ceiling_end_to_end() -> Result<()> {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir()?;
    let router = broker_over(&dir, &server.base_url);

    // Unlock from a separate origin so its budget does not count here.
    let admin = page_for(&router, "https://admin.example");
    admin.unlock("demo123").await?;

    // Fresh origin with the default 50-per-minute budget.
    let page = page_for(&router, "https://burst.example");
    for i in 0..50 {
        let pong = page.ping().await;
        assert!(pong.is_ok(), "ping {i} should be admitted");
    }
    let err = page.ping().await.unwrap_err();
    assert!(err.to_string().contains("Rate limit"));
    Ok(())
}

#[tokio::test]
async fn test_locked_session_rejects_data_actions() -> Result<()> {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir()?;
    let router = broker_over(&dir, &server.base_url);
    let page = page_for(&router, ORIGIN);

    let err = page.get_user_data().await.unwrap_err();
    assert!(err.to_string().contains("locked"));

    // After unlock the same call passes.
    page.unlock("demo123").await?;
    let data = page.get_user_data().await?;
    assert_eq!(data["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn test_empty_collection_rejected_end_to_end() -> Result<()> {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir()?;
    let router = broker_over(&dir, &server.base_url);
    let page = page_for(&router, ORIGIN);

    page.unlock("demo123").await?;
    let err = page.store_data(json!({"v": 1}), "").await.unwrap_err();
    assert!(err.to_string().contains("collectionId"));
    Ok(())
}

#[tokio::test]
async fn test_lock_then_everything_gated_again() -> Result<()> {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir()?;
    let router = broker_over(&dir, &server.base_url);
    let page = page_for(&router, ORIGIN);

    page.unlock("demo123").await?;
    page.ping().await?;

    let locked = page.lock().await?;
    assert_eq!(locked["locked"], true);

    let err = page.get_user_data().await.unwrap_err();
    assert!(err.to_string().contains("locked"));
    let state = page.is_unlocked().await?;
    assert_eq!(state["unlocked"], false);
    Ok(())
}
