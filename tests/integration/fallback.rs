//! Fallback-mode transitions and short-restart session restore.

use pdm_client::ClientMode;
use pdm_crypto::current_timestamp_millis;
use pdm_store::SecretStore;
use serde_json::json;

#[path = "../common/mod.rs"]
mod common;
use common::server::MockServer;
use common::{broker_with_store, page_for};

const ORIGIN: &str = "https://app.example";

#[tokio::test]
async fn test_online_to_fallback_transition() {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let store = SecretStore::open(dir.path()).unwrap();
    let router = broker_with_store(store.clone(), &server.base_url);
    let page = page_for(&router, ORIGIN);

    // The identity lookup succeeds, so the client starts Online.
    page.unlock("demo123").await.unwrap();
    assert_eq!(
        router.context().client.mode().await,
        Some(ClientMode::Online)
    );

    // First store hits a broken remote; the call still succeeds, served by
    // local persistence after the sticky transition.
    server.fail_store(true);
    let stored = page
        .store_data(json!({"title": "T"}), "col1")
        .await
        .unwrap();
    let document_id = stored["documentId"].as_str().unwrap().to_string();
    assert_eq!(
        router.context().client.mode().await,
        Some(ClientMode::Fallback)
    );

    // The record is visible through the same contract.
    let data = page.get_user_data().await.unwrap();
    let records = data["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["documentId"], document_id.as_str());

    // The process-level fallback flag is now persisted.
    let flag: Option<bool> = store.get_persistent("pdm_demo_mode").unwrap();
    assert_eq!(flag, Some(true));

    // And nothing on this process talks to the remote any more.
    let requests_before = server.state.lock().unwrap().request_count;
    page.get_user_data().await.unwrap();
    page.list_permissions().await.unwrap();
    let requests_after = server.state.lock().unwrap().request_count;
    assert_eq!(requests_before, requests_after);
}

#[tokio::test]
async fn test_persisted_flag_starts_next_process_in_fallback() {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let store = SecretStore::open(dir.path()).unwrap();

    // First process: fall back and store a document.
    {
        let router = broker_with_store(store.clone(), &server.base_url);
        let page = page_for(&router, ORIGIN);
        page.unlock("demo123").await.unwrap();
        server.fail_store(true);
        page.store_data(json!({"v": 1}), "col1").await.unwrap();
    }

    // Second process over the same persistent state: the remote is healthy
    // again, but the flag keeps the client in fallback, and its data is
    // still there.
    server.fail_store(false);
    let requests_before = server.state.lock().unwrap().request_count;

    let router = broker_with_store(store, &server.base_url);
    let page = page_for(&router, ORIGIN);
    page.unlock("demo123").await.unwrap();
    assert_eq!(
        router.context().client.mode().await,
        Some(ClientMode::Fallback)
    );

    let data = page.get_user_data().await.unwrap();
    assert_eq!(data["data"].as_array().unwrap().len(), 1);

    let requests_after = server.state.lock().unwrap().request_count;
    assert_eq!(requests_before, requests_after);
}

#[tokio::test]
async fn test_fallback_grants_survive_restart() {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let store = SecretStore::open(dir.path()).unwrap();

    let grant_id = {
        let router = broker_with_store(store.clone(), &server.base_url);
        let page = page_for(&router, ORIGIN);
        page.unlock("demo123").await.unwrap();
        server.fail_store(true);
        let stored = page.store_data(json!({"v": 1}), "col1").await.unwrap();
        let id = stored["documentId"].as_str().unwrap().to_string();
        let grant = page
            .grant_permission(&id, "col1", "did:nil:app", &["read"])
            .await
            .unwrap();
        grant["grantId"].as_str().unwrap().to_string()
    };

    let router = broker_with_store(store, &server.base_url);
    let page = page_for(&router, ORIGIN);
    page.unlock("demo123").await.unwrap();

    let listed = page.list_permissions().await.unwrap();
    let grants = listed["permissions"].as_array().unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0]["grantId"], grant_id.as_str());
}

#[tokio::test]
async fn test_short_restart_restores_session() {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let store = SecretStore::open(dir.path()).unwrap();

    {
        let router = broker_with_store(store.clone(), &server.base_url);
        let page = page_for(&router, ORIGIN);
        page.unlock("demo123").await.unwrap();
    }

    // Same store handle = the ephemeral restore token survived the
    // "restart"; the rebuilt context resumes without re-unlock.
    let router = broker_with_store(store, &server.base_url);
    let restored = router
        .context()
        .restore_session(current_timestamp_millis())
        .await
        .unwrap();
    assert!(restored);

    let page = page_for(&router, ORIGIN);
    let state = page.is_unlocked().await.unwrap();
    assert_eq!(state["unlocked"], true);
    page.get_user_data().await.unwrap();
}

#[tokio::test]
async fn test_full_process_exit_forgets_session() {
    let server = MockServer::spawn().await;
    let dir = tempfile::tempdir().unwrap();

    {
        let store = SecretStore::open(dir.path()).unwrap();
        let router = broker_with_store(store, &server.base_url);
        let page = page_for(&router, ORIGIN);
        page.unlock("demo123").await.unwrap();
    }

    // A fresh store over the same directory has no ephemeral token.
    let store = SecretStore::open(dir.path()).unwrap();
    let router = broker_with_store(store, &server.base_url);
    let restored = router
        .context()
        .restore_session(current_timestamp_millis())
        .await
        .unwrap();
    assert!(!restored);

    let page = page_for(&router, ORIGIN);
    let state = page.is_unlocked().await.unwrap();
    assert_eq!(state["unlocked"], false);
}
