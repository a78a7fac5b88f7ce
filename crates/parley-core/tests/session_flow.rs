//! Session bootstrap behavior against a mock backend.


use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::{SESSION_ID, USER_ID, mount_chat_send, mount_session_create, store_for};
use parley_core::error::EngineErrorKind;

#[tokio::test]
async fn test_ensure_session_is_idempotent() {
    fixtures::init_tracing();
    let server = MockServer::start().await;
    // Exactly one creation request for two ensure_session calls.
    mount_session_create(&server, 1).await;

    let mut store = store_for(&server);
    store.ensure_session().await.unwrap();
    store.ensure_session().await.unwrap();

    let ids = store.session_ids().expect("session established");
    assert_eq!(ids.session_id, SESSION_ID);
    assert_eq!(ids.user_id, USER_ID);
}

#[tokio::test]
async fn test_creation_failure_propagates_and_keeps_store_unsendable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/session/create"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    // No session means a later send must not reach the turn endpoint.
    mount_chat_send(&server, "/api/stream/none/none", 0).await;

    let mut store = store_for(&server);
    let err = store.ensure_session().await.unwrap_err();
    assert_eq!(err.kind, EngineErrorKind::SessionCreation);
    assert!(store.session_ids().is_none());

    store.send("hello?").await.unwrap();
    assert!(store.messages().is_empty());
}

#[tokio::test]
async fn test_creation_retry_after_failure_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/session/create"))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_session_create(&server, 1).await;

    let mut store = store_for(&server);
    assert!(store.ensure_session().await.is_err());
    // No automatic retry happened; the caller retries explicitly.
    store.ensure_session().await.unwrap();
    assert!(store.session_ids().is_some());
}

#[tokio::test]
async fn test_malformed_session_response_is_creation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/session/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let mut store = store_for(&server);
    let err = store.ensure_session().await.unwrap_err();
    assert_eq!(err.kind, EngineErrorKind::SessionCreation);
}
