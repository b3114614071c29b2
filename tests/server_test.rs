mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::{completion_body, llm_config, local_memory, test_config, MEM0_KEY};
use httpmock::prelude::*;
use memchat::chat::ChatOrchestrator;
use memchat::llm::ChatClient;
use memchat::memory::local::LocalStore;
use memchat::memory::{BackendKind, MemoryStore};
use memchat::server::{router, AppState};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

fn app_state(memory: MemoryStore, llm_url: &str) -> AppState {
    let llm = ChatClient::new(&llm_config(llm_url)).unwrap();
    let orchestrator = ChatOrchestrator::new(Arc::new(memory), Arc::new(llm));
    AppState::new(orchestrator, "default_user")
}

fn test_app(dir: &Path, llm_url: &str) -> Router {
    router(Arc::new(app_state(local_memory(dir), llm_url)))
}

async fn new_session(app: &Router) -> String {
    let (status, session) = send(app, "POST", "/api/session", None).await;
    assert_eq!(status, StatusCode::OK);
    session["session_id"].as_str().unwrap().to_string()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn index_serves_the_chat_page() {
    let tmp = TempDir::new().unwrap();
    let app = test_app(tmp.path(), "http://unused");

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Chatbot with Persistent Memory"));
    assert!(html.contains("Test connection"));
    assert!(html.contains("Connection test failed"));
    assert!(html.contains("sendButton.disabled = true"));
}

#[tokio::test]
async fn session_chat_and_history_flow() {
    let server = MockServer::start();
    let _completion = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(completion_body("Hello Alex!"));
    });

    let tmp = TempDir::new().unwrap();
    let app = test_app(tmp.path(), &server.base_url());

    let (status, session) = send(&app, "POST", "/api/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user_id"], "default_user");
    assert_eq!(session["backend"], "local");
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let (status, chat) = send(
        &app,
        "POST",
        "/api/chat",
        Some(json!({"session_id": session_id, "user_id": "alex", "message": "Hi, I'm Alex"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chat["reply"], "Hello Alex!");
    assert_eq!(chat["messages"].as_array().unwrap().len(), 2);

    let (status, history) = send(
        &app,
        "GET",
        &format!("/api/history?session_id={session_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        history["messages"],
        json!([
            {"role": "user", "content": "Hi, I'm Alex"},
            {"role": "assistant", "content": "Hello Alex!"}
        ])
    );

    // The exchange was remembered under the sidebar user id.
    let stored = local_memory(tmp.path()).list("alex").await.unwrap();
    assert_eq!(stored, vec!["user: Hi, I'm Alex", "assistant: Hello Alex!"]);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let app = test_app(tmp.path(), "http://unused");

    let (status, body) = send(
        &app,
        "POST",
        "/api/chat",
        Some(json!({"session_id": "0190d5b4-7c1e-7000-8000-000000000000", "message": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "session_not_found");
}

#[tokio::test]
async fn empty_message_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let app = test_app(tmp.path(), "http://unused");
    let (_, session) = send(&app, "POST", "/api/session", None).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/chat",
        Some(json!({"session_id": session["session_id"], "message": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn model_failure_is_bad_gateway_and_keeps_history() {
    let server = MockServer::start();
    let _completion = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(500).body("upstream down");
    });

    let tmp = TempDir::new().unwrap();
    let app = test_app(tmp.path(), &server.base_url());
    let (_, session) = send(&app, "POST", "/api/session", None).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/chat",
        Some(json!({"session_id": session_id, "message": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "upstream_error");

    let (_, history) = send(
        &app,
        "GET",
        &format!("/api/history?session_id={session_id}"),
        None,
    )
    .await;
    assert_eq!(history["messages"], json!([]));
}

#[tokio::test]
async fn clear_memory_defaults_to_configured_user_and_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let memory = local_memory(tmp.path());
    memory.add("default_user", "likes hiking").await.unwrap();
    memory.add("alex", "likes chess").await.unwrap();

    let app = test_app(tmp.path(), "http://unused");

    let (status, body) = send(&app, "POST", "/api/memory/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"user_id": "default_user", "backend": "local", "cleared": true}));

    let (status, _) = send(&app, "POST", "/api/memory/clear", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    assert!(memory.list("default_user").await.unwrap().is_empty());
    assert_eq!(memory.list("alex").await.unwrap(), vec!["likes chess"]);
}

#[tokio::test]
async fn status_reports_both_checks() {
    let server = MockServer::start();
    let models = server.mock(|when, then| {
        when.method(GET)
            .path("/models")
            .header("authorization", "Bearer gsk-test");
        then.status(200).json_body(json!({"object": "list", "data": []}));
    });

    let tmp = TempDir::new().unwrap();
    let app = test_app(tmp.path(), &server.base_url());

    let (status, report) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["backend"], "local");
    assert_eq!(report["memory"]["ok"], true);
    assert_eq!(report["llm"]["ok"], true);
    models.assert_calls(1);
}

#[tokio::test]
async fn status_reports_llm_failure_detail() {
    let server = MockServer::start();
    let _models = server.mock(|when, then| {
        when.method(GET).path("/models");
        then.status(401).json_body(json!({"error": {"message": "Invalid API Key"}}));
    });

    let tmp = TempDir::new().unwrap();
    let app = test_app(tmp.path(), &server.base_url());

    let (status, report) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["llm"]["ok"], false);
    assert!(report["llm"]["detail"].as_str().unwrap().contains("401"));
}

#[tokio::test]
async fn overlapping_turns_on_one_session_keep_both_exchanges() {
    let server = MockServer::start();
    // Slow replies keep the first turn in flight while the second arrives.
    let completion = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .delay(Duration::from_millis(300))
            .json_body(completion_body("reply"));
    });

    let tmp = TempDir::new().unwrap();
    let app = test_app(tmp.path(), &server.base_url());
    let session_id = new_session(&app).await;

    let ((first, _), (second, _)) = tokio::join!(
        send(
            &app,
            "POST",
            "/api/chat",
            Some(json!({"session_id": session_id, "message": "first"}))
        ),
        send(
            &app,
            "POST",
            "/api/chat",
            Some(json!({"session_id": session_id, "message": "second"}))
        )
    );
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);

    let (_, history) = send(
        &app,
        "GET",
        &format!("/api/history?session_id={session_id}"),
        None,
    )
    .await;
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    let users: Vec<&str> = messages
        .iter()
        .filter(|m| m["role"] == "user")
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert!(users.contains(&"first"));
    assert!(users.contains(&"second"));

    let stored = local_memory(tmp.path()).list("default_user").await.unwrap();
    assert_eq!(stored.len(), 4);
    completion.assert_calls(2);
}

#[tokio::test]
async fn idle_sessions_are_dropped_when_a_new_one_starts() {
    let tmp = TempDir::new().unwrap();
    let state = app_state(local_memory(tmp.path()), "http://unused").with_session_ttl(Duration::ZERO);
    let state = Arc::new(state);
    let app = router(Arc::clone(&state));

    let stale = new_session(&app).await;
    assert_eq!(state.session_count(), 1);

    let fresh = new_session(&app).await;
    assert_eq!(state.session_count(), 1);

    let (status, body) = send(&app, "GET", &format!("/api/history?session_id={stale}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "session_not_found");

    let (status, _) = send(&app, "GET", &format!("/api/history?session_id={fresh}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn active_sessions_survive_new_session_creation() {
    let tmp = TempDir::new().unwrap();
    let state = Arc::new(app_state(local_memory(tmp.path()), "http://unused"));
    let app = router(Arc::clone(&state));

    let first = new_session(&app).await;
    let _second = new_session(&app).await;
    assert_eq!(state.session_count(), 2);

    let (status, _) = send(&app, "GET", &format!("/api/history?session_id={first}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_chat_body_is_json_bad_request() {
    let tmp = TempDir::new().unwrap();
    let app = test_app(tmp.path(), "http://unused");

    let (status, body) = send(&app, "POST", "/api/chat", Some(json!({"message": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("session_id"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/chat",
        Some(json!({"session_id": "not-a-uuid", "message": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn malformed_history_query_is_json_bad_request() {
    let tmp = TempDir::new().unwrap();
    let app = test_app(tmp.path(), "http://unused");

    let (status, body) = send(&app, "GET", "/api/history?session_id=nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (status, body) = send(&app, "GET", "/api/history", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn status_reports_unreadable_local_store() {
    let server = MockServer::start();
    let _models = server.mock(|when, then| {
        when.method(GET).path("/models");
        then.status(200).json_body(json!({"object": "list", "data": []}));
    });

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("memories.json");
    std::fs::write(&path, "{ truncated").unwrap();
    let memory = MemoryStore::local(LocalStore::new(&path), 3);
    let app = router(Arc::new(app_state(memory, &server.base_url())));

    let (status, report) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["backend"], "local");
    assert_eq!(report["memory"]["ok"], false);
    assert!(!report["memory"]["detail"].as_str().unwrap().is_empty());
    assert_eq!(report["llm"]["ok"], true);
}

#[tokio::test]
async fn status_reports_cloud_ping_failure_without_switching_backend() {
    let server = MockServer::start();
    let mut ping = server.mock(|when, then| {
        when.method(GET).path("/v1/ping/");
        then.status(200).json_body(json!({"status": "ok"}));
    });
    let _models = server.mock(|when, then| {
        when.method(GET).path("/models");
        then.status(200).json_body(json!({"object": "list", "data": []}));
    });

    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), &server.base_url(), Some(MEM0_KEY), &server.base_url());
    let memory = MemoryStore::connect(&config).await;
    assert_eq!(memory.backend(), BackendKind::Cloud);
    let app = router(Arc::new(app_state(memory, &server.base_url())));

    let (_, report) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(report["backend"], "cloud");
    assert_eq!(report["memory"]["ok"], true);
    ping.assert_calls(2);

    ping.delete();
    let _down = server.mock(|when, then| {
        when.method(GET).path("/v1/ping/");
        then.status(503).body("service unavailable");
    });

    let (status, report) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["backend"], "cloud");
    assert_eq!(report["memory"]["ok"], false);
    assert!(report["memory"]["detail"].as_str().unwrap().contains("503"));
}
