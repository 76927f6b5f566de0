//! End-to-end pipeline tests against a real socket.

mod common;

use common::{client_for, start_programmable_backend, MockResponse};
use secure_client::http::FilePart;
use secure_client::{ApiRequestConfig, ErrorCode, Payload};
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn test_json_round_trip_with_security_headers() {
    let (addr, recorded) = start_programmable_backend(|_| async {
        MockResponse::json(201, r#"{"id":42,"title":"Rust"}"#)
    })
    .await;
    let client = client_for(addr);
    client.set_auth_token("tok-abc").unwrap();

    let response = client
        .post("/courses", json!({"title": "Rust<script>x()</script>"}))
        .await
        .unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.data, Payload::Json(json!({"id": 42, "title": "Rust"})));

    let requests = recorded.lock().unwrap();
    let sent = &requests[0];
    assert_eq!(sent.method, "POST");
    assert_eq!(sent.path, "/courses");
    assert_eq!(sent.headers["authorization"], "Bearer tok-abc");
    assert_eq!(sent.headers["x-requested-with"], "XMLHttpRequest");
    assert_eq!(sent.headers["x-csrf-token"].len(), 64);
    assert!(sent.headers.contains_key("x-request-id"));

    let body: Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(body, json!({"title": "Rust"}));
}

#[tokio::test]
async fn test_recovers_from_transient_failures() {
    let (addr, recorded) = start_programmable_backend(|i| async move {
        match i {
            0 => MockResponse::json(503, r#"{"detail":"warming up"}"#),
            1 => MockResponse::json(429, "{}").header("Retry-After", "0"),
            _ => MockResponse::json(200, "[]"),
        }
    })
    .await;
    let client = client_for(addr);

    let response = client.get("/lessons").await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(recorded.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_validation_error_surfaces_once() {
    let (addr, recorded) = start_programmable_backend(|_| async {
        MockResponse::json(
            422,
            r#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address"}]}"#,
        )
    })
    .await;
    let client = client_for(addr);

    let err = client.post("/auth/register", json!({"email": "nope"})).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.status, 422);
    assert_eq!(err.details.unwrap()[0]["loc"][1], "email");
    assert_eq!(recorded.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unauthorized_drops_token() {
    let (addr, recorded) = start_programmable_backend(|_| async {
        MockResponse::json(401, r#"{"detail":"Could not validate credentials"}"#)
    })
    .await;
    let client = client_for(addr);
    client.set_auth_token("expired").unwrap();
    client.set_user_data(&json!({"name": "Ada"})).unwrap();

    let err = client.get("/users/me").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthorized);
    assert_eq!(err.message, "Could not validate credentials");
    assert!(client.user_data().unwrap().is_none());

    client.get("/users/me").await.unwrap_err();
    let requests = recorded.lock().unwrap();
    assert!(requests[1].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_cached_get_skips_network() {
    let (addr, recorded) =
        start_programmable_backend(|_| async { MockResponse::json(200, r#"{"n":1}"#) }).await;
    let client = client_for(addr);

    let first = client.get_cached("/courses").await.unwrap();
    let second = client.get_cached("/courses").await.unwrap();
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(second.data, first.data);
    assert_eq!(recorded.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_is_multipart() {
    let (addr, recorded) =
        start_programmable_backend(|_| async { MockResponse::json(200, r#"{"ok":true}"#) }).await;
    let client = client_for(addr);

    let file = FilePart {
        file_name: "notes.md".into(),
        bytes: b"# Week 1".to_vec(),
        content_type: Some("text/markdown".into()),
    };
    client
        .upload_file("/files", file, vec![("course_id".into(), "7".into())])
        .await
        .unwrap();

    let requests = recorded.lock().unwrap();
    let content_type = &requests[0].headers["content-type"];
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\"; filename=\"notes.md\""));
    assert!(body.contains("name=\"course_id\""));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let (addr, _) = start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        MockResponse::json(200, "{}")
    })
    .await;
    let client = client_for(addr);

    let config = ApiRequestConfig::default().timeout(Duration::from_millis(200));
    let err = client.request("/slow", config).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Timeout);
    assert_eq!(err.status, 408);
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = client_for(addr);

    let err = client.get("/courses").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NetworkError);
    assert_eq!(err.status, 0);
}
