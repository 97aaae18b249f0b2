//! Shared helpers for HTTP-level integration tests.
//!
//! `build_test_app` mirrors the router construction in `app.rs` so the
//! tests exercise the same middleware stack (CORS, request ID, timeout,
//! panic recovery) as production.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use sqlx::PgPool;
use tower::ServiceExt;

use flightdeck_api::app;
use flightdeck_api::auth::jwt::JwtConfig;
use flightdeck_api::config::ServerConfig;
use flightdeck_api::state::AppState;
use flightdeck_core::packet::schema::{FieldSpec, PacketSchema, SchemaSet};
use flightdeck_core::packet::{END_FRAME, START_FRAME};
use flightdeck_events::JobEventHub;

/// Build a test `ServerConfig` rooted in a throwaway data directory.
pub fn test_config(data_root: std::path::PathBuf) -> ServerConfig {
    let demo_file = data_root.join("serial_data.txt");
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        schema_file: data_root.join("packet_schema.json"),
        data_root,
        demo_file,
        embedded_worker: false,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Schema set used by the test captures: one packet type with a
/// three-byte `alt` field and a one-byte `mode` field.
pub fn test_schema() -> SchemaSet {
    SchemaSet::from_schemas(vec![PacketSchema {
        id: 0x10,
        num_bytes: 4,
        length: 10,
        fields: vec![
            FieldSpec {
                name: "alt".into(),
                size: 3,
                bits: Vec::new(),
            },
            FieldSpec {
                name: "mode".into(),
                size: 1,
                bits: Vec::new(),
            },
        ],
        all_fields: Vec::new(),
    }])
    .expect("test schema must be valid")
}

/// Frame a payload with the start byte, id, length, additive checksum,
/// and end byte.
pub fn build_frame(id: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![START_FRAME, id, payload.len() as u8];
    frame.extend_from_slice(payload);
    let sum: u32 = frame[2..]
        .iter()
        .fold(0u32, |acc, b| (acc + *b as u32) % 65536);
    frame.push((sum >> 8) as u8);
    frame.push((sum & 0xFF) as u8);
    frame.push(END_FRAME);
    frame
}

/// Two valid frames, hex-encoded one per line (the demo capture format).
pub fn demo_capture_hex() -> String {
    let frames = [
        build_frame(0x10, &[0x00, 0x00, 0x01, 0x07]),
        build_frame(0x10, &[0x00, 0x00, 0x02, 0x03]),
    ];
    frames
        .iter()
        .map(|f| {
            f.iter()
                .map(|b| format!("{b:02X}"))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the shared application state over a throwaway data directory.
///
/// The directory is intentionally leaked so files outlive the returned
/// state for the duration of the test process.
pub fn build_test_state(pool: PgPool) -> AppState {
    let data_root = tempfile::tempdir()
        .expect("tempdir should be creatable")
        .into_path();
    std::fs::write(data_root.join("serial_data.txt"), demo_capture_hex())
        .expect("demo capture should be writable");

    AppState {
        pool,
        config: Arc::new(test_config(data_root)),
        schema: Arc::new(test_schema()),
        hub: Arc::new(JobEventHub::default()),
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(pool: PgPool) -> Router {
    app::build_app(build_test_state(pool))
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Read the response body and decode it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}

/// Read the response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    use http_body_util::BodyExt;
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}

// ---------------------------------------------------------------------------
// Auth helpers
// ---------------------------------------------------------------------------

/// Register a user through the API and log them in, returning the
/// access token.
pub async fn register_and_login(app: &Router, username: &str) -> String {
    let password = "test_password_123";
    let body = serde_json::json!({ "username": username, "password": password });
    let response = post_json(app.clone(), "/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = serde_json::json!({ "username": username, "password": password });
    let response = post_json(app.clone(), "/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["access_token"]
        .as_str()
        .expect("login must return access_token")
        .to_string()
}
