// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use lms_server::config::Config;
use lms_server::db::Database;
use lms_server::models::{Role, User};
use lms_server::routes::create_router;
use lms_server::services::{Mailer, MediaStore, RazorpayClient};
use lms_server::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

#[allow(dead_code)]
pub const BOUNDARY: &str = "lmsTestBoundary7MA4YWxkTrZu0gW";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    Database::connect_firestore("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Build a test app around the given config and mailer.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config, mailer: Mailer) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        db: Database::in_memory(),
        razorpay: RazorpayClient::new_mock(config.razorpay.clone()),
        media: MediaStore::new_mock(config.cloudinary.clone()),
        mailer,
        config,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with in-memory store and mock providers.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(Config::test_default(), Mailer::capturing())
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Multipart body with text fields and an optional `(field, filename, bytes)` file.
#[allow(dead_code)]
pub fn multipart_request(
    method: &str,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}

#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Send a request and return status plus JSON body.
#[allow(dead_code)]
pub async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = send(app, request).await;
    let status = response.status();
    (status, body_json(response).await)
}

/// Value of the `token` cookie set on a response, if any.
#[allow(dead_code)]
pub fn session_cookie_value(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("token="))
        .map(|rest| rest.split(';').next().unwrap_or("").to_string())
}

/// Register a learner and return the session token.
#[allow(dead_code)]
pub async fn register(app: &Router, email: &str, password: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "fullName": "Test User", "email": email, "password": password }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    session_cookie_value(&response).expect("register sets session cookie")
}

/// Register a user and promote them to admin directly in the store.
#[allow(dead_code)]
pub async fn register_admin(app: &Router, state: &AppState, email: &str) -> String {
    let token = register(app, email, "adminpass").await;
    let mut user: User = state.db.find_user_by_email(email).await.unwrap().unwrap();
    user.role = Role::Admin;
    state.db.save_user(&user).await.unwrap();
    token
}
