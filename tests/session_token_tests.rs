// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token tests.
//!
//! These tests verify that tokens issued at login are accepted by the auth
//! middleware until they expire, and that anything else is rejected.

use axum::http::StatusCode;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lms_server::config::Config;
use lms_server::services::tokens::{issue_session_token, verify_session_token, Claims};
use serde_json::json;

mod common;
use common::{call, create_test_app, get_request, json_request, register};

#[test]
fn test_issued_token_decodes_with_hs256() {
    let key = Config::test_default().jwt_signing_key;
    let token = issue_session_token("user-1", &key, chrono::Duration::days(7)).unwrap();

    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(&key),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap();

    assert_eq!(data.claims.sub, "user-1");
    assert_eq!(data.claims.exp - data.claims.iat, 7 * 24 * 60 * 60);
}

#[test]
fn test_expired_token_rejected_without_leeway() {
    let key = Config::test_default().jwt_signing_key;
    let now = chrono::Utc::now().timestamp() as usize;

    // Expired two seconds ago: inside jsonwebtoken's default leeway.
    let claims = Claims {
        sub: "user-1".to_string(),
        iat: now - 100,
        exp: now - 2,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&key),
    )
    .unwrap();

    assert!(verify_session_token(&token, &key).is_err());
}

#[test]
fn test_other_algorithms_rejected() {
    let key = Config::test_default().jwt_signing_key;
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: "user-1".to_string(),
        iat: now,
        exp: now + 3600,
    };
    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(&key),
    )
    .unwrap();

    assert!(verify_session_token(&token, &key).is_err());
}

#[tokio::test]
async fn test_login_token_accepted_by_middleware() {
    let (app, _) = create_test_app();
    register(&app, "jwt@x.com", "secret1").await;

    let response = common::send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "jwt@x.com", "password": "secret1" }),
        ),
    )
    .await;
    let token = common::session_cookie_value(&response).unwrap();

    let (status, _) = call(&app, get_request("/api/auth/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_expired_token_rejected_by_middleware() {
    let (app, state) = create_test_app();
    register(&app, "old@x.com", "secret1").await;
    let user = state.db.find_user_by_email("old@x.com").await.unwrap().unwrap();

    let token = issue_session_token(
        &user.id,
        &state.config.jwt_signing_key,
        chrono::Duration::seconds(-1),
    )
    .unwrap();

    let (status, body) = call(&app, get_request("/api/auth/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_token_for_deleted_user_rejected() {
    let (app, state) = create_test_app();

    let token = issue_session_token(
        "no-such-user",
        &state.config.jwt_signing_key,
        chrono::Duration::days(1),
    )
    .unwrap();

    let (status, _) = call(&app, get_request("/api/auth/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let (app, state) = create_test_app();
    register(&app, "forge@x.com", "secret1").await;
    let user = state.db.find_user_by_email("forge@x.com").await.unwrap().unwrap();

    let token = issue_session_token(
        &user.id,
        b"a_completely_different_key_32_bytes!",
        chrono::Duration::days(1),
    )
    .unwrap();

    let (status, _) = call(&app, get_request("/api/auth/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
