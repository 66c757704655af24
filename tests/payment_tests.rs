// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription checkout, verification and cancellation.

use axum::http::StatusCode;
use axum::Router;
use lms_server::models::SubscriptionStatus;
use lms_server::services::signature::sign_payment;
use lms_server::AppState;
use serde_json::{json, Value};

mod common;
use common::{call, create_test_app, get_request, json_request, register, register_admin};

const SECRET: &[u8] = b"test_razorpay_secret";

async fn subscribe(app: &Router, token: &str) -> (StatusCode, Value) {
    call(
        app,
        json_request("POST", "/api/payments/subscribe", Some(token), json!({})),
    )
    .await
}

async fn verify(app: &Router, token: &str, payment_id: &str, signature: &str) -> (StatusCode, Value) {
    call(
        app,
        json_request(
            "POST",
            "/api/payments/verify",
            Some(token),
            json!({
                "razorpay_payment_id": payment_id,
                "razorpay_signature": signature,
            }),
        ),
    )
    .await
}

async fn stored_status(state: &AppState, email: &str) -> SubscriptionStatus {
    let user = state.db.find_user_by_email(email).await.unwrap().unwrap();
    user.subscription.status
}

#[tokio::test]
async fn test_razorpay_key() {
    let (app, _) = create_test_app();
    let token = register(&app, "key@x.com", "secret1").await;

    let (status, body) = call(&app, get_request("/api/payments/razorpay-key", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "rzp_test_key");

    let (status, _) = call(&app, get_request("/api/payments/razorpay-key", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscribe_then_verify_activates() {
    let (app, state) = create_test_app();
    let token = register(&app, "buyer@x.com", "secret1").await;

    let (status, body) = subscribe(&app, &token).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let sub_id = body["subscription_id"].as_str().unwrap().to_string();
    assert!(sub_id.starts_with("sub_"));
    assert_eq!(stored_status(&state, "buyer@x.com").await, SubscriptionStatus::Created);

    let signature = sign_payment("pay_123", &sub_id, SECRET).unwrap();
    let (status, body) = verify(&app, &token, "pay_123", &signature).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Payment verified successfully");
    assert_eq!(stored_status(&state, "buyer@x.com").await, SubscriptionStatus::Active);

    let payments = state.db.payments_for_subscription(&sub_id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].razorpay_payment_id, "pay_123");

    // Active subscribers can now list the catalog.
    let (status, _) = call(&app, get_request("/api/courses", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_replayed_verify_records_payment_once() {
    let (app, state) = create_test_app();
    let token = register(&app, "replay@x.com", "secret1").await;
    let (_, body) = subscribe(&app, &token).await;
    let sub_id = body["subscription_id"].as_str().unwrap().to_string();
    let signature = sign_payment("pay_777", &sub_id, SECRET).unwrap();

    for _ in 0..2 {
        let (status, body) = verify(&app, &token, "pay_777", &signature).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    let payments = state.db.payments_for_subscription(&sub_id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].id, "pay_777");
    assert_eq!(stored_status(&state, "replay@x.com").await, SubscriptionStatus::Active);
}

#[tokio::test]
async fn test_verify_store_failure_leaves_subscription_pending() {
    let (app, state) = create_test_app();
    let token = register(&app, "flaky@x.com", "secret1").await;
    let (_, body) = subscribe(&app, &token).await;
    let sub_id = body["subscription_id"].as_str().unwrap().to_string();
    let signature = sign_payment("pay_888", &sub_id, SECRET).unwrap();

    state.db.set_fail_writes(true);
    let (status, _) = verify(&app, &token, "pay_888", &signature).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    state.db.set_fail_writes(false);

    assert_eq!(stored_status(&state, "flaky@x.com").await, SubscriptionStatus::Created);

    // The retry goes through and still records a single payment.
    let (status, _) = verify(&app, &token, "pay_888", &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.db.payments_for_subscription(&sub_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_verify_rejects_tampered_signature() {
    let (app, state) = create_test_app();
    let token = register(&app, "tamper@x.com", "secret1").await;
    let (_, body) = subscribe(&app, &token).await;
    let sub_id = body["subscription_id"].as_str().unwrap().to_string();

    let signature = sign_payment("pay_123", &sub_id, SECRET).unwrap();
    let mut tampered: Vec<char> = signature.chars().collect();
    tampered[10] = if tampered[10] == '0' { '1' } else { '0' };
    let tampered: String = tampered.into_iter().collect();

    let (status, body) = verify(&app, &token, "pay_123", &tampered).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // Case and whitespace variants of the exact digest are not the digest.
    let (status, _) = verify(&app, &token, "pay_123", &signature.to_uppercase()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = verify(&app, &token, "pay_123", &format!(" {} ", signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A valid signature for a different payment id does not transfer.
    let (status, _) = verify(&app, &token, "pay_456", &signature).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(stored_status(&state, "tamper@x.com").await, SubscriptionStatus::Created);
    assert!(state
        .db
        .payments_for_subscription(&sub_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_verify_checks_stored_subscription() {
    let (app, state) = create_test_app();
    let token = register(&app, "stored@x.com", "secret1").await;
    let (_, body) = subscribe(&app, &token).await;
    let sub_id = body["subscription_id"].as_str().unwrap().to_string();

    // Signed for someone else's subscription id, presented in the body.
    let foreign = sign_payment("pay_1", "sub_someone_else", SECRET).unwrap();
    let (status, _) = call(
        &app,
        json_request(
            "POST",
            "/api/payments/verify",
            Some(&token),
            json!({
                "razorpay_payment_id": "pay_1",
                "razorpay_signature": foreign,
                "razorpay_subscription_id": "sub_someone_else",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stored_status(&state, "stored@x.com").await, SubscriptionStatus::Created);

    let good = sign_payment("pay_1", &sub_id, SECRET).unwrap();
    let (status, _) = verify(&app, &token, "pay_1", &good).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_without_subscription_fails() {
    let (app, state) = create_test_app();
    let token = register(&app, "nosub@x.com", "secret1").await;

    let signature = sign_payment("pay_1", "sub_anything", SECRET).unwrap();
    let (status, _) = verify(&app, &token, "pay_1", &signature).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stored_status(&state, "nosub@x.com").await, SubscriptionStatus::None);

    let (status, body) = verify(&app, &token, "", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All fields are required!");
}

#[tokio::test]
async fn test_admin_cannot_subscribe() {
    let (app, state) = create_test_app();
    let admin = register_admin(&app, &state, "admin@x.com").await;

    let (status, body) = subscribe(&app, &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Admin has no need to purchase a subscription");

    let (status, _) = call(
        &app,
        json_request("POST", "/api/payments/unsubscribe", Some(&admin), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsubscribe_cancels() {
    let (app, state) = create_test_app();
    let token = register(&app, "quit@x.com", "secret1").await;

    let (status, _) = call(
        &app,
        json_request("POST", "/api/payments/unsubscribe", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = subscribe(&app, &token).await;
    let sub_id = body["subscription_id"].as_str().unwrap().to_string();
    let signature = sign_payment("pay_9", &sub_id, SECRET).unwrap();
    verify(&app, &token, "pay_9", &signature).await;

    let (status, body) = call(
        &app,
        json_request("POST", "/api/payments/unsubscribe", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(stored_status(&state, "quit@x.com").await, SubscriptionStatus::Cancelled);

    let (status, _) = call(&app, get_request("/api/courses", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_subscriptions_admin_only() {
    let (app, state) = create_test_app();
    let admin = register_admin(&app, &state, "admin@x.com").await;

    for n in 0..3 {
        let token = register(&app, &format!("u{}@x.com", n), "secret1").await;
        subscribe(&app, &token).await;
    }

    let learner = register(&app, "peek@x.com", "secret1").await;
    let (status, _) = call(&app, get_request("/api/payments", Some(&learner))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, get_request("/api/payments", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "All payments");
    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 3);

    let (status, body) = call(&app, get_request("/api/payments?count=2", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 2);
}
