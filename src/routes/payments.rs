// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription payment routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_roles, AuthUser, ADMIN_ONLY};
use crate::models::{Payment, SubscriptionStatus, User};
use crate::routes::extract::{JsonBody, QueryParams};
use crate::routes::MessageResponse;
use crate::services::GatewaySubscription;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_LIST_COUNT: u32 = 10;
const MAX_LIST_COUNT: u32 = 100;

/// Payment routes (require authentication via session).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/payments/razorpay-key", get(get_razorpay_key))
        .route("/api/payments/subscribe", post(subscribe))
        .route("/api/payments/verify", post(verify_subscription))
        .route("/api/payments/unsubscribe", post(unsubscribe))
        .route(
            "/api/payments",
            get(list_subscriptions)
                .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, require_roles)),
        )
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct KeyResponse {
    pub success: bool,
    pub message: String,
    pub key: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
    pub subscription_id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubscriptionsResponse {
    pub success: bool,
    pub message: String,
    pub subscriptions: Vec<GatewaySubscription>,
}

/// Publishable key for the frontend checkout.
async fn get_razorpay_key(State(state): State<Arc<AppState>>) -> Json<KeyResponse> {
    Json(KeyResponse {
        success: true,
        message: "Razorpay API key".to_string(),
        key: state.razorpay.key_id().to_string(),
    })
}

/// Load the caller's record for a subscription change; admins never subscribe.
async fn load_subscriber(state: &AppState, auth: &AuthUser) -> Result<User> {
    let user = state
        .db
        .get_user(&auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User doesn't exist!".to_string()))?;

    if user.is_admin() {
        return Err(AppError::Forbidden(
            "Admin has no need to purchase a subscription".to_string(),
        ));
    }
    Ok(user)
}

async fn subscribe(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SubscribeResponse>> {
    let mut user = load_subscriber(&state, &auth).await?;

    let subscription = state.razorpay.create_subscription().await?;

    user.subscription.id = Some(subscription.id.clone());
    user.subscription.status = subscription.status;
    user.updated_at = now_rfc3339();
    state.db.save_user(&user).await?;

    tracing::info!(
        user_id = %user.id,
        subscription_id = %subscription.id,
        "Subscription started"
    );
    Ok(Json(SubscribeResponse {
        success: true,
        message: "Subscribed successfully".to_string(),
        subscription_id: subscription.id,
    }))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub razorpay_payment_id: String,
    #[serde(default)]
    pub razorpay_signature: String,
    /// Informational; the signature is checked against the stored subscription.
    #[serde(default, alias = "razorpaysubscription_id")]
    pub razorpay_subscription_id: Option<String>,
}

/// Verify a checkout callback and activate the subscription.
async fn verify_subscription(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<VerifyRequest>,
) -> Result<Json<MessageResponse>> {
    if req.razorpay_payment_id.is_empty() || req.razorpay_signature.is_empty() {
        return Err(AppError::Validation("All fields are required!".to_string()));
    }

    let mut user = state
        .db
        .get_user(&auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User doesn't exist!".to_string()))?;

    let subscription_id = user.subscription.id.clone().ok_or_else(|| {
        tracing::warn!(user_id = %user.id, "Verify without a stored subscription");
        AppError::SignatureMismatch
    })?;

    if let Some(presented) = &req.razorpay_subscription_id {
        if presented != &subscription_id {
            tracing::warn!(
                user_id = %user.id,
                presented = %presented,
                stored = %subscription_id,
                "Callback subscription id differs from stored"
            );
        }
    }

    state.razorpay.verify_payment_signature(
        &req.razorpay_payment_id,
        &subscription_id,
        &req.razorpay_signature,
    )?;

    // Keyed by the gateway's payment id, so a replayed callback cannot
    // record the same payment twice.
    let payment = Payment {
        id: req.razorpay_payment_id.clone(),
        razorpay_payment_id: req.razorpay_payment_id,
        razorpay_signature: req.razorpay_signature,
        razorpay_subscription_id: subscription_id,
        created_at: now_rfc3339(),
    };
    match state.db.insert_payment(&payment).await {
        Ok(()) => {}
        Err(AppError::Conflict(_)) => {
            tracing::info!(
                user_id = %user.id,
                payment_id = %payment.razorpay_payment_id,
                "Payment already recorded; re-applying activation"
            );
        }
        Err(e) => return Err(e),
    }

    user.subscription.status = SubscriptionStatus::Active;
    user.updated_at = now_rfc3339();
    state.db.save_user(&user).await?;

    tracing::info!(
        user_id = %user.id,
        payment_id = %payment.razorpay_payment_id,
        "Payment verified"
    );
    Ok(MessageResponse::new("Payment verified successfully"))
}

async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MessageResponse>> {
    let mut user = load_subscriber(&state, &auth).await?;

    let subscription_id = user
        .subscription
        .id
        .clone()
        .ok_or_else(|| AppError::Validation("No active subscription to cancel".to_string()))?;

    let subscription = state.razorpay.cancel_subscription(&subscription_id).await?;

    user.subscription.status = subscription.status;
    user.updated_at = now_rfc3339();
    state.db.save_user(&user).await?;

    tracing::info!(
        user_id = %user.id,
        subscription_id = %subscription_id,
        status = ?subscription.status,
        "Subscription cancelled"
    );
    Ok(MessageResponse::new("Subscription cancelled successfully"))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub count: Option<u32>,
}

/// All gateway subscriptions (admin).
async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<SubscriptionsResponse>> {
    let count = query
        .count
        .unwrap_or(DEFAULT_LIST_COUNT)
        .clamp(1, MAX_LIST_COUNT);

    let subscriptions = state.razorpay.list_subscriptions(count).await?;

    Ok(Json(SubscriptionsResponse {
        success: true,
        message: "All payments".to_string(),
        subscriptions,
    }))
}
