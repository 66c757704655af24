// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Razorpay subscription API client and payment signature checks.
//!
//! Handles:
//! - Subscription creation for the configured plan
//! - Subscription cancellation
//! - Listing subscriptions (admin reporting)
//! - Verifying checkout callbacks with the account secret

use crate::config::RazorpayConfig;
use crate::error::AppError;
use crate::models::SubscriptionStatus;
use crate::services::signature::verify_payment_signature;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_BASE_URL: &str = "https://api.razorpay.com/v1";

/// Subscription as returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GatewaySubscription {
    pub id: String,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub total_count: Option<u32>,
    #[serde(default)]
    pub paid_count: Option<u32>,
    #[serde(default)]
    pub short_url: Option<String>,
    /// Unix timestamp
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Deserialize)]
struct Collection<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    error: GatewayErrorDetail,
}

#[derive(Deserialize)]
struct GatewayErrorDetail {
    #[serde(default)]
    description: Option<String>,
}

/// In-process stand-in for the gateway, used when no HTTP client is configured.
#[derive(Default)]
struct MockGateway {
    next_id: AtomicU64,
    subscriptions: DashMap<String, GatewaySubscription>,
}

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    /// None in mock mode
    http: Option<reqwest::Client>,
    mock: Arc<MockGateway>,
    base_url: String,
    config: RazorpayConfig,
}

impl RazorpayClient {
    /// Create a client that talks to the real gateway.
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            mock: Arc::new(MockGateway::default()),
            base_url: DEFAULT_BASE_URL.to_string(),
            config,
        }
    }

    /// Create a client that fakes the gateway in memory (tests, local dev).
    pub fn new_mock(config: RazorpayConfig) -> Self {
        Self {
            http: None,
            mock: Arc::new(MockGateway::default()),
            base_url: DEFAULT_BASE_URL.to_string(),
            config,
        }
    }

    /// Publishable key handed to the frontend checkout.
    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    /// Create a subscription for the configured plan.
    pub async fn create_subscription(&self) -> Result<GatewaySubscription, AppError> {
        let Some(http) = &self.http else {
            let n = self.mock.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            let subscription = GatewaySubscription {
                id: format!("sub_mock_{:010}", n),
                status: SubscriptionStatus::Created,
                plan_id: Some(self.config.plan_id.clone()),
                customer_id: None,
                total_count: Some(self.config.total_count),
                paid_count: Some(0),
                short_url: None,
                created_at: Some(chrono::Utc::now().timestamp()),
            };
            self.mock
                .subscriptions
                .insert(subscription.id.clone(), subscription.clone());
            return Ok(subscription);
        };

        let body = serde_json::json!({
            "plan_id": self.config.plan_id,
            "total_count": self.config.total_count,
            "customer_notify": 1,
        });

        let response = http
            .post(format!("{}/subscriptions", self.base_url))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("Payment gateway unreachable: {}", e)))?;

        let subscription: GatewaySubscription = check_response_json(response).await?;
        tracing::info!(
            subscription_id = %subscription.id,
            status = ?subscription.status,
            "Gateway subscription created"
        );
        Ok(subscription)
    }

    /// Cancel a subscription immediately.
    pub async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, AppError> {
        let Some(http) = &self.http else {
            let mut entry = self.mock.subscriptions.get_mut(subscription_id).ok_or_else(|| {
                AppError::Unavailable(format!("Subscription {} not found", subscription_id))
            })?;
            entry.status = SubscriptionStatus::Cancelled;
            return Ok(entry.clone());
        };

        let response = http
            .post(format!(
                "{}/subscriptions/{}/cancel",
                self.base_url, subscription_id
            ))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&serde_json::json!({ "cancel_at_cycle_end": 0 }))
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("Payment gateway unreachable: {}", e)))?;

        check_response_json(response).await
    }

    /// List subscriptions, newest first, at most `count` of them.
    pub async fn list_subscriptions(
        &self,
        count: u32,
    ) -> Result<Vec<GatewaySubscription>, AppError> {
        let Some(http) = &self.http else {
            let mut all: Vec<GatewaySubscription> =
                self.mock.subscriptions.iter().map(|s| s.clone()).collect();
            all.sort_by(|a, b| b.id.cmp(&a.id));
            all.truncate(count as usize);
            return Ok(all);
        };

        let response = http
            .get(format!("{}/subscriptions", self.base_url))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .query(&[("count", count.to_string())])
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("Payment gateway unreachable: {}", e)))?;

        let collection: Collection<GatewaySubscription> = check_response_json(response).await?;
        Ok(collection.items)
    }

    /// Verify a checkout callback against the stored subscription ID.
    pub fn verify_payment_signature(
        &self,
        payment_id: &str,
        subscription_id: &str,
        signature: &str,
    ) -> Result<(), AppError> {
        verify_payment_signature(
            payment_id,
            subscription_id,
            signature,
            self.config.key_secret.as_bytes(),
        )
    }
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let description = serde_json::from_str::<GatewayErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.description)
            .unwrap_or(body);

        tracing::warn!(%status, description = %description, "Payment gateway request failed");
        return Err(AppError::Unavailable(format!(
            "Payment gateway error: {}",
            description
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Unavailable(format!("Payment gateway JSON parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_gateway_lifecycle() {
        let client = RazorpayClient::new_mock(crate::config::Config::test_default().razorpay);

        let sub = client.create_subscription().await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Created);
        assert_eq!(sub.plan_id.as_deref(), Some("plan_test"));

        let cancelled = client.cancel_subscription(&sub.id).await.unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);

        client.create_subscription().await.unwrap();
        assert_eq!(client.list_subscriptions(10).await.unwrap().len(), 2);
        assert_eq!(client.list_subscriptions(1).await.unwrap().len(), 1);
    }

    #[test]
    fn test_parse_gateway_subscription() {
        let json = r#"{
            "id": "sub_00000000000001",
            "entity": "subscription",
            "plan_id": "plan_00000000000001",
            "status": "created",
            "total_count": 12,
            "paid_count": 0,
            "short_url": "https://rzp.io/i/z3b1R61A9",
            "created_at": 1580453311
        }"#;
        let sub: GatewaySubscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Created);
        assert_eq!(sub.total_count, Some(12));
    }
}
