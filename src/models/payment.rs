//! Payment audit record.

use serde::{Deserialize, Serialize};

/// A verified gateway payment (`payments/{id}`). Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Document ID; the gateway's payment id
    pub id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    pub razorpay_subscription_id: String,
    pub created_at: String,
}
