// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment callback signatures.
//!
//! The gateway signs `"{payment_id}|{subscription_id}"` with HMAC-SHA256
//! under the account secret and hex-encodes the digest.

use crate::error::AppError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 the gateway attaches to a subscription payment.
///
/// The signed payload is `"{payment_id}|{subscription_id}"`.
pub fn sign_payment(
    payment_id: &str,
    subscription_id: &str,
    secret: &[u8],
) -> Result<String, AppError> {
    payment_mac(payment_id, subscription_id, secret).map(hex::encode)
}

fn payment_mac(
    payment_id: &str,
    subscription_id: &str,
    secret: &[u8],
) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payment_id.as_bytes());
    mac.update(b"|");
    mac.update(subscription_id.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time check of a presented payment signature.
///
/// Only the exact lowercase hex digest is accepted: no trimming, no case
/// folding.
pub fn verify_payment_signature(
    payment_id: &str,
    subscription_id: &str,
    signature: &str,
    secret: &[u8],
) -> Result<(), AppError> {
    let expected = sign_payment(payment_id, subscription_id, secret)?;

    if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        Ok(())
    } else {
        tracing::warn!(
            payment_id,
            subscription_id,
            "Payment signature mismatch"
        );
        Err(AppError::SignatureMismatch)
    }
}
