// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and password-reset tokens.
//!
//! Session tokens are HS256 JWTs carrying the user ID. Reset tokens are
//! random values sent to the user out-of-band; only their SHA-256 digest
//! is ever persisted.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Random bytes in a reset token.
const RESET_TOKEN_BYTES: usize = 20;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user document ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Create a session token valid for `ttl`.
pub fn issue_session_token(
    user_id: &str,
    signing_key: &[u8],
    ttl: Duration,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let exp = now + ttl.num_seconds();

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.max(0) as usize,
        exp: exp.max(0) as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
}

/// Verify a session token and return the user ID it was issued for.
///
/// Fails with `InvalidToken` on a bad signature, malformed token, or an
/// elapsed expiry (no leeway).
pub fn verify_session_token(token: &str, signing_key: &[u8]) -> Result<String, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let token_data =
        decode::<Claims>(token, &key, &validation).map_err(|_| AppError::InvalidToken)?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::InvalidToken);
    }

    Ok(token_data.claims.sub)
}

/// A freshly generated password reset token.
#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Sent to the user; never stored.
    pub raw: String,
    /// Persisted on the user record.
    pub hash: String,
}

/// Generate a reset token from the system CSPRNG.
pub fn issue_reset_token() -> Result<ResetToken, AppError> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;

    let raw = hex::encode(bytes);
    let hash = hash_reset_token(&raw);
    Ok(ResetToken { raw, hash })
}

/// One-way hash under which a reset token is stored and looked up.
pub fn hash_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Whether a stored reset expiry (RFC 3339) is still in the future.
///
/// Unparseable values count as expired.
pub fn reset_token_is_live(expiry: Option<&str>, now: DateTime<Utc>) -> bool {
    expiry
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .is_some_and(|exp| exp.with_timezone(&Utc) > now)
}
