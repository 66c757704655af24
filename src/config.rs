// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; handlers only ever see the
//! immutable [`Config`] stored in the application state.

use axum::http::Uri;
use std::env;

/// Minimum accepted length of the session signing key, in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Upper bounds on configured lifetimes; larger values overflow date math.
pub const MAX_JWT_TTL_DAYS: i64 = 365;
pub const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 24 * 60;

/// Which document store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store; for local development and tests.
    Memory,
}

/// Media host (Cloudinary) credentials.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Folder all uploads are placed in.
    pub folder: String,
}

/// Payment gateway (Razorpay) credentials.
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    /// Publishable key id, also handed to the frontend checkout.
    pub key_id: String,
    pub key_secret: String,
    pub plan_id: String,
    /// Number of billing cycles for a new subscription.
    pub total_count: u32,
}

/// Outbound SMTP settings. Absent when `SMTP_HOST` is not set.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend origin (CORS allow-list, reset links, cookie policy)
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// GCP project hosting Firestore
    pub gcp_project_id: String,
    pub store_backend: StoreBackend,

    /// Session token signing key (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Session lifetime in days
    pub jwt_ttl_days: i64,
    /// Password reset token lifetime in minutes
    pub reset_token_ttl_minutes: i64,

    pub cloudinary: CloudinaryConfig,
    pub razorpay: RazorpayConfig,
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 5004,
            gcp_project_id: "test-project".to_string(),
            store_backend: StoreBackend::Memory,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            jwt_ttl_days: 7,
            reset_token_ttl_minutes: 15,
            cloudinary: CloudinaryConfig {
                cloud_name: "test-cloud".to_string(),
                api_key: "test_cloudinary_key".to_string(),
                api_secret: "test_cloudinary_secret".to_string(),
                folder: "lms".to_string(),
            },
            razorpay: RazorpayConfig {
                key_id: "rzp_test_key".to_string(),
                key_secret: "test_razorpay_secret".to_string(),
                plan_id: "plan_test".to_string(),
                total_count: 12,
            },
            smtp: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = required("JWT_SECRET")?.into_bytes();
        if jwt_signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::Invalid(
                "JWT_SECRET",
                format!("must be at least {} bytes", MIN_SIGNING_KEY_LEN),
            ));
        }

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("firestore") | Err(_) => StoreBackend::Firestore,
            Ok(other) => {
                return Err(ConfigError::Invalid(
                    "STORE_BACKEND",
                    format!("unknown backend '{}'", other),
                ))
            }
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parsed_or("PORT", 5004)?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            store_backend,

            jwt_signing_key,
            jwt_ttl_days: parsed_in_range("JWT_TTL_DAYS", 7, 1..=MAX_JWT_TTL_DAYS)?,
            reset_token_ttl_minutes: parsed_in_range(
                "RESET_TOKEN_TTL_MINUTES",
                15,
                1..=MAX_RESET_TOKEN_TTL_MINUTES,
            )?,

            cloudinary: CloudinaryConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
                folder: env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "lms".to_string()),
            },
            razorpay: RazorpayConfig {
                key_id: required("RAZORPAY_KEY_ID")?,
                key_secret: required("RAZORPAY_SECRET")?,
                plan_id: required("RAZORPAY_PLAN_ID")?,
                total_count: parsed_or("RAZORPAY_TOTAL_COUNT", 12)?,
            },
            smtp: smtp_from_env()?,
        })
    }

    /// Whether the frontend is served from a local development origin.
    pub fn is_local_frontend(&self) -> bool {
        is_local_origin(&self.frontend_url)
    }

    /// Whether a request `Origin` may make credentialed cross-origin calls:
    /// exactly the configured frontend, or a local development origin.
    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        origin == self.frontend_url.trim_end_matches('/') || is_local_origin(origin)
    }
}

/// `http://localhost` or `http://127.0.0.1` on any port. The host must match
/// exactly, so `http://localhost.example.com` is not local.
pub fn is_local_origin(origin: &str) -> bool {
    let Ok(uri) = origin.parse::<Uri>() else {
        return false;
    };
    uri.scheme_str() == Some("http")
        && matches!(uri.host(), Some("localhost") | Some("127.0.0.1"))
        && matches!(uri.path(), "" | "/")
        && uri.query().is_none()
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn parsed_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, format!("cannot parse '{}'", raw))),
        Err(_) => Ok(default),
    }
}

/// Like [`parsed_or`], rejecting values outside `range`.
fn parsed_in_range(
    name: &'static str,
    default: i64,
    range: std::ops::RangeInclusive<i64>,
) -> Result<i64, ConfigError> {
    let value = parsed_or(name, default)?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid(
            name,
            format!(
                "{} is outside {}..={}",
                value,
                range.start(),
                range.end()
            ),
        ));
    }
    Ok(value)
}

fn smtp_from_env() -> Result<Option<SmtpConfig>, ConfigError> {
    let Ok(host) = env::var("SMTP_HOST") else {
        return Ok(None);
    };

    Ok(Some(SmtpConfig {
        host,
        port: parsed_or("SMTP_PORT", 587)?,
        from_address: env::var("SMTP_FROM").unwrap_or_else(|_| "noreply@lms.local".to_string()),
        username: env::var("SMTP_USER").ok(),
        password: env::var("SMTP_PASSWORD").ok(),
    }))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
