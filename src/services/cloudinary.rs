// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloudinary media hosting client.
//!
//! Uploads use the signed upload API: every request parameter except the
//! file, `api_key` and `signature_algorithm` is sorted by name, joined as
//! `k=v&k=v`, suffixed with the API secret, and hashed with SHA-256.

use crate::config::CloudinaryConfig;
use crate::error::AppError;
use crate::models::{MediaKind, MediaRef};
use dashmap::DashMap;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

const API_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Square face-centered crop applied to avatars.
pub const AVATAR_TRANSFORMATION: &str = "c_fill,g_faces,h_250,w_250";

/// A file received from a client, ready to forward.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Records what the in-memory stand-in has seen.
#[derive(Default)]
struct MockMedia {
    next_id: AtomicU64,
    fail_uploads: AtomicBool,
    destroyed: DashMap<String, MediaKind>,
    /// public id -> transformation requested at upload
    transformations: DashMap<String, String>,
}

/// Media store client.
#[derive(Clone)]
pub struct MediaStore {
    /// None in mock mode
    http: Option<reqwest::Client>,
    mock: Arc<MockMedia>,
    config: CloudinaryConfig,
}

impl MediaStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            mock: Arc::new(MockMedia::default()),
            config,
        }
    }

    /// Store that keeps nothing and talks to no one (tests, local dev).
    pub fn new_mock(config: CloudinaryConfig) -> Self {
        Self {
            http: None,
            mock: Arc::new(MockMedia::default()),
            config,
        }
    }

    /// Upload a file into the configured folder.
    pub async fn upload(
        &self,
        file: Upload,
        kind: MediaKind,
        transformation: Option<&str>,
    ) -> Result<MediaRef, AppError> {
        let Some(http) = &self.http else {
            return self.mock_upload(kind, transformation);
        };

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let mut params = vec![
            ("folder", self.config.folder.clone()),
            ("timestamp", timestamp),
        ];
        if let Some(t) = transformation {
            params.push(("transformation", t.to_string()));
        }
        let signature = sign_params(&params, &self.config.api_secret);

        let mut part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(mime) = file.content_type {
            part = part
                .mime_str(&mime)
                .map_err(|e| AppError::Validation(format!("Invalid content type: {}", e)))?;
        }

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (name, value) in params {
            form = form.text(name, value);
        }

        let response = http
            .post(self.endpoint(kind, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("Media upload failed: {}", e)))?;

        let uploaded: UploadResponse = check_response_json(response).await?;
        tracing::info!(
            public_id = %uploaded.public_id,
            kind = kind.as_str(),
            "Media uploaded"
        );

        Ok(MediaRef {
            public_id: uploaded.public_id,
            secure_url: uploaded.secure_url,
        })
    }

    /// Delete an asset. Destroying an unknown asset is not an error.
    pub async fn destroy(&self, public_id: &str, kind: MediaKind) -> Result<(), AppError> {
        let Some(http) = &self.http else {
            self.mock.destroyed.insert(public_id.to_string(), kind);
            return Ok(());
        };

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = [
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
        ];
        let signature = sign_params(&params, &self.config.api_secret);

        let mut form: Vec<(&str, String)> = params.to_vec();
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        let response = http
            .post(self.endpoint(kind, "destroy"))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("Media destroy failed: {}", e)))?;

        let destroyed: DestroyResponse = check_response_json(response).await?;
        tracing::info!(public_id, result = %destroyed.result, "Media destroyed");
        Ok(())
    }

    /// Destroy an asset, logging instead of failing.
    pub async fn destroy_best_effort(&self, public_id: &str, kind: MediaKind) {
        if let Err(e) = self.destroy(public_id, kind).await {
            tracing::warn!(public_id, error = %e, "Failed to destroy media asset");
        }
    }

    /// Make subsequent mock uploads fail.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.mock.fail_uploads.store(fail, Ordering::Relaxed);
    }

    /// Whether the mock store has seen `public_id` destroyed.
    pub fn was_destroyed(&self, public_id: &str) -> bool {
        self.mock.destroyed.contains_key(public_id)
    }

    /// Transformation the mock store was asked to apply to `public_id`.
    pub fn transformation_for(&self, public_id: &str) -> Option<String> {
        self.mock
            .transformations
            .get(public_id)
            .map(|t| t.value().clone())
    }

    fn mock_upload(
        &self,
        kind: MediaKind,
        transformation: Option<&str>,
    ) -> Result<MediaRef, AppError> {
        if self.mock.fail_uploads.load(Ordering::Relaxed) {
            return Err(AppError::Unavailable("Media upload failed".to_string()));
        }
        let n = self.mock.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let public_id = format!("{}/mock_{}", self.config.folder, n);
        if let Some(t) = transformation {
            self.mock
                .transformations
                .insert(public_id.clone(), t.to_string());
        }
        Ok(MediaRef {
            secure_url: format!(
                "https://res.cloudinary.com/{}/{}/upload/{}",
                self.config.cloud_name,
                kind.as_str(),
                public_id
            ),
            public_id,
        })
    }

    fn endpoint(&self, kind: MediaKind, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            API_BASE_URL,
            self.config.cloud_name,
            kind.as_str(),
            action
        )
    }
}

/// Signature over request parameters, as the upload API expects.
fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{}{}", to_sign, api_secret).as_bytes()))
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, body = %body, "Media API request failed");
        return Err(AppError::Unavailable(format!(
            "Media API error: HTTP {}",
            status
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Unavailable(format!("Media API JSON parse error: {}", e)))
}
