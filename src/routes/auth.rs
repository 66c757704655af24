// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: registration, sessions, profile and password recovery.

use crate::db::new_document_id;
use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, SESSION_COOKIE};
use crate::models::{
    MediaKind, MediaRef, Role, Subscription, User, UserResponse, DEFAULT_AVATAR_URL,
};
use crate::routes::extract::{JsonBody, JsonOrMultipart, MultipartBody};
use crate::routes::form::{FormData, UPLOAD_BODY_LIMIT};
use crate::routes::MessageResponse;
use crate::services::cloudinary::AVATAR_TRANSFORMATION;
use crate::services::mailer::reset_password_email;
use crate::services::password::{hash_password, validate_password_strength, verify_password};
use crate::services::tokens::{
    hash_reset_token, issue_reset_token, issue_session_token, reset_token_is_live,
};
use crate::time_utils::{format_utc_rfc3339, now_rfc3339};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Routes reachable without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/auth/register",
            post(register).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset/{reset_token}", post(reset_password))
}

/// Routes that need a session. The auth middleware is applied in routes/mod.rs.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/profile", get(profile))
        .route("/api/auth/change-password", post(change_password))
        .route(
            "/api/auth/update",
            put(update_profile).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}

/// Response carrying the caller's account.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
}

impl AuthResponse {
    fn new(message: &str, user: User) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            user: user.into(),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Session cookie carrying `token`.
fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(!state.config.is_local_frontend())
        .max_age(time::Duration::days(state.config.jwt_ttl_days))
        .build()
}

fn start_session(state: &AppState, jar: CookieJar, user_id: &str) -> Result<CookieJar> {
    let token = issue_session_token(
        user_id,
        &state.config.jwt_signing_key,
        chrono::Duration::days(state.config.jwt_ttl_days),
    )?;
    Ok(jar.add(session_cookie(state, token)))
}

// ─── Registration & Login ────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(max = 50, message = "Name should be at most 50 characters"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    fn from_form(form: &FormData) -> Self {
        Self {
            full_name: form.raw("fullName"),
            email: form.raw("email"),
            password: form.raw("password"),
        }
    }
}

/// Create an account and start a session.
///
/// Accepts JSON, or multipart with the same fields plus an optional
/// `avatar` image.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: JsonOrMultipart<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let (mut req, avatar_file) = match body {
        JsonOrMultipart::Json(req) => (req, None),
        JsonOrMultipart::Multipart(multipart) => {
            let mut form = FormData::read(multipart, "avatar").await?;
            (RegisterRequest::from_form(&form), form.take_file())
        }
    };
    req.full_name = req.full_name.trim().to_string();
    req.email = normalize_email(&req.email);

    if req.full_name.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("All fields are required!".to_string()));
    }
    req.validate()?;
    validate_password_strength(&req.password)?;

    let uploaded = match avatar_file {
        Some(file) => Some(
            state
                .media
                .upload(file, MediaKind::Image, Some(AVATAR_TRANSFORMATION))
                .await?,
        ),
        None => None,
    };
    let avatar = uploaded.clone().unwrap_or_else(|| MediaRef {
        public_id: req.email.clone(),
        secure_url: DEFAULT_AVATAR_URL.to_string(),
    });

    let now = now_rfc3339();
    let user = User {
        id: new_document_id()?,
        full_name: req.full_name,
        avatar,
        email: req.email,
        password: hash_password(&req.password)?,
        role: Role::Learner,
        subscription: Subscription::default(),
        forgot_password_token: None,
        forgot_password_expiry: None,
        created_at: now.clone(),
        updated_at: now,
    };

    if let Err(e) = state.db.create_user(&user).await {
        if let Some(media) = &uploaded {
            state
                .media
                .destroy_best_effort(&media.public_id, MediaKind::Image)
                .await;
        }
        return Err(match e {
            AppError::Conflict(_) => AppError::Conflict("Email ID already exists!".to_string()),
            other => other,
        });
    }
    tracing::info!(user_id = %user.id, "User registered");

    let jar = start_session(&state, jar, &user.id)?;
    Ok((
        StatusCode::CREATED,
        jar,
        AuthResponse::new("User created successfully", user),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("All fields are required!".to_string()));
    }

    let mismatch = || AppError::Validation("Email or password doesn't match".to_string());

    let user = state.db.find_user_by_email(&email).await?.ok_or_else(mismatch)?;
    if !verify_password(&req.password, &user.password)? {
        tracing::debug!(user_id = %user.id, "Login with wrong password");
        return Err(mismatch());
    }

    let jar = start_session(&state, jar, &user.id)?;
    Ok((jar, AuthResponse::new("Login successfully", user)))
}

/// Clear the session cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let expired = Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(!state.config.is_local_frontend())
        .max_age(time::Duration::ZERO)
        .build();

    (jar.add(expired), MessageResponse::new("Logged out successfully"))
}

// ─── Profile ─────────────────────────────────────────────────

async fn load_user(state: &AppState, user_id: &str) -> Result<User> {
    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User doesn't exist!".to_string()))
}

async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AuthResponse>> {
    let user = load_user(&state, &auth.id).await?;
    Ok(AuthResponse::new("Your profile will be displayed below", user))
}

/// Update display name and/or avatar (multipart: `fullName`, `avatar`).
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    MultipartBody(multipart): MultipartBody,
) -> Result<Json<AuthResponse>> {
    let mut form = FormData::read(multipart, "avatar").await?;
    let mut user = load_user(&state, &auth.id).await?;

    if let Some(full_name) = form.text("fullName") {
        if full_name.chars().count() > 50 {
            return Err(AppError::Validation(
                "Name should be at most 50 characters".to_string(),
            ));
        }
        user.full_name = full_name;
    }

    // The old avatar is only destroyed once the record points at the new one.
    let mut replaced = None;
    if let Some(file) = form.take_file() {
        let avatar = state
            .media
            .upload(file, MediaKind::Image, Some(AVATAR_TRANSFORMATION))
            .await?;
        replaced = Some(std::mem::replace(&mut user.avatar, avatar));
    }

    user.updated_at = now_rfc3339();
    if let Err(e) = state.db.save_user(&user).await {
        if replaced.is_some() {
            state
                .media
                .destroy_best_effort(&user.avatar.public_id, MediaKind::Image)
                .await;
        }
        return Err(e);
    }

    if let Some(previous) = replaced.filter(|p| p.secure_url != DEFAULT_AVATAR_URL) {
        state
            .media
            .destroy_best_effort(&previous.public_id, MediaKind::Image)
            .await;
    }

    Ok(AuthResponse::new(
        "Your profile has been updated successfully",
        user,
    ))
}

// ─── Passwords ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// Email a single-use reset link.
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(AppError::Validation("Email is required!".to_string()));
    }

    let mut user = state
        .db
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("Given email id doesn't exist!".to_string()))?;

    let ttl_minutes = state.config.reset_token_ttl_minutes;
    let token = issue_reset_token()?;
    user.forgot_password_token = Some(token.hash);
    user.forgot_password_expiry = Some(format_utc_rfc3339(
        chrono::Utc::now() + chrono::Duration::minutes(ttl_minutes),
    ));
    state.db.save_user(&user).await?;

    let body = reset_password_email(&state.config.frontend_url, &token.raw, ttl_minutes);
    if let Err(e) = state.mailer.send(&email, "Reset password", body).await {
        tracing::warn!(user_id = %user.id, error = %e, "Reset email failed; revoking token");
        user.clear_reset_token();
        state.db.save_user(&user).await?;
        return Err(AppError::Unavailable(
            "Unable to send email, please try again".to_string(),
        ));
    }

    tracing::info!(user_id = %user.id, "Password reset token issued");
    Ok(MessageResponse::new(&format!(
        "Reset password token sent to {} successfully",
        email
    )))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// Consume a reset token and set a new password.
async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(reset_token): Path<String>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    if req.password.is_empty() {
        return Err(AppError::Validation("Password is required!".to_string()));
    }
    validate_password_strength(&req.password)?;

    let invalid = || AppError::Validation("Token is invalid or expired! Try again".to_string());

    let mut user = state
        .db
        .find_user_by_reset_token(&hash_reset_token(&reset_token))
        .await?
        .ok_or_else(invalid)?;

    if !reset_token_is_live(user.forgot_password_expiry.as_deref(), chrono::Utc::now()) {
        user.clear_reset_token();
        state.db.save_user(&user).await?;
        return Err(invalid());
    }

    user.password = hash_password(&req.password)?;
    user.clear_reset_token();
    user.updated_at = now_rfc3339();
    state.db.save_user(&user).await?;

    tracing::info!(user_id = %user.id, "Password reset");
    Ok(MessageResponse::new(
        "Your password has been successfully changed",
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    if req.old_password.is_empty() || req.new_password.is_empty() {
        return Err(AppError::Validation("All fields are mandatory!".to_string()));
    }
    if req.old_password == req.new_password {
        return Err(AppError::Validation(
            "New password must differ from the old password".to_string(),
        ));
    }
    validate_password_strength(&req.new_password)?;

    let mut user = load_user(&state, &auth.id).await?;
    if !verify_password(&req.old_password, &user.password)? {
        return Err(AppError::Validation("Incorrect old password".to_string()));
    }

    user.password = hash_password(&req.new_password)?;
    user.updated_at = now_rfc3339();
    state.db.save_user(&user).await?;

    Ok(MessageResponse::new("Password changed successfully"))
}
