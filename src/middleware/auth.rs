// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication and authorization middleware.
//!
//! Layers run in order: [`require_auth`] resolves the caller and stores an
//! [`AuthUser`] in the request extensions; [`require_roles`] and
//! [`require_subscriber`] then gate on that identity.

use crate::error::AppError;
use crate::models::{Role, Subscription, SubscriptionStatus};
use crate::services::tokens::verify_session_token;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "token";

/// Roles allowed through the admin gate.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Authenticated caller, resolved from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
    pub subscription: Subscription,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Pull the raw session token from the cookie, falling back to the
/// `Authorization: Bearer` header.
fn session_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Middleware that requires a valid session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&jar, &request).ok_or_else(|| {
        AppError::Unauthorized("Token not received! Please login again".to_string())
    })?;

    let user_id = verify_session_token(&token, &state.config.jwt_signing_key)?;

    // Tokens outlive deleted accounts.
    let user = state.db.get_user(&user_id).await?.ok_or_else(|| {
        tracing::debug!(user_id = %user_id, "Session token for unknown user");
        AppError::InvalidToken
    })?;

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        role: user.role,
        subscription: user.subscription,
    });

    Ok(next.run(request).await)
}

/// Middleware that admits only the given roles. Must run after [`require_auth`].
pub async fn require_roles(
    State(roles): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AppError::InvalidToken)?;

    if !roles.contains(&user.role) {
        tracing::debug!(user_id = %user.id, role = ?user.role, "Role gate rejected caller");
        return Err(AppError::Forbidden(
            "You do not have permission to access this route".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// Middleware that admits admins and callers with an active subscription.
pub async fn require_subscriber(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AppError::InvalidToken)?;

    if !user.is_admin() && user.subscription.status != SubscriptionStatus::Active {
        return Err(AppError::Forbidden(
            "Please subscribe to access this route".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    fn gated_app(user: Option<AuthUser>) -> Router {
        let inject = move |mut req: Request, next: Next| {
            let user = user.clone();
            async move {
                if let Some(user) = user {
                    req.extensions_mut().insert(user);
                }
                next.run(req).await
            }
        };

        let admin = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, require_roles));
        let subscriber = Router::new()
            .route("/courses", get(|| async { "ok" }))
            .route_layer(middleware::from_fn(require_subscriber));

        Router::new()
            .merge(admin)
            .merge(subscriber)
            .layer(middleware::from_fn(inject))
    }

    fn caller(role: Role, status: SubscriptionStatus) -> AuthUser {
        AuthUser {
            id: "u1".to_string(),
            role,
            subscription: Subscription { id: None, status },
        }
    }

    async fn status_of(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_role_gate() {
        let admin = caller(Role::Admin, SubscriptionStatus::None);
        let learner = caller(Role::Learner, SubscriptionStatus::Active);

        assert_eq!(status_of(gated_app(Some(admin)), "/admin").await, StatusCode::OK);
        assert_eq!(
            status_of(gated_app(Some(learner)), "/admin").await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(gated_app(None), "/admin").await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_subscriber_gate() {
        let cases = [
            (Role::Learner, SubscriptionStatus::Active, StatusCode::OK),
            (Role::Learner, SubscriptionStatus::Created, StatusCode::BAD_REQUEST),
            (Role::Learner, SubscriptionStatus::Cancelled, StatusCode::BAD_REQUEST),
            (Role::Learner, SubscriptionStatus::None, StatusCode::BAD_REQUEST),
            (Role::Admin, SubscriptionStatus::None, StatusCode::OK),
        ];

        for (role, status, expected) in cases {
            let app = gated_app(Some(caller(role, status)));
            assert_eq!(status_of(app, "/courses").await, expected, "{:?}/{:?}", role, status);
        }
    }

    #[test]
    fn test_cookie_takes_precedence_over_header() {
        let request = Request::builder()
            .header(header::COOKIE, "token=from-cookie")
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(Body::empty())
            .unwrap();
        let jar = CookieJar::from_headers(request.headers());
        assert_eq!(session_token(&jar, &request).as_deref(), Some("from-cookie"));

        let request = Request::builder()
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(Body::empty())
            .unwrap();
        let jar = CookieJar::from_headers(request.headers());
        assert_eq!(session_token(&jar, &request).as_deref(), Some("from-header"));

        let request = Request::builder()
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        let jar = CookieJar::from_headers(request.headers());
        assert!(session_token(&jar, &request).is_none());
    }
}
