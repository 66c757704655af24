//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::MediaRef;

/// Placeholder avatar for users who never uploaded one.
pub const DEFAULT_AVATAR_URL: &str = "https://res.cloudinary.com/demo/image/upload/w_250,h_250,c_fill,r_max/avatar_placeholder.png";

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    #[serde(alias = "USER")]
    Learner,
    /// Privileged tier: manages the catalog, never buys subscriptions.
    Admin,
}

/// Local mirror of the gateway's subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Created,
    Authenticated,
    Active,
    Pending,
    Halted,
    Cancelled,
    Completed,
    Expired,
}

/// Subscription sub-record owned by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Gateway subscription id
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: SubscriptionStatus,
}

/// User record stored in Firestore (`users/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document ID
    pub id: String,
    pub full_name: String,
    /// Lower-cased, trimmed; unique across users
    pub email: String,
    /// Argon2id PHC string
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub avatar: MediaRef,
    #[serde(default)]
    pub subscription: Subscription,
    /// SHA-256 hex of the outstanding reset token
    #[serde(default)]
    pub forgot_password_token: Option<String>,
    /// Reset token expiry (RFC 3339)
    #[serde(default)]
    pub forgot_password_expiry: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Drop any outstanding password reset token.
    pub fn clear_reset_token(&mut self) {
        self.forgot_password_token = None;
        self.forgot_password_expiry = None;
    }
}

/// Public view of a user. Never carries the password or reset token.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub avatar: MediaRef,
    pub subscription: Subscription,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            avatar: user.avatar,
            subscription: user.subscription,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "u1".to_string(),
            full_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            role: Role::Learner,
            avatar: MediaRef {
                public_id: "ada@example.com".to_string(),
                secure_url: DEFAULT_AVATAR_URL.to_string(),
            },
            subscription: Subscription::default(),
            forgot_password_token: Some("deadbeef".to_string()),
            forgot_password_expiry: Some("2026-01-01T00:00:00Z".to_string()),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_response_omits_secrets() {
        let json = serde_json::to_value(UserResponse::from(sample_user())).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("forgotPasswordToken").is_none());
        assert_eq!(json["fullName"], "Ada");
        assert_eq!(json["role"], "LEARNER");
        assert_eq!(json["subscription"]["status"], "none");
    }

    #[test]
    fn test_legacy_user_role_alias() {
        let role: Role = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(role, Role::Learner);
        let role: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
