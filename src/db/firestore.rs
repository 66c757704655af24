// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile, credentials, subscription mirror)
//! - User email index (uniqueness)
//! - Courses (with embedded lectures)
//! - Payments (append-only audit records)

use crate::db::{collections, email_key, EmailIndexEntry};
use crate::error::AppError;
use crate::models::{Course, Payment, User};
use firestore::errors::FirestoreError;

/// Firestore-backed store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    pub async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, AppError> {
        let token_hash = token_hash.to_string();
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| {
                q.for_all([q.field("forgotPasswordToken").eq(token_hash.clone())])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Create a user and claim its email in the uniqueness index.
    ///
    /// The index write is create-only, so a second registration racing on
    /// the same address is rejected by Firestore itself.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let key = email_key(&user.email);
        let entry = EmailIndexEntry {
            user_id: user.id.clone(),
        };

        let claimed: Result<EmailIndexEntry, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::USER_EMAILS)
            .document_id(&key)
            .object(&entry)
            .execute()
            .await;

        match claimed {
            Ok(_) => {}
            Err(FirestoreError::DataConflictError(_)) => {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
            Err(e) => return Err(AppError::Database(e.to_string())),
        }

        let created: Result<User, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await;

        if let Err(e) = created {
            // Release the email so the user can retry.
            if let Err(release_err) = self
                .client
                .fluent()
                .delete()
                .from(collections::USER_EMAILS)
                .document_id(&key)
                .execute()
                .await
            {
                tracing::error!(error = %release_err, "Failed to release email index entry");
            }
            return Err(AppError::Database(e.to_string()));
        }

        Ok(())
    }

    pub async fn save_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Course Operations ───────────────────────────────────────

    pub async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::COURSES)
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_course(&self, course_id: &str) -> Result<Option<Course>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::COURSES)
            .obj()
            .one(course_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn save_course(&self, course: &Course) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::COURSES)
            .document_id(&course.id)
            .object(course)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_course(&self, course_id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::COURSES)
            .document_id(course_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Payment Operations ──────────────────────────────────────

    /// Create-only: a payment id that is already recorded is a `Conflict`.
    pub async fn insert_payment(&self, payment: &Payment) -> Result<(), AppError> {
        let inserted: Result<Payment, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::PAYMENTS)
            .document_id(&payment.id)
            .object(payment)
            .execute()
            .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(AppError::Conflict(format!(
                "Payment {} already recorded",
                payment.id
            ))),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    pub async fn payments_for_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<Payment>, AppError> {
        let subscription_id = subscription_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::PAYMENTS)
            .filter(move |q| {
                q.for_all([q
                    .field("razorpaySubscriptionId")
                    .eq(subscription_id.clone())])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
