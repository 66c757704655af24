// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Database`] is the handle the rest of the crate talks to. It dispatches
//! to Firestore in production or to a process-local store for development
//! and tests; both backends honour the same contract, including email
//! uniqueness.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreStore;
pub use self::memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Course, Payment, User};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness index, keyed by [`super::email_key`].
    pub const USER_EMAILS: &str = "user_emails";
    pub const COURSES: &str = "courses";
    pub const PAYMENTS: &str = "payments";
}

/// Document stored in the email index.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmailIndexEntry {
    pub user_id: String,
}

/// Generate a new random document ID (24 lowercase hex characters).
pub fn new_document_id() -> Result<String, AppError> {
    let mut bytes = [0u8; 12];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;
    Ok(hex::encode(bytes))
}

/// Document ID for an email in the uniqueness index.
///
/// Hashed so arbitrary address characters never reach the document path.
pub fn email_key(email: &str) -> String {
    hex::encode(Sha256::digest(email.as_bytes()))
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreStore),
    Memory(Arc<MemoryStore>),
}

/// Document store handle, cheap to clone.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

impl Database {
    /// Connect to Firestore.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn connect_firestore(project_id: &str) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreStore::new(project_id).await?),
        })
    }

    /// Create an empty process-local store.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    /// Make subsequent writes to the in-memory store fail. Ignored for Firestore.
    pub fn set_fail_writes(&self, fail: bool) {
        match &self.backend {
            Backend::Firestore(_) => {
                tracing::warn!("Write failure injection is only supported in memory")
            }
            Backend::Memory(mem) => mem.set_fail_writes(fail),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.get_user(user_id).await,
            Backend::Memory(mem) => Ok(mem.get_user(user_id)),
        }
    }

    /// Find a user by (normalized) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.find_user_by_email(email).await,
            Backend::Memory(mem) => Ok(mem.find_user_by_email(email)),
        }
    }

    /// Find the user holding the given reset token hash.
    pub async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.find_user_by_reset_token(token_hash).await,
            Backend::Memory(mem) => Ok(mem.find_user_by_reset_token(token_hash)),
        }
    }

    /// Create a new user, failing with `Conflict` if the email is taken.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.create_user(user).await,
            Backend::Memory(mem) => mem.create_user(user),
        }
    }

    /// Overwrite an existing user record.
    pub async fn save_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.save_user(user).await,
            Backend::Memory(mem) => mem.save_user(user),
        }
    }

    // ─── Course Operations ───────────────────────────────────────

    /// All courses, oldest first.
    pub async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.list_courses().await,
            Backend::Memory(mem) => Ok(mem.list_courses()),
        }
    }

    pub async fn get_course(&self, course_id: &str) -> Result<Option<Course>, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.get_course(course_id).await,
            Backend::Memory(mem) => Ok(mem.get_course(course_id)),
        }
    }

    /// Create or overwrite a course.
    pub async fn save_course(&self, course: &Course) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.save_course(course).await,
            Backend::Memory(mem) => mem.save_course(course),
        }
    }

    /// Delete a course. Deleting an absent ID is not an error.
    pub async fn delete_course(&self, course_id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.delete_course(course_id).await,
            Backend::Memory(mem) => {
                mem.delete_course(course_id);
                Ok(())
            }
        }
    }

    // ─── Payment Operations ──────────────────────────────────────

    /// Append a payment record. A payment id already on record is a `Conflict`.
    pub async fn insert_payment(&self, payment: &Payment) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.insert_payment(payment).await,
            Backend::Memory(mem) => mem.insert_payment(payment),
        }
    }

    /// Payments recorded against a gateway subscription.
    pub async fn payments_for_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<Payment>, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.payments_for_subscription(subscription_id).await,
            Backend::Memory(mem) => Ok(mem.payments_for_subscription(subscription_id)),
        }
    }
}
