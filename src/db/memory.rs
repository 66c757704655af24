// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local document store.
//!
//! Mirrors the Firestore collections with concurrent maps so the full
//! request flow can run without a database.

use crate::db::email_key;
use crate::error::AppError;
use crate::models::{Course, Payment, User};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    /// email key -> user id
    user_emails: DashMap<String, String>,
    courses: DashMap<String, Course>,
    payments: DashMap<String, Payment>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Make subsequent record writes fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(AppError::Database("memory store writes disabled".to_string()));
        }
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|u| u.clone())
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let user_id = self.user_emails.get(&email_key(email))?.clone();
        self.get_user(&user_id)
    }

    pub fn find_user_by_reset_token(&self, token_hash: &str) -> Option<User> {
        self.users
            .iter()
            .find(|u| u.forgot_password_token.as_deref() == Some(token_hash))
            .map(|u| u.clone())
    }

    pub fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.check_writable()?;
        match self.user_emails.entry(email_key(&user.email)) {
            Entry::Occupied(_) => Err(AppError::Conflict("Email already exists".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
                self.users.insert(user.id.clone(), user.clone());
                Ok(())
            }
        }
    }

    pub fn save_user(&self, user: &User) -> Result<(), AppError> {
        self.check_writable()?;
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    pub fn list_courses(&self) -> Vec<Course> {
        let mut courses: Vec<Course> = self.courses.iter().map(|c| c.clone()).collect();
        courses.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        courses
    }

    pub fn get_course(&self, course_id: &str) -> Option<Course> {
        self.courses.get(course_id).map(|c| c.clone())
    }

    pub fn save_course(&self, course: &Course) -> Result<(), AppError> {
        self.check_writable()?;
        self.courses.insert(course.id.clone(), course.clone());
        Ok(())
    }

    pub fn delete_course(&self, course_id: &str) {
        self.courses.remove(course_id);
    }

    pub fn insert_payment(&self, payment: &Payment) -> Result<(), AppError> {
        self.check_writable()?;
        match self.payments.entry(payment.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Payment {} already recorded",
                payment.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(payment.clone());
                Ok(())
            }
        }
    }

    pub fn payments_for_subscription(&self, subscription_id: &str) -> Vec<Payment> {
        self.payments
            .iter()
            .filter(|p| p.razorpay_subscription_id == subscription_id)
            .map(|p| p.clone())
            .collect()
    }
}
