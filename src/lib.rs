// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! LMS backend: accounts, course catalog and subscription billing.
//!
//! This crate provides the REST API behind the learning-management
//! frontend. Persistence is Firestore; media goes to Cloudinary and
//! billing to Razorpay.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{Mailer, MediaStore, RazorpayClient};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub razorpay: RazorpayClient,
    pub media: MediaStore,
    pub mailer: Mailer,
}
