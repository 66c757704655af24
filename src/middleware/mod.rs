// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, authorization).

pub mod auth;

pub use auth::{require_auth, require_roles, require_subscriber, AuthUser};
