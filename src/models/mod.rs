// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod course;
pub mod payment;
pub mod user;

pub use course::{Course, CourseSummary, Lecture};
pub use payment::Payment;
pub use user::{DEFAULT_AVATAR_URL, Role, Subscription, SubscriptionStatus, User, UserResponse};

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Reference to an asset held by the media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub public_id: String,
    pub secure_url: String,
}

/// Resource class an asset was uploaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Path segment used by the media host's API.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}
