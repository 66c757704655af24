// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cloudinary;
pub mod mailer;
pub mod password;
pub mod razorpay;
pub mod signature;
pub mod tokens;

pub use cloudinary::{MediaStore, Upload};
pub use mailer::Mailer;
pub use razorpay::{GatewaySubscription, RazorpayClient};
