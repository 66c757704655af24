// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! LMS API Server
//!
//! Serves account, course catalog and subscription endpoints for the
//! learning-management frontend.

use lms_server::{
    config::{Config, StoreBackend},
    db::Database,
    services::{Mailer, MediaStore, RazorpayClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting LMS API");

    let db = match config.store_backend {
        StoreBackend::Firestore => Database::connect_firestore(&config.gcp_project_id).await?,
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Database::in_memory()
        }
    };

    let razorpay = RazorpayClient::new(config.razorpay.clone());
    let media = MediaStore::new(config.cloudinary.clone());
    let mailer = Mailer::new(config.smtp.as_ref())?;
    tracing::info!(
        plan = %config.razorpay.plan_id,
        cloud = %config.cloudinary.cloud_name,
        smtp = config.smtp.is_some(),
        "Provider clients initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        razorpay,
        media,
        mailer,
    });

    // Build router
    let app = lms_server::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lms_server=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
