// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! authgate API server
//!
//! Signup, login, token refresh, logout and Google sign-in backed by
//! PostgreSQL.

use authgate::{
    config::Config,
    db::PgStore,
    services::{GoogleProvider, PasswordHasher, SessionManager, TokenCodec},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment; missing secrets stop startup here
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting authgate API");

    // Connect to PostgreSQL and make sure the schema exists
    let store = PgStore::connect(&config.database_url).await?;
    store.migrate().await?;

    let hasher = PasswordHasher::new(&config.argon2)?;
    let sessions = SessionManager::new(
        Arc::new(store.clone()),
        TokenCodec::new(&config),
        hasher,
    );

    let identity_provider = Arc::new(GoogleProvider::new(&config)?);

    if !config.cookie_secure {
        tracing::warn!("COOKIE_SECURE is off; token cookies will be sent over plain HTTP");
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store: Arc::new(store),
        sessions,
        identity_provider,
    });

    // Build router
    let app = authgate::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("authgate=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
