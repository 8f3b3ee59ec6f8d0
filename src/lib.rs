// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! authgate: user authentication service.
//!
//! Signup, password and Google login, access/refresh token issuance,
//! refresh and logout, plus the per-request authorization gate.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::CredentialStore;
use services::{IdentityProvider, SessionManager};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CredentialStore>,
    pub sessions: SessionManager,
    pub identity_provider: Arc<dyn IdentityProvider>,
}
