// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-request authorization gate.
//!
//! Requests outside the public paths must carry a valid access token in
//! the `access_token` cookie whose subject is a stored user. By default a
//! signature-valid, unexpired token is trusted even after logout, so the
//! access-token lifetime bounds revocation. With
//! `AUTHORIZER_CHECKS_SESSION` the token must also be the one currently
//! stored for the user.

use crate::error::AppError;
use crate::services::TokenKind;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Paths reachable without an access token (the path itself and anything below it).
pub const PUBLIC_PATHS: &[&str] = &[
    "/login",
    "/signup",
    "/auth",
    "/docs",
    "/openapi.json",
    "/upload_files",
    "/health",
];

/// Authenticated user resolved from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
}

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| {
        path.strip_prefix(public)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Middleware that requires a valid access token outside the public paths.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_public_path(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let subject = state
        .sessions
        .codec()
        .verify(&token, TokenKind::Access)
        .map_err(|e| {
            tracing::debug!(error = %e, path = %request.uri().path(), "Access token rejected");
            AppError::Unauthorized
        })?
        .subject;

    let user = state
        .store
        .find_user_by_username(&subject)
        .await?
        .ok_or_else(|| {
            tracing::warn!(username = %subject, "Access token for unknown user");
            AppError::Unauthorized
        })?;

    if state.config.authorizer_checks_session {
        let live = state
            .store
            .find_tokens(&user.username)
            .await?
            .is_some_and(|record| {
                bool::from(record.access_token.as_bytes().ct_eq(token.as_bytes()))
            });
        if !live {
            tracing::debug!(username = %user.username, "Access token has no live session");
            return Err(AppError::Unauthorized);
        }
    }

    request.extensions_mut().insert(AuthUser {
        user_id: user.user_id,
        username: user.username,
    });

    Ok(next.run(request).await)
}
