// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: signup, login, refresh, logout and Google login.
//!
//! Tokens travel only in cookies (`HttpOnly`, `SameSite=Strict`); response
//! bodies never contain them. The refresh cookie is scoped to `/auth` so
//! it is only sent to the refresh endpoint.

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection, QueryRejection},
        Query, State,
    },
    response::Redirect,
    routing::{get, post},
    Extension, Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, ACCESS_TOKEN_COOKIE};
use crate::models::{TokenPair, UserResponse};
use crate::services::{Signup, TokenKind};
use crate::AppState;

/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
/// Cookie binding the OAuth state to the browser that started the flow.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

const REFRESH_COOKIE_PATH: &str = "/auth";
const OAUTH_CALLBACK_PATH: &str = "/auth/callback";
const OAUTH_STATE_MAX_AGE_SECS: i64 = 10 * 60;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/login/google", get(login_google))
        .route(OAUTH_CALLBACK_PATH, get(oauth_callback))
}

/// Plain confirmation body.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

// ─── Cookies ─────────────────────────────────────────────────

fn token_cookie(
    name: &'static str,
    value: String,
    path: &'static str,
    max_age: chrono::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .build()
}

/// Cookie that tells the browser to drop `name`, whether or not the
/// request carried it.
fn removal_cookie(
    name: &'static str,
    path: &'static str,
    same_site: SameSite,
    secure: bool,
) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, ""))
        .path(path)
        .http_only(true)
        .same_site(same_site)
        .secure(secure)
        .build();
    cookie.make_removal();
    cookie
}

fn access_cookie(state: &AppState, token: String) -> Cookie<'static> {
    token_cookie(
        ACCESS_TOKEN_COOKIE,
        token,
        "/",
        state.sessions.codec().ttl(TokenKind::Access),
        state.config.cookie_secure,
    )
}

fn with_session_cookies(jar: CookieJar, state: &AppState, pair: TokenPair) -> CookieJar {
    jar.add(access_cookie(state, pair.access_token)).add(token_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token,
        REFRESH_COOKIE_PATH,
        state.sessions.codec().ttl(TokenKind::Refresh),
        state.config.cookie_secure,
    ))
}

// ─── Signup / Login ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0, max = 150))]
    pub age: i32,
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
}

/// Create a password account.
async fn signup(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<UserResponse>> {
    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state
        .sessions
        .signup(Signup {
            name: payload.name,
            age: payload.age,
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(Json(user.into()))
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

/// Password login - sets the access and refresh cookies.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    form: std::result::Result<Form<LoginForm>, FormRejection>,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    let Form(form) = form?;
    let pair = state.sessions.login(&form.username, &form.password).await?;

    Ok((
        with_session_cookies(jar, &state, pair),
        MessageResponse::new("Login successful"),
    ))
}

// ─── Refresh / Logout ────────────────────────────────────────

/// Mint a new access token from the refresh cookie.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    let refresh_token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(AppError::InvalidToken)?;

    let access_token = state.sessions.refresh(&refresh_token).await?;

    Ok((
        jar.add(access_cookie(&state, access_token)),
        MessageResponse::new("Access token refreshed"),
    ))
}

/// Close the caller's session and clear both token cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    state.sessions.logout(&user.username).await?;

    let secure = state.config.cookie_secure;
    let jar = jar
        .add(removal_cookie(ACCESS_TOKEN_COOKIE, "/", SameSite::Strict, secure))
        .add(removal_cookie(
            REFRESH_TOKEN_COOKIE,
            REFRESH_COOKIE_PATH,
            SameSite::Strict,
            secure,
        ));

    Ok((jar, MessageResponse::new("Successfully logged out")))
}

// ─── Google OAuth ────────────────────────────────────────────

/// Start OAuth flow - redirect to the identity provider.
async fn login_google(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let oauth_state = sign_state(&state.config.session_secret, Utc::now().timestamp_millis())?;

    // Lax: the provider's redirect back is a cross-site top-level navigation.
    let state_cookie = Cookie::build((OAUTH_STATE_COOKIE, oauth_state.clone()))
        .path(OAUTH_CALLBACK_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .max_age(time::Duration::seconds(OAUTH_STATE_MAX_AGE_SECS))
        .build();

    tracing::info!("Starting OAuth flow, redirecting to identity provider");

    Ok((
        jar.add(state_cookie),
        Redirect::temporary(&state.identity_provider.authorize_url(&oauth_state)),
    ))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange the code, find or create the user, open a session.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    params: std::result::Result<Query<CallbackParams>, QueryRejection>,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    let Query(params) = params?;
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from identity provider");
        return Err(AppError::BadRequest(format!("identity provider error: {}", error)));
    }

    let returned_state = params.state.unwrap_or_default();
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .unwrap_or_default();

    let state_matches = !returned_state.is_empty()
        && bool::from(returned_state.as_bytes().ct_eq(expected_state.as_bytes()));
    if !state_matches
        || !verify_state(
            &returned_state,
            &state.config.session_secret,
            Utc::now().timestamp_millis(),
        )
    {
        tracing::warn!("Invalid or tampered OAuth state parameter");
        return Err(AppError::BadRequest("invalid OAuth state".to_string()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;

    let identity = match state.identity_provider.exchange(&code).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            tracing::warn!("Identity provider returned no email");
            return Err(AppError::UpstreamIdentityMissing);
        }
        Err(e) => {
            tracing::warn!(error = %e, "OAuth code exchange failed");
            return Err(AppError::UpstreamIdentityMissing);
        }
    };

    let pair = state.sessions.oauth_login(&identity).await?;

    let jar = with_session_cookies(jar, &state, pair).add(removal_cookie(
        OAUTH_STATE_COOKIE,
        OAUTH_CALLBACK_PATH,
        SameSite::Lax,
        state.config.cookie_secure,
    ));

    Ok((jar, MessageResponse::new("Login successful")))
}

/// Build a signed OAuth state: base64url("nonce|timestamp_hex|signature_hex").
fn sign_state(secret: &[u8], now_millis: i64) -> Result<String> {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let payload = format!("{}|{:x}", nonce, now_millis);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Check signature and age of a state produced by [`sign_state`].
fn verify_state(state: &str, secret: &[u8], now_millis: i64) -> bool {
    let Some(state_str) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [nonce, timestamp_hex, signature_hex] = parts.as_slice() else {
        return false;
    };

    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("{}|{}", nonce, timestamp_hex).as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return false;
    }

    let Ok(issued_millis) = i64::from_str_radix(timestamp_hex, 16) else {
        return false;
    };
    let age_millis = now_millis - issued_millis;
    (0..=OAUTH_STATE_MAX_AGE_SECS * 1000).contains(&age_millis)
}
