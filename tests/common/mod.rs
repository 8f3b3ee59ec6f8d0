// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for integration tests.
//!
//! Everything runs offline: an in-memory credential store and a static
//! identity provider stand in for PostgreSQL and Google.

use authgate::config::Config;
use authgate::db::MemoryStore;
use authgate::routes::create_router;
use authgate::services::{
    ExternalIdentity, PasswordHasher, SessionManager, StaticIdentityProvider, TokenCodec,
};
use authgate::AppState;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

/// PostgreSQL URL for store tests, if one is configured.
#[allow(dead_code)]
pub fn test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// Skip test with message if no test database is configured.
#[macro_export]
macro_rules! require_database {
    () => {
        match crate::common::test_database_url() {
            Some(url) => url,
            None => {
                eprintln!("⚠️  Skipping: TEST_DATABASE_URL not set");
                return;
            }
        }
    };
}

/// Router plus the state and store behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: MemoryStore,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Identity the default static provider asserts.
#[allow(dead_code)]
pub fn google_identity() -> ExternalIdentity {
    ExternalIdentity::new("a@x.com", Some("A B".to_string()))
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default(), Some(google_identity()))
}

/// Test app whose authorizer also requires the token to be the stored one.
#[allow(dead_code)]
pub fn create_session_checking_app() -> TestApp {
    let mut config = Config::test_default();
    config.authorizer_checks_session = true;
    create_test_app_with(config, Some(google_identity()))
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config, identity: Option<ExternalIdentity>) -> TestApp {
    let store = MemoryStore::new();
    let sessions = SessionManager::new(
        Arc::new(store.clone()),
        TokenCodec::new(&config),
        PasswordHasher::new(&config.argon2).expect("test Argon2 params"),
    );

    let state = Arc::new(AppState {
        config,
        store: Arc::new(store.clone()),
        sessions,
        identity_provider: Arc::new(StaticIdentityProvider::new(identity)),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
    }
}

#[allow(dead_code)]
pub fn signup_request(username: &str, password: &str) -> Request<Body> {
    let body = serde_json::json!({
        "name": "Test User",
        "age": 30,
        "username": username,
        "email": format!("{username}@example.com"),
        "password": password,
    });
    json_request("/signup", body)
}

#[allow(dead_code)]
pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Form-encoded login. Test credentials are plain alphanumerics.
#[allow(dead_code)]
pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap()
}

/// Request carrying the given cookies.
#[allow(dead_code)]
pub fn request_with_cookies(method: &str, uri: &str, cookies: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if !cookies.is_empty() {
        let value = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header(header::COOKIE, value);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Cookie name to value for every `Set-Cookie` in the response.
#[allow(dead_code)]
pub fn cookie_values(response: &Response) -> HashMap<String, String> {
    set_cookie_headers(response)
        .iter()
        .filter_map(|raw| {
            let pair = raw.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Sign up and log in. Returns the (access, refresh) cookie values.
#[allow(dead_code)]
pub async fn signup_and_login(app: &TestApp, username: &str, password: &str) -> (String, String) {
    let response = app.send(signup_request(username, password)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(login_request(username, password)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = cookie_values(&response);
    (
        cookies["access_token"].clone(),
        cookies["refresh_token"].clone(),
    )
}
