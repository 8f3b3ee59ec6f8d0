// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end session lifecycle tests: signup, login, refresh, logout.

use authgate::db::CredentialStore;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};

mod common;
use common::{
    body_json, cookie_values, create_test_app, find_cookie, json_request, login_request,
    request_with_cookies, set_cookie_headers, signup_and_login, signup_request,
};

#[tokio::test]
async fn test_signup_returns_user_without_password() {
    let app = create_test_app();

    let response = app.send(signup_request("alice", "password123")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["age"], 30);
    assert!(body["user_id"].as_i64().is_some());
    assert!(body.get("hashed_password").is_none());
    assert!(body.get("password").is_none());
    assert_eq!(app.store.user_count(), 1);
    assert_eq!(app.store.token_count(), 0);
}

#[tokio::test]
async fn test_duplicate_signup_rejected() {
    let app = create_test_app();

    let response = app.send(signup_request("alice", "password123")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(signup_request("alice", "otherpass456")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "username_taken");
    assert_eq!(app.store.user_count(), 1);

    // The original password still works
    let response = app.send(login_request("alice", "password123")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_validation() {
    let app = create_test_app();

    let short_password = app.send(signup_request("bob", "short")).await;
    assert_eq!(short_password.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(short_password).await["error"], "bad_request");

    let bad_email = app
        .send(json_request(
            "/signup",
            serde_json::json!({
                "name": "Bob",
                "age": 20,
                "username": "bob",
                "email": "not-an-email",
                "password": "password123",
            }),
        ))
        .await;
    assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);

    let negative_age = app
        .send(json_request(
            "/signup",
            serde_json::json!({
                "name": "Bob",
                "age": -1,
                "username": "bob",
                "email": "bob@example.com",
                "password": "password123",
            }),
        ))
        .await;
    assert_eq!(negative_age.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.store.user_count(), 0);
}

#[tokio::test]
async fn test_login_sets_cookies_not_body() {
    let app = create_test_app();
    app.send(signup_request("alice", "password123")).await;

    let response = app.send(login_request("alice", "password123")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies = set_cookie_headers(&response);
    let access = find_cookie(&set_cookies, "access_token");
    let refresh = find_cookie(&set_cookies, "refresh_token");
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("SameSite=Strict"));
    assert!(access.contains("Path=/"));
    assert!(refresh.contains("HttpOnly"));
    assert!(refresh.contains("Path=/auth"));

    let cookies = cookie_values(&response);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Login successful");
    let rendered = body.to_string();
    assert!(!rendered.contains(&cookies["access_token"]));
    assert!(!rendered.contains(&cookies["refresh_token"]));

    assert_eq!(app.store.token_count(), 1);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
    let app = create_test_app();
    app.send(signup_request("alice", "password123")).await;

    let wrong_password = app.send(login_request("alice", "wrongpass999")).await;
    let unknown_user = app.send(login_request("nobody", "password123")).await;

    assert_eq!(wrong_password.status(), StatusCode::NOT_FOUND);
    assert_eq!(unknown_user.status(), StatusCode::NOT_FOUND);
    assert!(set_cookie_headers(&wrong_password).is_empty());
    assert!(set_cookie_headers(&unknown_user).is_empty());

    let wrong_password = body_json(wrong_password).await;
    let unknown_user = body_json(unknown_user).await;
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password["error"], "invalid_credentials");
    assert_eq!(app.store.token_count(), 0);
}

#[tokio::test]
async fn test_login_replaces_previous_session() {
    let app = create_test_app();
    let (first_access, _) = signup_and_login(&app, "alice", "password123").await;

    let response = app.send(login_request("alice", "password123")).await;
    let second_access = cookie_values(&response)["access_token"].clone();

    assert_ne!(first_access, second_access);
    assert_eq!(app.store.token_count(), 1);

    let record = app
        .state
        .store
        .find_tokens("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.access_token, second_access);
}

#[tokio::test]
async fn test_me_returns_current_user() {
    let app = create_test_app();
    let (access, _) = signup_and_login(&app, "alice", "password123").await;

    let response = app
        .send(request_with_cookies("GET", "/me", &[("access_token", &access)]))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["name"], "Test User");
    assert!(body.get("hashed_password").is_none());
}

#[tokio::test]
async fn test_refresh_mints_new_access_token_each_time() {
    let app = create_test_app();
    let (original_access, refresh) = signup_and_login(&app, "alice", "password123").await;

    let first = app
        .send(request_with_cookies(
            "POST",
            "/auth/refresh",
            &[("refresh_token", &refresh)],
        ))
        .await;
    assert_eq!(first.status(), StatusCode::OK);
    let first_cookies = cookie_values(&first);
    assert!(!first_cookies.contains_key("refresh_token"));
    let a1 = first_cookies["access_token"].clone();
    assert_eq!(body_json(first).await["message"], "Access token refreshed");

    let second = app
        .send(request_with_cookies(
            "POST",
            "/auth/refresh",
            &[("refresh_token", &refresh)],
        ))
        .await;
    assert_eq!(second.status(), StatusCode::OK);
    let a2 = cookie_values(&second)["access_token"].clone();

    assert_ne!(a1, original_access);
    assert_ne!(a1, a2);

    // Stored record tracks the latest access token; refresh token unchanged
    let record = app
        .state
        .store
        .find_tokens("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.access_token, a2);
    assert_eq!(record.refresh_token, refresh);

    let response = app
        .send(request_with_cookies("GET", "/me", &[("access_token", &a2)]))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_missing_or_wrong_token() {
    let app = create_test_app();
    let (access, _) = signup_and_login(&app, "alice", "password123").await;

    let missing = app
        .send(request_with_cookies("POST", "/auth/refresh", &[]))
        .await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(missing).await["error"], "invalid_token");

    let garbage = app
        .send(request_with_cookies(
            "POST",
            "/auth/refresh",
            &[("refresh_token", "not.a.jwt")],
        ))
        .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    // An access token is not a refresh token
    let wrong_kind = app
        .send(request_with_cookies(
            "POST",
            "/auth/refresh",
            &[("refresh_token", &access)],
        ))
        .await;
    assert_eq!(wrong_kind.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie_headers(&wrong_kind).is_empty());
}

#[tokio::test]
async fn test_logout_clears_session_and_cookies() {
    let app = create_test_app();
    let (access, refresh) = signup_and_login(&app, "alice", "password123").await;

    let response = app
        .send(request_with_cookies(
            "POST",
            "/logout",
            &[("access_token", &access)],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies = set_cookie_headers(&response);
    let access_removal = find_cookie(&set_cookies, "access_token");
    let refresh_removal = find_cookie(&set_cookies, "refresh_token");
    assert!(access_removal.starts_with("access_token=;"));
    assert!(access_removal.contains("Max-Age=0"));
    assert!(access_removal.contains("Path=/"));
    assert!(refresh_removal.starts_with("refresh_token=;"));
    assert!(refresh_removal.contains("Max-Age=0"));
    assert!(refresh_removal.contains("Path=/auth"));
    assert_eq!(
        body_json(response).await["message"],
        "Successfully logged out"
    );

    assert_eq!(app.store.token_count(), 0);

    // Refresh is gated on a stored session
    let response = app
        .send(request_with_cookies(
            "POST",
            "/auth/refresh",
            &[("refresh_token", &refresh)],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_second_logout_reports_no_active_session() {
    let app = create_test_app();
    let (access, _) = signup_and_login(&app, "alice", "password123").await;

    let first = app
        .send(request_with_cookies(
            "POST",
            "/logout",
            &[("access_token", &access)],
        ))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .send(request_with_cookies(
            "POST",
            "/logout",
            &[("access_token", &access)],
        ))
        .await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(second).await["error"], "no_active_session");
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let app = create_test_app();

    let response = app.send(request_with_cookies("POST", "/logout", &[])).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn test_malformed_bodies_get_json_errors() {
    let app = create_test_app();

    let malformed_json = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/signup")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"name\": \"Bob\""))
                .unwrap(),
        )
        .await;
    assert_eq!(malformed_json.status(), StatusCode::BAD_REQUEST);
    let body = body_json(malformed_json).await;
    assert_eq!(body["error"], "bad_request");
    assert!(body["details"].is_string());

    let missing_content_type = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/signup")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
    assert_eq!(missing_content_type.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing_content_type).await["error"], "bad_request");

    let missing_password = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=alice"))
                .unwrap(),
        )
        .await;
    assert_eq!(missing_password.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing_password).await["error"], "bad_request");

    assert_eq!(app.store.user_count(), 0);
}
