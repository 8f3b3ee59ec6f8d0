// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User and session models for storage and API.

use serde::{Deserialize, Serialize};

/// User row. `username` is unique and is the subject of every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub age: i32,
    pub username: String,
    /// Present for signup and OAuth accounts
    pub email: Option<String>,
    /// Argon2 PHC string; empty for OAuth-only accounts
    #[serde(skip_serializing)]
    pub hashed_password: String,
}

/// Fields for a user that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub age: i32,
    pub username: String,
    pub email: Option<String>,
    pub hashed_password: String,
}

/// The current access/refresh pair stored for a username.
///
/// At most one record exists per username; a new login replaces it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TokenRecord {
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Freshly minted access and refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Public view of a user (no password digest).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub user_id: i64,
    pub name: String,
    pub age: i32,
    pub username: String,
    pub email: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
            age: user.age,
            username: user.username,
            email: user.email,
        }
    }
}
