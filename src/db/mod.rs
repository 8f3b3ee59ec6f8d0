// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store: users and their current session tokens.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{NewUser, TokenRecord, User};
use async_trait::async_trait;

/// Store-level failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The username unique constraint rejected an insert.
    #[error("username already exists")]
    UsernameTaken,

    #[error("{0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UsernameTaken;
            }
        }
        StoreError::Database(err.to_string())
    }
}

/// Data-access interface for users and token records.
///
/// Each write is its own unit of work: it either commits completely or
/// leaves the store untouched.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Oldest user with this email, if any.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a user and return it with its assigned `user_id`.
    ///
    /// Fails with [`StoreError::UsernameTaken`] if the username exists.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_tokens(&self, username: &str) -> Result<Option<TokenRecord>, StoreError>;

    /// Insert the record, replacing any existing record for the same username.
    async fn upsert_tokens(&self, record: &TokenRecord) -> Result<(), StoreError>;

    /// Overwrite the stored access token. Returns `false` if no record exists.
    async fn update_access_token(
        &self,
        username: &str,
        access_token: &str,
    ) -> Result<bool, StoreError>;

    /// Delete the record. Returns `false` if no record existed.
    async fn delete_tokens(&self, username: &str) -> Result<bool, StoreError>;
}
