// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process credential store for tests and local development.
//!
//! Enforces the same constraints as the PostgreSQL schema: unique
//! usernames and at most one token record per existing user.

use crate::db::{CredentialStore, StoreError};
use crate::models::{NewUser, TokenRecord, User};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    /// Keyed by username
    users: DashMap<String, User>,
    /// Keyed by username
    tokens: DashMap<String, TokenRecord>,
    last_user_id: AtomicI64,
}

/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.tables.users.len()
    }

    pub fn token_count(&self) -> usize {
        self.tables.tokens.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables.users.get(username).map(|u| u.value().clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .users
            .iter()
            .filter(|u| u.email.as_deref() == Some(email))
            .min_by_key(|u| u.user_id)
            .map(|u| u.value().clone()))
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        match self.tables.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(StoreError::UsernameTaken),
            Entry::Vacant(slot) => {
                let user_id = self.tables.last_user_id.fetch_add(1, Ordering::SeqCst) + 1;
                let created = User {
                    user_id,
                    name: user.name,
                    age: user.age,
                    username: user.username,
                    email: user.email,
                    hashed_password: user.hashed_password,
                };
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    async fn find_tokens(&self, username: &str) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.tables.tokens.get(username).map(|r| r.value().clone()))
    }

    async fn upsert_tokens(&self, record: &TokenRecord) -> Result<(), StoreError> {
        if !self.tables.users.contains_key(&record.username) {
            return Err(StoreError::Database(format!(
                "token record references unknown user {}",
                record.username
            )));
        }
        self.tables
            .tokens
            .insert(record.username.clone(), record.clone());
        Ok(())
    }

    async fn update_access_token(
        &self,
        username: &str,
        access_token: &str,
    ) -> Result<bool, StoreError> {
        match self.tables.tokens.get_mut(username) {
            Some(mut record) => {
                record.access_token = access_token.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_tokens(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.tables.tokens.remove(username).is_some())
    }
}
