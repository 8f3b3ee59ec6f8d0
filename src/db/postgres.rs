// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgreSQL credential store.
//!
//! Writes run inside a transaction that is committed explicitly; an early
//! return drops the transaction, which rolls it back.

use crate::db::{CredentialStore, StoreError};
use crate::models::{NewUser, TokenRecord, User};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const SCHEMA: &str = include_str!("schema.sql");
const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const USER_COLUMNS: &str = "user_id, name, age, username, email, hashed_password";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect to PostgreSQL: {}", e)))?;

        tracing::info!(max_connections = MAX_CONNECTIONS, "Connected to PostgreSQL");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    // ─── User Operations ─────────────────────────────────────────

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 ORDER BY user_id LIMIT 1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (name, age, username, email, hashed_password) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );

        let mut tx = self.pool.begin().await?;
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(user.age)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.hashed_password)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(created)
    }

    // ─── Token Operations ────────────────────────────────────────

    async fn find_tokens(&self, username: &str) -> Result<Option<TokenRecord>, StoreError> {
        Ok(sqlx::query_as::<_, TokenRecord>(
            "SELECT username, access_token, refresh_token FROM tokens WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_tokens(&self, record: &TokenRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO tokens (username, access_token, refresh_token) VALUES ($1, $2, $3) \
             ON CONFLICT (username) DO UPDATE \
             SET access_token = EXCLUDED.access_token, refresh_token = EXCLUDED.refresh_token",
        )
        .bind(&record.username)
        .bind(&record.access_token)
        .bind(&record.refresh_token)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_access_token(
        &self,
        username: &str,
        access_token: &str,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE tokens SET access_token = $2 WHERE username = $1")
            .bind(username)
            .bind(access_token)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_tokens(&self, username: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM tokens WHERE username = $1")
            .bind(username)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
