// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: signup, login, refresh, logout and OAuth login.
//!
//! Per username the session is either absent or holds one
//! access/refresh pair. Login replaces the pair, refresh swaps the access
//! token in place, logout deletes the pair.

use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::{NewUser, TokenPair, TokenRecord, User};
use crate::services::oauth::ExternalIdentity;
use crate::services::password::PasswordHasher;
use crate::services::token::{TokenCodec, TokenKind};
use std::sync::Arc;

/// Input for [`SessionManager::signup`].
#[derive(Debug, Clone)]
pub struct Signup {
    pub name: String,
    pub age: i32,
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    codec: TokenCodec,
    hasher: PasswordHasher,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec, hasher: PasswordHasher) -> Self {
        Self {
            store,
            codec,
            hasher,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Register a password account.
    pub async fn signup(&self, signup: Signup) -> Result<User> {
        if self
            .store
            .find_user_by_username(&signup.username)
            .await?
            .is_some()
        {
            tracing::info!(username = %signup.username, "Signup rejected, username exists");
            return Err(AppError::UsernameTaken);
        }

        let hashed_password = self.hash_password(signup.password).await?;

        // The store's unique constraint still catches a concurrent signup.
        let user = self
            .store
            .insert_user(NewUser {
                name: signup.name,
                age: signup.age,
                username: signup.username,
                email: Some(signup.email),
                hashed_password,
            })
            .await?;

        tracing::info!(user_id = user.user_id, username = %user.username, "User created");
        Ok(user)
    }

    /// Check credentials and open a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let user = self.store.find_user_by_username(username).await?;

        // Unknown users are checked against the decoy so both failures cost the same.
        let digest = match &user {
            Some(user) => user.hashed_password.clone(),
            None => self.hasher.decoy_digest().to_string(),
        };
        let verified = self.verify_password(password.to_string(), digest).await?;

        let Some(user) = user.filter(|_| verified) else {
            tracing::info!(username, "Login failed");
            return Err(AppError::InvalidCredentials);
        };

        let pair = self.open_session(&user.username).await?;
        tracing::info!(username, "User logged in");
        Ok(pair)
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The refresh token is not rotated; it stays usable until it expires
    /// or the session is closed by logout.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let subject = self
            .codec
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                AppError::InvalidToken
            })?
            .subject;

        let access_token = self.codec.issue_default(&subject, TokenKind::Access)?;

        if !self
            .store
            .update_access_token(&subject, &access_token)
            .await?
        {
            tracing::info!(username = %subject, "Refresh without an active session");
            return Err(AppError::InvalidToken);
        }

        tracing::debug!(username = %subject, "Access token refreshed");
        Ok(access_token)
    }

    /// Close the session of `username`.
    pub async fn logout(&self, username: &str) -> Result<()> {
        if !self.store.delete_tokens(username).await? {
            return Err(AppError::NoActiveSession);
        }
        tracing::info!(username, "User logged out");
        Ok(())
    }

    /// Open a session for an identity asserted by an OAuth provider.
    ///
    /// The first login for an email creates an account with no password
    /// and a username derived from the display name. A derived username
    /// that already belongs to someone else fails with `UsernameTaken`.
    pub async fn oauth_login(&self, identity: &ExternalIdentity) -> Result<TokenPair> {
        let user = match self.store.find_user_by_email(&identity.email).await? {
            Some(user) => user,
            None => {
                let username = username_from_display_name(&identity.name);
                let user = self
                    .store
                    .insert_user(NewUser {
                        name: identity.name.clone(),
                        age: 0,
                        username,
                        email: Some(identity.email.clone()),
                        hashed_password: String::new(),
                    })
                    .await
                    .inspect_err(|e| {
                        tracing::warn!(error = %e, "Could not create OAuth account");
                    })?;
                tracing::info!(user_id = user.user_id, username = %user.username, "OAuth user created");
                user
            }
        };

        let pair = self.open_session(&user.username).await?;
        tracing::info!(username = %user.username, "User logged in via OAuth");
        Ok(pair)
    }

    pub async fn current_user(&self, username: &str) -> Result<User> {
        self.store
            .find_user_by_username(username)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn open_session(&self, username: &str) -> Result<TokenPair> {
        let access_token = self.codec.issue_default(username, TokenKind::Access)?;
        let refresh_token = self.codec.issue_default(username, TokenKind::Refresh)?;

        self.store
            .upsert_tokens(&TokenRecord {
                username: username.to_string(),
                access_token: access_token.clone(),
                refresh_token: refresh_token.clone(),
            })
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = self.hasher.clone();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;
        Ok(digest)
    }

    async fn verify_password(&self, password: String, digest: String) -> Result<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| AppError::Internal(e.into()))
    }
}

/// Username for a new OAuth account: the display name with spaces
/// replaced by underscores.
pub fn username_from_display_name(name: &str) -> String {
    name.replace(' ', "_")
}
