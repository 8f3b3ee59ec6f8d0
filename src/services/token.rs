// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed, expiring access and refresh tokens (JWT).
//!
//! Each token type has its own secret. Decoding always uses the secret of
//! the type the caller expects, so an access token never verifies as a
//! refresh token or the other way round.

use crate::config::Config;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Which of the two token types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token ID
    pub jti: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

/// A token that passed signature and expiry checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, malformed payload or wrong token type.
    #[error("invalid token")]
    Invalid,

    #[error("token expired")]
    Expired,

    #[error("token encoding failed: {0}")]
    Encode(String),
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn from_secret(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// Mints and verifies both token types.
pub struct TokenCodec {
    algorithm: Algorithm,
    access: SigningKeys,
    refresh: SigningKeys,
}

impl TokenCodec {
    pub fn new(config: &Config) -> Self {
        Self {
            algorithm: config.jwt_algorithm,
            access: SigningKeys::from_secret(
                &config.access_token_secret,
                Duration::minutes(config.access_token_ttl_minutes),
            ),
            refresh: SigningKeys::from_secret(
                &config.refresh_token_secret,
                Duration::minutes(config.refresh_token_ttl_minutes),
            ),
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Configured lifetime for `kind`.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    /// Mint a token for `subject` with the configured lifetime.
    pub fn issue_default(&self, subject: &str, kind: TokenKind) -> Result<String, TokenError> {
        self.issue(subject, kind, self.ttl(kind))
    }

    /// Mint a token for `subject` that expires `ttl` from now.
    pub fn issue(&self, subject: &str, kind: TokenKind, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();

        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
            jti: uuid::Uuid::new_v4().to_string(),
            kind,
        };

        encode(
            &Header::new(self.algorithm),
            &claims,
            &self.keys(kind).encoding,
        )
        .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Check signature, type and expiry; return the subject.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<VerifiedToken, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked below without leeway: a token is dead once now >= exp.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, ?kind, "Token rejected");
                TokenError::Invalid
            })?
            .claims;

        if claims.kind != kind {
            return Err(TokenError::Invalid);
        }

        if Utc::now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        if claims.sub.is_empty() {
            return Err(TokenError::Invalid);
        }

        Ok(VerifiedToken {
            subject: claims.sub,
        })
    }
}
