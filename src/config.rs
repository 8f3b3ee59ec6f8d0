// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Built once at startup and passed into the services that need it.
//! Nothing below `main` reads the environment.

use jsonwebtoken::Algorithm;
use std::env;
use std::str::FromStr;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// PostgreSQL connection string
    pub database_url: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// HMAC algorithm used for both token types
    pub jwt_algorithm: Algorithm,
    /// Access token lifetime in minutes
    pub access_token_ttl_minutes: i64,
    /// Refresh token lifetime in minutes
    pub refresh_token_ttl_minutes: i64,
    /// Require a matching stored session on every authorized request
    pub authorizer_checks_session: bool,
    /// Mark token cookies `Secure`
    pub cookie_secure: bool,
    /// Argon2 cost parameters
    pub argon2: Argon2Settings,
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Google OAuth redirect URI (must point at `/auth/callback`)
    pub google_redirect_uri: String,

    // --- Secrets ---
    /// Signing key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// Signing key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Key for signing OAuth state values
    pub session_secret: Vec<u8>,
    /// Google OAuth client secret
    pub google_client_secret: String,
}

/// Argon2 cost parameters; `None` keeps the argon2 crate default.
#[derive(Debug, Clone, Default)]
pub struct Argon2Settings {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
    pub parallelism: Option<u32>,
}

impl Config {
    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            database_url: "postgres://localhost/authgate_test".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8000,
            jwt_algorithm: Algorithm::HS256,
            access_token_ttl_minutes: 15,
            refresh_token_ttl_minutes: 1440,
            authorizer_checks_session: false,
            cookie_secure: false,
            argon2: Argon2Settings {
                memory_kib: Some(1024),
                iterations: Some(1),
                parallelism: Some(1),
            },
            google_client_id: "test_client_id".to_string(),
            google_redirect_uri: "http://localhost:8000/auth/callback".to_string(),
            access_token_secret: b"test_access_key_32_bytes_minimum!".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimum".to_vec(),
            session_secret: b"test_session_key".to_vec(),
            google_client_secret: "test_secret".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let access_token_secret = required("JWT_SECRET_KEY")?.into_bytes();
        let refresh_token_secret = required("JWT_REFRESH_SECRET_KEY")?.into_bytes();
        if access_token_secret == refresh_token_secret {
            return Err(ConfigError::Invalid {
                name: "JWT_REFRESH_SECRET_KEY",
                reason: "must differ from JWT_SECRET_KEY".to_string(),
            });
        }

        let jwt_algorithm = match lookup("ALGORITHM") {
            Some(raw) => parse_algorithm(raw.trim())?,
            None => Algorithm::HS256,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            port: parse_or("PORT", lookup("PORT"), 8000)?,
            jwt_algorithm,
            access_token_ttl_minutes: parse_positive(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                lookup("ACCESS_TOKEN_EXPIRE_MINUTES"),
                15,
            )?,
            refresh_token_ttl_minutes: parse_positive(
                "REFRESH_TOKEN_EXPIRE_MINUTES",
                lookup("REFRESH_TOKEN_EXPIRE_MINUTES"),
                60 * 24,
            )?,
            authorizer_checks_session: parse_bool(
                "AUTHORIZER_CHECKS_SESSION",
                lookup("AUTHORIZER_CHECKS_SESSION"),
                false,
            )?,
            cookie_secure: parse_bool("COOKIE_SECURE", lookup("COOKIE_SECURE"), true)?,
            argon2: Argon2Settings {
                memory_kib: parse_optional("ARGON2_MEMORY_KIB", lookup("ARGON2_MEMORY_KIB"))?,
                iterations: parse_optional("ARGON2_ITERATIONS", lookup("ARGON2_ITERATIONS"))?,
                parallelism: parse_optional("ARGON2_PARALLELISM", lookup("ARGON2_PARALLELISM"))?,
            },
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            google_redirect_uri: required("GOOGLE_REDIRECT_URI")?,
            access_token_secret,
            refresh_token_secret,
            session_secret: required("SESSION_SECRET_KEY")?.into_bytes(),
            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
        })
    }
}

fn parse_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = Algorithm::from_str(raw).map_err(|_| ConfigError::Invalid {
        name: "ALGORITHM",
        reason: format!("unknown algorithm {raw}"),
    })?;

    // Both token types are signed with shared secrets.
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => Err(ConfigError::Invalid {
            name: "ALGORITHM",
            reason: format!("{other:?} is not an HMAC algorithm"),
        }),
    }
}

fn parse_optional<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigError> {
    raw.map(|v| {
        v.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("cannot parse {v:?}"),
        })
    })
    .transpose()
}

fn parse_or<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_optional(name, raw)?.unwrap_or(default))
}

fn parse_positive(name: &'static str, raw: Option<String>, default: i64) -> Result<i64, ConfigError> {
    let value = parse_or(name, raw, default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be a positive number of minutes".to_string(),
        });
    }
    if chrono::Duration::try_minutes(value).is_none() {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("{value} minutes is out of range"),
        });
    }
    Ok(value)
}

fn parse_bool(name: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                reason: format!("expected a boolean, got {v:?}"),
            }),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
