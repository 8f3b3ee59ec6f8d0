// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Argon2id password hashing.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=...`) with a random salt, so
//! the cost parameters travel with each stored digest and verification
//! keeps working after the configured costs change.

use crate::config::Argon2Settings;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;

/// Hashes and verifies passwords.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Digest of a random secret, hashed with the configured costs.
    /// Verified against whenever there is no real digest to check so
    /// that every failed login costs one full Argon2 run.
    decoy_digest: Arc<str>,
}

impl PasswordHasher {
    pub fn new(settings: &Argon2Settings) -> anyhow::Result<Self> {
        let defaults = Params::default();
        let params = Params::new(
            settings.memory_kib.unwrap_or(defaults.m_cost()),
            settings.iterations.unwrap_or(defaults.t_cost()),
            settings.parallelism.unwrap_or(defaults.p_cost()),
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 parameters: {}", e))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let decoy_digest = argon2
            .hash_password(uuid::Uuid::new_v4().as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash decoy password: {}", e))?
            .to_string();

        Ok(Self {
            argon2,
            decoy_digest: decoy_digest.into(),
        })
    }

    /// Digest to verify against when the account does not exist.
    pub fn decoy_digest(&self) -> &str {
        &self.decoy_digest
    }

    /// Hash `password` with a fresh salt.
    pub fn hash(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// `false` for a wrong password and for digests that do not parse,
    /// including the empty digest of OAuth-only accounts. An unparsable
    /// digest is still paid for with a run against the decoy.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => {
                if let Ok(decoy) = PasswordHash::new(&self.decoy_digest) {
                    let _ = self.argon2.verify_password(password.as_bytes(), &decoy);
                }
                false
            }
        }
    }
}
