// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authorization, response headers).

pub mod auth;
pub mod security;
pub mod timing;

pub use auth::{require_auth, AuthUser};
