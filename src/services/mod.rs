// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod oauth;
pub mod password;
pub mod session;
pub mod token;

pub use oauth::{ExternalIdentity, GoogleProvider, IdentityProvider, StaticIdentityProvider};
pub use password::PasswordHasher;
pub use session::{SessionManager, Signup};
pub use token::{TokenCodec, TokenError, TokenKind};
