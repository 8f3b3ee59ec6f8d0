// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Third-party identity providers (OAuth 2.0 authorization code flow).
//!
//! The rest of the service only sees [`IdentityProvider`]: a URL to send
//! the browser to, and a code exchange that yields a verified email and
//! display name.

use crate::config::Config;
use anyhow::Context;
use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use std::time::Duration;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity asserted by an external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub email: String,
    pub name: String,
}

impl ExternalIdentity {
    /// Falls back to the local part of the email when no name was shared.
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        let email = email.into();
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        Self { email, name }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider login URL carrying `state`.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the user's identity.
    ///
    /// `Ok(None)` means the provider answered but gave no usable email.
    async fn exchange(&self, code: &str) -> anyhow::Result<Option<ExternalIdentity>>;
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Google user info from the OpenID Connect userinfo endpoint.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

/// Google sign-in.
pub struct GoogleProvider {
    client: ConfiguredClient,
    http_client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = BasicClient::new(ClientId::new(config.google_client_id.clone()))
            .set_client_secret(ClientSecret::new(config.google_client_secret.clone()))
            .set_auth_uri(AuthUrl::new(GOOGLE_AUTH_URL.to_string())?)
            .set_token_uri(TokenUrl::new(GOOGLE_TOKEN_URL.to_string())?)
            .set_redirect_uri(
                RedirectUrl::new(config.google_redirect_uri.clone())
                    .context("GOOGLE_REDIRECT_URI is not a valid URL")?,
            );

        // Redirects are disabled to prevent SSRF during the token exchange.
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building OAuth HTTP client")?;

        tracing::info!(
            redirect_uri = %config.google_redirect_uri,
            "Initialized Google identity provider"
        );

        Ok(Self {
            client,
            http_client,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str) -> String {
        let state = state.to_string();
        let (url, _) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url();
        url.to_string()
    }

    async fn exchange(&self, code: &str) -> anyhow::Result<Option<ExternalIdentity>> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http_client)
            .await
            .context("authorization code exchange failed")?;

        let info: GoogleUserInfo = self
            .http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .context("userinfo request failed")?
            .error_for_status()
            .context("userinfo request rejected")?
            .json()
            .await
            .context("userinfo response malformed")?;

        if info.email_verified == Some(false) {
            tracing::warn!("Google account email is not verified");
            return Ok(None);
        }

        Ok(info
            .email
            .filter(|e| !e.trim().is_empty())
            .map(|email| ExternalIdentity::new(email, info.name)))
    }
}

/// Provider with a fixed answer.
///
/// Intended for deterministic local/integration tests.
pub struct StaticIdentityProvider {
    identity: Option<ExternalIdentity>,
}

impl StaticIdentityProvider {
    pub fn new(identity: Option<ExternalIdentity>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://identity.invalid/authorize?state={state}")
    }

    async fn exchange(&self, code: &str) -> anyhow::Result<Option<ExternalIdentity>> {
        if code.is_empty() {
            anyhow::bail!("empty authorization code");
        }
        Ok(self.identity.clone())
    }
}
