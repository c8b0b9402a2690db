// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect provider client
//!
//! This module talks to the identity provider on behalf of the login flow:
//!
//! - [`discovery`] fetches and checks the provider metadata
//! - [`jwks`] caches the provider signing keys
//! - [`client`] builds authorization and logout URLs, exchanges authorization
//!   codes and verifies ID tokens
//! - [`token`] holds the token endpoint response and the verified claims
//!
//! The login flow only sees the [`IdentityProvider`] trait, so tests can swap
//! the network-backed [`ProviderClient`] for a double.

pub mod client;
pub mod discovery;
pub mod jwks;
pub mod token;

use async_trait::async_trait;
use url::Url;

use crate::error::AuthError;

pub use client::ProviderClient;
pub use discovery::ProviderMetadata;
pub use jwks::JwksCache;
pub use token::{IdentityClaims, TokenResponse};

/// Operations the login flow needs from an OpenID Connect provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization endpoint URL carrying `state`. Performs no I/O.
    fn authorization_url(&self, state: &str) -> Url;

    /// Redeem an authorization code at the token endpoint
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AuthError>;

    /// Verify the ID token of a token response and return its claims
    async fn verify_id_token(&self, token: &TokenResponse) -> Result<IdentityClaims, AuthError>;

    /// Provider logout URL sending the browser back to `return_to`
    fn logout_url(&self, return_to: &str) -> Result<Url, AuthError>;
}
