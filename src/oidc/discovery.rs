// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect provider discovery
//!
//! Fetches the provider metadata published at
//! `<issuer>/.well-known/openid-configuration` (OpenID Connect Discovery 1.0)
//! and checks that it describes the configured issuer.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AuthError;

/// Path of the discovery document relative to the issuer
pub const DISCOVERY_PATH: &str = ".well-known/openid-configuration";

/// OpenID Connect Discovery document
///
/// Only the fields this client uses are required; unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer Identifier asserted by the provider
    pub issuer: String,

    /// URL of the OAuth 2.0 Authorization Endpoint
    pub authorization_endpoint: String,

    /// URL of the OAuth 2.0 Token Endpoint
    pub token_endpoint: String,

    /// URL of the provider's JSON Web Key Set document
    pub jwks_uri: String,

    /// URL of the UserInfo Endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// URL of the RP-initiated logout endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,

    /// JWS algorithms the provider may use to sign ID tokens
    #[serde(default = "default_signing_algs")]
    pub id_token_signing_alg_values_supported: Vec<String>,

    /// Client authentication methods accepted at the token endpoint
    #[serde(default)]
    pub token_endpoint_auth_methods_supported: Vec<String>,

    /// Scopes the provider supports
    #[serde(default)]
    pub scopes_supported: Vec<String>,
}

fn default_signing_algs() -> Vec<String> {
    vec!["RS256".to_string()]
}

impl ProviderMetadata {
    /// Requested scopes the provider does not advertise
    ///
    /// Empty when the provider publishes no `scopes_supported` list.
    pub fn unadvertised_scopes<'a>(&self, scopes: &'a [String]) -> Vec<&'a str> {
        if self.scopes_supported.is_empty() {
            return Vec::new();
        }
        scopes
            .iter()
            .filter(|scope| !self.scopes_supported.contains(*scope))
            .map(String::as_str)
            .collect()
    }

    /// Whether the token endpoint accepts `client_secret_basic`
    ///
    /// Per Discovery 1.0 an absent list means `client_secret_basic` only.
    pub fn supports_basic_auth(&self) -> bool {
        self.token_endpoint_auth_methods_supported.is_empty()
            || self
                .token_endpoint_auth_methods_supported
                .iter()
                .any(|method| method == "client_secret_basic")
    }
}

/// Build the discovery URL of an issuer ending with `/`
pub fn discovery_url(issuer: &Url) -> Result<Url, AuthError> {
    issuer
        .join(DISCOVERY_PATH)
        .map_err(|e| AuthError::Discovery(format!("invalid issuer URL {}: {}", issuer, e)))
}

/// Fetch and check the discovery document of `issuer`
pub async fn discover(http: &reqwest::Client, issuer: &Url) -> Result<ProviderMetadata, AuthError> {
    let url = discovery_url(issuer)?;
    debug!("Fetching provider metadata from {}", url);

    let response = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| AuthError::Discovery(format!("HTTP error fetching {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(AuthError::Discovery(format!(
            "{} returned status {}",
            url,
            response.status()
        )));
    }

    let metadata: ProviderMetadata = response
        .json()
        .await
        .map_err(|e| AuthError::Discovery(format!("JSON parse error: {}", e)))?;

    if metadata.issuer != issuer.as_str() {
        return Err(AuthError::Discovery(format!(
            "issuer did not match the issuer returned by provider, expected {:?} got {:?}",
            issuer.as_str(),
            metadata.issuer
        )));
    }

    for (name, endpoint) in [
        ("authorization_endpoint", &metadata.authorization_endpoint),
        ("token_endpoint", &metadata.token_endpoint),
        ("jwks_uri", &metadata.jwks_uri),
    ] {
        Url::parse(endpoint)
            .map_err(|e| AuthError::Discovery(format!("invalid {} {:?}: {}", name, endpoint, e)))?;
    }

    info!(
        "Discovered provider {} (authorization: {}, token: {})",
        metadata.issuer, metadata.authorization_endpoint, metadata.token_endpoint
    );
    Ok(metadata)
}
