// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Identity provider configuration
//!
//! Settings needed to reach the OpenID Connect provider and to authenticate
//! this application as an OAuth2 confidential client.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AuthError;

/// The OIDC scope that turns an OAuth2 request into an authentication request
pub const OPENID_SCOPE: &str = "openid";

/// OAuth2 client and provider settings.
///
/// `domain` is either a bare host name (`tenant.eu.auth0.com`), in which case the
/// issuer is `https://<domain>/`, or a full URL used verbatim as the issuer.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider domain or issuer URL.
    #[serde(default)]
    pub domain: String,

    /// OAuth2 client identifier. Also the expected `aud` of ID tokens.
    #[serde(default)]
    pub client_id: String,

    /// OAuth2 client secret used at the token endpoint.
    #[serde(default)]
    pub client_secret: String,

    /// Absolute URL of this application's `/callback` route.
    #[serde(default)]
    pub callback_url: String,

    /// Scopes requested at the authorization endpoint. Must contain `openid`.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Path of the provider logout endpoint, relative to the issuer.
    #[serde(default = "default_logout_path")]
    pub logout_path: String,

    /// Where the browser lands after a successful callback.
    #[serde(default = "default_landing_page")]
    pub landing_page: String,

    /// Timeout applied to every call made to the provider.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Accepted clock skew when checking `exp`.
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: u64,

    /// Minimum delay between two JWKS fetches caused by an unknown key id.
    #[serde(default = "default_jwks_min_refresh_secs")]
    pub jwks_min_refresh_secs: u64,
}

fn default_scopes() -> Vec<String> {
    vec![OPENID_SCOPE.to_string(), "profile".to_string()]
}

fn default_logout_path() -> String {
    "/v2/logout".to_string()
}

fn default_landing_page() -> String {
    "/".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_clock_skew_secs() -> u64 {
    60
}

fn default_jwks_min_refresh_secs() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            callback_url: String::new(),
            scopes: default_scopes(),
            logout_path: default_logout_path(),
            landing_page: default_landing_page(),
            http_timeout_secs: default_http_timeout_secs(),
            clock_skew_secs: default_clock_skew_secs(),
            jwks_min_refresh_secs: default_jwks_min_refresh_secs(),
        }
    }
}

/// Hides the client secret from logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("scopes", &self.scopes)
            .field("logout_path", &self.logout_path)
            .field("landing_page", &self.landing_page)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("jwks_min_refresh_secs", &self.jwks_min_refresh_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Issuer URL derived from `domain`, always ending with `/`
    pub fn issuer_url(&self) -> Result<Url, AuthError> {
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(AuthError::Config("provider domain is not set".to_string()));
        }

        let raw = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{}/", domain.trim_end_matches('/'))
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| AuthError::Config(format!("invalid provider domain {}: {}", raw, e)))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Parsed callback URL
    pub fn redirect_url(&self) -> Result<Url, AuthError> {
        let url = Url::parse(&self.callback_url).map_err(|e| {
            AuthError::Config(format!("invalid callback URL {}: {}", self.callback_url, e))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AuthError::Config(format!(
                "callback URL must use http or https, got {}",
                other
            ))),
        }
    }
}
