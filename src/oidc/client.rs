// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Network-backed OpenID Connect client
//!
//! [`ProviderClient`] is built once at startup by [`ProviderClient::discover`]
//! and shared by every request. It only holds immutable configuration, a
//! `reqwest` client and the signing key cache.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use super::discovery::{self, ProviderMetadata};
use super::jwks::JwksCache;
use super::token::{IdentityClaims, TokenResponse};
use super::IdentityProvider;
use crate::config::provider::{ProviderConfig, OPENID_SCOPE};
use crate::error::AuthError;

/// OAuth2 error body (RFC 6749 section 5.2)
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// How the client authenticates at the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthMethod {
    /// `client_secret_basic`: credentials in the Authorization header
    Basic,
    /// `client_secret_post`: credentials in the form body
    Post,
}

/// OpenID Connect relying party bound to one provider
pub struct ProviderClient {
    issuer: Url,
    client_id: String,
    client_secret: String,
    redirect_url: Url,
    scopes: Vec<String>,
    logout_path: String,
    clock_skew_secs: u64,
    authorization_endpoint: Url,
    token_endpoint: Url,
    auth_method: ClientAuthMethod,
    algorithms: Vec<Algorithm>,
    metadata: ProviderMetadata,
    jwks: JwksCache,
    http: reqwest::Client,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("issuer", &self.issuer.as_str())
            .field("client_id", &self.client_id)
            .field("redirect_url", &self.redirect_url.as_str())
            .field("scopes", &self.scopes)
            .field("auth_method", &self.auth_method)
            .field("algorithms", &self.algorithms)
            .finish()
    }
}

impl ProviderClient {
    /// Discover the provider described by `config` and build a client for it
    pub async fn discover(config: &ProviderConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("rust_oidc_login/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {}", e)))?;

        let issuer = config.issuer_url()?;
        let metadata = discovery::discover(&http, &issuer).await?;
        Self::new(config, metadata, http)
    }

    /// Build a client from metadata that has already been fetched
    pub fn new(
        config: &ProviderConfig,
        metadata: ProviderMetadata,
        http: reqwest::Client,
    ) -> Result<Self, AuthError> {
        let issuer = config.issuer_url()?;
        let redirect_url = config.redirect_url()?;

        let mut scopes = config.scopes.clone();
        if !scopes.iter().any(|scope| scope == OPENID_SCOPE) {
            warn!("Scope \"{}\" missing from configuration, adding it", OPENID_SCOPE);
            scopes.insert(0, OPENID_SCOPE.to_string());
        }
        let unadvertised = metadata.unadvertised_scopes(&scopes);
        if !unadvertised.is_empty() {
            warn!(
                "Scopes {:?} are not advertised by {}, the provider may ignore them",
                unadvertised, issuer
            );
        }

        let authorization_endpoint =
            parse_endpoint("authorization_endpoint", &metadata.authorization_endpoint)?;
        let token_endpoint = parse_endpoint("token_endpoint", &metadata.token_endpoint)?;

        let auth_method = if metadata.supports_basic_auth() {
            ClientAuthMethod::Basic
        } else if metadata
            .token_endpoint_auth_methods_supported
            .iter()
            .any(|method| method == "client_secret_post")
        {
            ClientAuthMethod::Post
        } else {
            return Err(AuthError::Discovery(format!(
                "no supported token endpoint auth method in {:?}",
                metadata.token_endpoint_auth_methods_supported
            )));
        };

        let algorithms = signing_algorithms(&metadata.id_token_signing_alg_values_supported);
        if algorithms.is_empty() {
            return Err(AuthError::Discovery(format!(
                "no supported asymmetric ID token signing algorithm in {:?}",
                metadata.id_token_signing_alg_values_supported
            )));
        }

        info!(
            "OIDC client {} ready for issuer {} (auth: {:?}, algorithms: {:?})",
            config.client_id, issuer, auth_method, algorithms
        );

        Ok(Self {
            issuer,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url,
            scopes,
            logout_path: config.logout_path.clone(),
            clock_skew_secs: config.clock_skew_secs,
            authorization_endpoint,
            token_endpoint,
            auth_method,
            algorithms,
            jwks: JwksCache::with_min_refresh_interval(
                metadata.jwks_uri.clone(),
                Duration::from_secs(config.jwks_min_refresh_secs),
            ),
            metadata,
            http,
        })
    }

    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn auth_method(&self) -> ClientAuthMethod {
        self.auth_method
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.clock_skew_secs;
        validation
    }
}

fn parse_endpoint(name: &str, endpoint: &str) -> Result<Url, AuthError> {
    Url::parse(endpoint)
        .map_err(|e| AuthError::Discovery(format!("invalid {} {:?}: {}", name, endpoint, e)))
}

/// Asymmetric algorithms among those advertised by the provider
///
/// Symmetric (`HS*`) algorithms would make the client secret a signing key,
/// and `none` does not parse into an [`Algorithm`].
pub fn signing_algorithms(advertised: &[String]) -> Vec<Algorithm> {
    advertised
        .iter()
        .filter_map(|name| Algorithm::from_str(name).ok())
        .filter(|alg| !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512))
        .collect()
}

fn request_error(endpoint: &str, e: reqwest::Error) -> AuthError {
    if e.is_timeout() || e.is_connect() {
        AuthError::ProviderUnavailable(format!("{} unreachable: {}", endpoint, e))
    } else {
        AuthError::TokenExchange(format!("request to {} failed: {}", endpoint, e))
    }
}

#[async_trait]
impl IdentityProvider for ProviderClient {
    fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_url.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state);
        url
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AuthError> {
        debug!("Exchanging authorization code at {}", self.token_endpoint);

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
        ];
        let mut request = self.http.post(self.token_endpoint.clone());
        match self.auth_method {
            ClientAuthMethod::Basic => {
                request = request.basic_auth(&self.client_id, Some(&self.client_secret));
            }
            ClientAuthMethod::Post => {
                form.push(("client_id", self.client_id.as_str()));
                form.push(("client_secret", self.client_secret.as_str()));
            }
        }

        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| request_error("token endpoint", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_error("token endpoint", e))?;

        if !status.is_success() {
            let reason = match serde_json::from_str::<OAuthErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("token endpoint returned status {}", status),
            };
            return Err(AuthError::TokenExchange(reason));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::TokenExchange(format!("invalid token response: {}", e)))?;
        if token.access_token.is_empty() {
            return Err(AuthError::TokenExchange(
                "token response has an empty access_token".to_string(),
            ));
        }

        debug!(
            "Token endpoint returned a {} token (expires in {:?}s)",
            token.token_type, token.expires_in
        );
        Ok(token)
    }

    async fn verify_id_token(&self, token: &TokenResponse) -> Result<IdentityClaims, AuthError> {
        let raw = token.id_token().ok_or(AuthError::MissingIdToken)?;

        let header = decode_header(raw)
            .map_err(|e| AuthError::TokenVerification(format!("malformed ID token: {}", e)))?;
        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::TokenVerification(format!(
                "signing algorithm {:?} not allowed",
                header.alg
            )));
        }

        let keys = self.jwks.keys_for(&self.http, header.kid.as_deref()).await?;
        let validation = self.validation(header.alg);

        let mut last_error = None;
        for key in &keys {
            match decode::<Map<String, Value>>(raw, &key.key, &validation) {
                Ok(data) => {
                    let claims = IdentityClaims::new(data.claims);
                    let subject = claims.subject().filter(|sub| !sub.is_empty()).ok_or_else(|| {
                        AuthError::TokenVerification("ID token has no subject".to_string())
                    })?;
                    debug!("Verified ID token for subject {}", subject);
                    return Ok(claims);
                }
                Err(e) => {
                    debug!("ID token rejected with key {:?}: {}", key.kid, e);
                    last_error = Some(e);
                }
            }
        }

        Err(AuthError::TokenVerification(match last_error {
            Some(e) => e.to_string(),
            None => "no key to verify the ID token".to_string(),
        }))
    }

    fn logout_url(&self, return_to: &str) -> Result<Url, AuthError> {
        let mut url = self.issuer.join(&self.logout_path).map_err(|e| {
            AuthError::Config(format!("invalid logout path {}: {}", self.logout_path, e))
        })?;
        url.query_pairs_mut()
            .append_pair("returnTo", return_to)
            .append_pair("client_id", &self.client_id);
        Ok(url)
    }
}
