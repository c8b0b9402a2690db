// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Provider signing keys
//!
//! The provider publishes its ID token signing keys as a JSON Web Key Set
//! (RFC 7517) at `jwks_uri`. Keys are fetched on first use and cached. An ID
//! token referencing an unknown `kid` triggers one refetch, which is how key
//! rotation is picked up. Refetches are throttled.

use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{JwkSet, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use log::{debug, warn};
use tokio::sync::RwLock;

use crate::error::AuthError;

/// A signing key ready to verify signatures
#[derive(Clone)]
pub struct SigningKey {
    pub kid: Option<String>,
    pub key: DecodingKey,
}

struct CachedKeys {
    keys: Vec<SigningKey>,
    fetched_at: Instant,
}

/// Cache of the provider's JSON Web Key Set
pub struct JwksCache {
    jwks_uri: String,
    min_refresh_interval: Duration,
    keys: RwLock<Option<CachedKeys>>,
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("jwks_uri", &self.jwks_uri)
            .finish()
    }
}

impl JwksCache {
    /// `interval` is the minimum delay between two fetches
    /// triggered by unknown key ids
    pub fn with_min_refresh_interval(jwks_uri: impl Into<String>, interval: Duration) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            min_refresh_interval: interval,
            keys: RwLock::new(None),
        }
    }

    /// Keys able to verify a token signed with key id `kid`
    ///
    /// With a `kid`, at most one key is returned. Without one, every cached
    /// signing key is a candidate.
    pub async fn keys_for(
        &self,
        http: &reqwest::Client,
        kid: Option<&str>,
    ) -> Result<Vec<SigningKey>, AuthError> {
        {
            let cache = self.keys.read().await;
            if let Some(cached) = cache.as_ref() {
                let found = select(&cached.keys, kid);
                if !found.is_empty() {
                    return Ok(found);
                }
                if cached.fetched_at.elapsed() < self.min_refresh_interval {
                    return Err(unknown_key(kid));
                }
            }
        }

        debug!("Key {:?} not cached, fetching {}", kid, self.jwks_uri);
        let mut cache = self.keys.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref() {
            let found = select(&cached.keys, kid);
            if !found.is_empty() {
                return Ok(found);
            }
            if cached.fetched_at.elapsed() < self.min_refresh_interval {
                return Err(unknown_key(kid));
            }
        }

        let keys = fetch_keys(http, &self.jwks_uri).await?;
        let found = select(&keys, kid);
        *cache = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        if found.is_empty() {
            Err(unknown_key(kid))
        } else {
            Ok(found)
        }
    }
}

fn select(keys: &[SigningKey], kid: Option<&str>) -> Vec<SigningKey> {
    match kid {
        Some(kid) => keys
            .iter()
            .filter(|key| key.kid.as_deref() == Some(kid))
            .take(1)
            .cloned()
            .collect(),
        None => keys.to_vec(),
    }
}

fn unknown_key(kid: Option<&str>) -> AuthError {
    match kid {
        Some(kid) => AuthError::TokenVerification(format!("key with kid '{}' not found in JWKS", kid)),
        None => AuthError::TokenVerification("no signing keys available in JWKS".to_string()),
    }
}

/// Fetch the key set and keep the usable signing keys
async fn fetch_keys(http: &reqwest::Client, jwks_uri: &str) -> Result<Vec<SigningKey>, AuthError> {
    let response = http.get(jwks_uri).send().await.map_err(|e| {
        if e.is_timeout() {
            AuthError::ProviderUnavailable(format!("timeout fetching JWKS: {}", e))
        } else {
            AuthError::TokenVerification(format!("failed to fetch JWKS: {}", e))
        }
    })?;

    if !response.status().is_success() {
        return Err(AuthError::TokenVerification(format!(
            "JWKS endpoint returned status {}",
            response.status()
        )));
    }

    let set: JwkSet = response
        .json()
        .await
        .map_err(|e| AuthError::TokenVerification(format!("failed to parse JWKS: {}", e)))?;

    let keys = signing_keys(&set);
    debug!("Loaded {} signing keys from {}", keys.len(), jwks_uri);
    Ok(keys)
}

/// Convert a key set into decoding keys, skipping encryption and unusable keys
pub fn signing_keys(set: &JwkSet) -> Vec<SigningKey> {
    set.keys
        .iter()
        .filter(|jwk| !matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)))
        .filter_map(|jwk| match DecodingKey::from_jwk(jwk) {
            Ok(key) => Some(SigningKey {
                kid: jwk.common.key_id.clone(),
                key,
            }),
            Err(e) => {
                warn!(
                    "Failed to parse JWK {:?}, skipping: {}",
                    jwk.common.key_id, e
                );
                None
            }
        })
        .collect()
}
