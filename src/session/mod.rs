// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Browser session storage
//!
//! The login flow keeps three values between requests: the pending `state` of
//! an authorization request, the access token and the verified profile. They
//! live in a [`Session`] serialized as JSON inside one Rocket private cookie,
//! which is encrypted and authenticated with the Rocket secret key.
//!
//! ## Cookie format
//!
//! ```json
//! { "v": 1, "state": "...", "access_token": "...", "profile": { "sub": "..." } }
//! ```
//!
//! A cookie that fails to decrypt, fails to parse or carries another version
//! loads as an empty session.
//!
//! Browsers drop cookies whose `name=value` pair exceeds [`MAX_COOKIE_BYTES`]
//! without reporting it, so [`CookieSessionStore::save`] refuses payloads
//! whose sealed cookie could exceed it.

use log::{debug, warn};
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::time::Duration;
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::oidc::IdentityClaims;

/// Version written in every session cookie
pub const SESSION_VERSION: u32 = 1;

/// Browser limit for the `name=value` pair of one cookie
pub const MAX_COOKIE_BYTES: usize = 4096;

// AES-GCM nonce and tag added to private cookies
const SEAL_OVERHEAD: usize = 12 + 16;

/// Upper bound of the `name=value` length written in `Set-Cookie` for a
/// private cookie holding `payload_len` bytes
///
/// The sealed value is standard base64 of nonce, ciphertext and tag.
/// `Set-Cookie` percent-encodes the `=` padding and every `/`, three bytes
/// each. Random base64 carries one `/` in 64 characters on average; the bound
/// allows one in eight.
pub fn sealed_cookie_len(name: &str, payload_len: usize) -> usize {
    let base64_len = (payload_len + SEAL_OVERHEAD).div_ceil(3) * 4;
    let escapes = 2 + base64_len / 8;
    name.len() + 1 + base64_len + 2 * escapes
}

/// Largest payload whose sealed cookie named `name` fits [`MAX_COOKIE_BYTES`]
pub fn max_payload_len(name: &str) -> usize {
    (0..MAX_COOKIE_BYTES)
        .take_while(|&len| sealed_cookie_len(name, len) <= MAX_COOKIE_BYTES)
        .last()
        .unwrap_or(0)
}

/// Data bound to one browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub v: u32,

    /// Anti-forgery value of the pending authorization request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Claims of the verified ID token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<IdentityClaims>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            v: SESSION_VERSION,
            state: None,
            access_token: None,
            profile: None,
        }
    }
}

impl Session {
    /// Remove and return the pending state
    pub fn take_state(&mut self) -> Option<String> {
        self.state.take()
    }

    /// Record a successful login
    pub fn sign_in(&mut self, access_token: String, profile: IdentityClaims) {
        self.access_token = Some(access_token);
        self.profile = Some(profile);
    }

    pub fn is_authenticated(&self) -> bool {
        self.profile.is_some()
    }

    pub fn encode(&self) -> Result<String, AuthError> {
        serde_json::to_string(self)
            .map_err(|e| AuthError::SessionPersist(format!("serialization failed: {}", e)))
    }

    /// Parse a stored session, `None` when unreadable or from another version
    pub fn decode(payload: &str) -> Option<Session> {
        match serde_json::from_str::<Session>(payload) {
            Ok(session) if session.v == SESSION_VERSION => Some(session),
            Ok(session) => {
                warn!("Ignoring session with unsupported version {}", session.v);
                None
            }
            Err(e) => {
                warn!("Ignoring undecodable session: {}", e);
                None
            }
        }
    }
}

/// Persistence of a [`Session`] across requests of the same browser
pub trait SessionStore: Send + Sync {
    /// Current session, empty when none is stored
    fn load(&self, jar: &CookieJar<'_>) -> Session;

    fn save(&self, jar: &CookieJar<'_>, session: &Session) -> Result<(), AuthError>;

    fn clear(&self, jar: &CookieJar<'_>);
}

/// [`SessionStore`] backed by an encrypted Rocket private cookie
#[derive(Debug, Clone)]
pub struct CookieSessionStore {
    cookie_name: String,
    max_payload: usize,
    max_age: Duration,
    secure: bool,
}

impl CookieSessionStore {
    /// `secure` marks the cookie `Secure`, for servers reached over TLS
    pub fn new(config: &SessionConfig, secure: bool) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
            max_payload: max_payload_len(&config.cookie_name),
            max_age: Duration::seconds(config.max_age_secs),
            secure,
        }
    }

    /// Largest serialized session this store writes
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}

impl SessionStore for CookieSessionStore {
    fn load(&self, jar: &CookieJar<'_>) -> Session {
        match jar.get_private(&self.cookie_name) {
            Some(cookie) => Session::decode(cookie.value()).unwrap_or_default(),
            None => {
                debug!("No {} cookie, starting an empty session", self.cookie_name);
                Session::default()
            }
        }
    }

    fn save(&self, jar: &CookieJar<'_>, session: &Session) -> Result<(), AuthError> {
        let payload = session.encode()?;
        if payload.len() > self.max_payload {
            return Err(AuthError::SessionPersist(format!(
                "session is {} bytes, limit for cookie {} is {}",
                payload.len(),
                self.cookie_name,
                self.max_payload
            )));
        }

        let mut cookie = Cookie::new(self.cookie_name.clone(), payload);
        cookie.set_http_only(true);
        // Lax so the cookie comes back on the top-level redirect from the provider
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_max_age(self.max_age);
        cookie.set_secure(self.secure);
        jar.add_private(cookie);
        Ok(())
    }

    fn clear(&self, jar: &CookieJar<'_>) {
        let mut cookie = Cookie::new(self.cookie_name.clone(), "");
        cookie.set_path("/");
        jar.remove_private(cookie);
    }
}
