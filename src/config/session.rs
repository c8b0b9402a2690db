// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cookie session configuration

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Default cookie name of the login session
pub const DEFAULT_COOKIE_NAME: &str = "auth-session";

/// Settings of the encrypted session cookie.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Secret key encrypting and authenticating the session cookie.
    ///
    /// Base64 encoding of 32 or 64 random bytes, for example the output of
    /// `openssl rand -base64 32`.
    #[serde(default)]
    pub secret: String,

    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Cookie lifetime in seconds.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: i64,
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

/// Thirty days
fn default_max_age_secs() -> i64 {
    86400 * 30
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            cookie_name: default_cookie_name(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("cookie_name", &self.cookie_name)
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

impl SessionConfig {
    /// Decoded length of the secret, if it is valid base64
    pub fn secret_len(&self) -> Option<usize> {
        base64::engine::general_purpose::STANDARD
            .decode(self.secret.trim())
            .ok()
            .map(|bytes| bytes.len())
    }
}
