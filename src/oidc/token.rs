// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token endpoint response and identity claims

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Successful response of the OAuth2 token endpoint (RFC 6749 section 5.1).
///
/// Fields outside the OAuth2 core are kept in `extra`; OIDC places the raw
/// ID token there under `id_token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    #[serde(default)]
    pub token_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenResponse {
    /// Raw ID token carried in the `id_token` extension field
    pub fn id_token(&self) -> Option<&str> {
        self.extra
            .get("id_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
    }
}

/// Claims decoded from a verified ID token.
///
/// The map stays open since providers add their own claims. Once verified,
/// `sub`, `iss`, `aud` and `exp` are always present; `name`, `nickname`,
/// `email` and `picture` depend on the requested scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityClaims(Map<String, Value>);

impl IdentityClaims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Subject identifier of the end user
    pub fn subject(&self) -> Option<&str> {
        self.str_claim("sub")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_claim("name")
    }

    pub fn nickname(&self) -> Option<&str> {
        self.str_claim("nickname")
    }

    pub fn email(&self) -> Option<&str> {
        self.str_claim("email")
    }

    pub fn picture(&self) -> Option<&str> {
        self.str_claim("picture")
    }

    /// Best label for display: name, then nickname, then email, then subject
    pub fn display_name(&self) -> Option<&str> {
        self.name()
            .or_else(|| self.nickname())
            .or_else(|| self.email())
            .or_else(|| self.subject())
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    fn str_claim(&self, claim: &str) -> Option<&str> {
        self.0.get(claim).and_then(Value::as_str)
    }
}
