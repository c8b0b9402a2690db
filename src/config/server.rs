// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP server configuration

use serde::{Deserialize, Serialize};

/// Configuration for the login web server.
///
/// For HTTPS, both `cert` and `key` must be provided as Base64-encoded PEM
/// files. If either is missing the server runs without TLS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The TCP port the server listens on. Valid range is 1-65534.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The network address the server binds to.
    #[serde(default = "default_address")]
    pub address: String,

    /// The server name reported in HTTP headers and logs.
    #[serde(default = "default_name")]
    pub name: String,

    /// SSL/TLS certificate in PEM format, Base64 encoded.
    #[serde(default)]
    pub cert: Option<String>,

    /// SSL/TLS private key in PEM format, Base64 encoded.
    #[serde(default)]
    pub key: Option<String>,

    /// Honor `X-Forwarded-Proto` when building the logout return URL.
    ///
    /// Only enable this behind a reverse proxy that sets the header.
    #[serde(default)]
    pub trust_forwarded_proto: bool,
}

fn default_port() -> u16 {
    8080
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_name() -> String {
    format!("OidcLoginServer/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            address: default_address(),
            name: default_name(),
            cert: None,
            key: None,
            trust_forwarded_proto: false,
        }
    }
}

impl ServerConfig {
    /// Whether both halves of the TLS material are configured
    pub fn tls_configured(&self) -> bool {
        self.cert.is_some() && self.key.is_some()
    }
}
