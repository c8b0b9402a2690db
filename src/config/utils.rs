// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! Schema output and the validation rules the JSON schema cannot express.

use anyhow::{Context, Result};
use base64::Engine;
use log::debug;

use super::provider::OPENID_SCOPE;
use super::{Config, CONFIG_SCHEMA};

/// Output the embedded JSON schema to the console.
///
/// Called when the `--show-config-schema` flag is provided on the command line.
///
/// ### Example
///
/// ```bash
/// ./rust_oidc_login --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Characters allowed in a cookie name (RFC 6265 token)
fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// Validates the configuration against rules that aren't covered by the JSON schema.
///
/// ### Validation Rules
///
/// - **Provider**: domain, client id, client secret and callback URL are all set,
///   the issuer and callback URLs parse, and the scopes contain `openid`
/// - **Session**: the secret is base64 of 32 or 64 bytes and the cookie name is a
///   valid RFC 6265 token
/// - **TLS**: certificate and key are both present or both absent, and both are base64
/// - **Port Range**: the port is within 1-65534
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let provider = &config.provider;
    let issuer = provider.issuer_url()?;
    debug!("Issuer URL resolved to {}", issuer);

    if provider.client_id.trim().is_empty() {
        anyhow::bail!("provider client_id is not set");
    }
    if provider.client_secret.is_empty() {
        anyhow::bail!("provider client_secret is not set");
    }
    if provider.callback_url.trim().is_empty() {
        anyhow::bail!("provider callback_url is not set");
    }
    provider.redirect_url()?;

    if !provider.scopes.iter().any(|scope| scope == OPENID_SCOPE) {
        anyhow::bail!("provider scopes must include \"{}\"", OPENID_SCOPE);
    }
    if !provider.logout_path.starts_with('/') {
        anyhow::bail!("provider logout_path must start with '/'");
    }
    if !provider.landing_page.starts_with('/') {
        anyhow::bail!("provider landing_page must be a local path starting with '/'");
    }
    if provider.http_timeout_secs == 0 {
        anyhow::bail!("provider http_timeout_secs must be greater than zero");
    }

    let session = &config.session;
    if session.secret.is_empty() {
        anyhow::bail!("session secret is not set");
    }
    match session.secret_len() {
        Some(32) | Some(64) => {}
        Some(n) => anyhow::bail!(
            "session secret must decode to 32 or 64 bytes, got {}; use openssl rand -base64 32",
            n
        ),
        None => anyhow::bail!("session secret is not valid base64; use openssl rand -base64 32"),
    }
    if !is_valid_cookie_name(&session.cookie_name) {
        anyhow::bail!("invalid session cookie name: {:?}", session.cookie_name);
    }
    if session.max_age_secs <= 0 {
        anyhow::bail!("session max_age_secs must be positive");
    }

    let server = &config.server;
    if let Some(cert) = &server.cert {
        if server.key.is_none() {
            anyhow::bail!("SSL certificate provided without a key");
        }
        let _ = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
    }

    if let Some(key) = &server.key {
        if server.cert.is_none() {
            anyhow::bail!("SSL key provided without a certificate");
        }
        let _ = base64::engine::general_purpose::STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;
    }

    if server.port < 1 || server.port > 65534 {
        anyhow::bail!("Invalid port number: {}", server.port);
    }

    if !is_valid_ip_address(&server.address) {
        debug!("Potentially invalid address format: {}", server.address);
    }

    Ok(())
}
