// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the OIDC login server
//!
//! This module loads, overrides and validates the configuration of the server.
//! The configuration is backed by a YAML file validated against an embedded JSON
//! schema, then overridden by environment variables and command line arguments.
//!
//! ## Configuration Structure
//!
//! - `server`: network binding and optional TLS material
//! - `provider`: the identity provider domain and the OAuth2 client credentials
//! - `session`: the cookie secret and cookie policy
//!
//! ## Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `AUTH0_DOMAIN` | `provider.domain` |
//! | `AUTH0_CLIENT_ID` | `provider.client_id` |
//! | `AUTH0_CLIENT_SECRET` | `provider.client_secret` |
//! | `AUTH0_CALLBACK_URL` | `provider.callback_url` |
//! | `SECRET` | `session.secret` |
//!
//! ## Usage
//!
//! ```no_run
//! use rust_oidc_login::config::Config;
//!
//! let mut config = Config::from_file("config.yaml").unwrap();
//! config.apply_env();
//! config.apply_args(Some(3000), None);
//! config.validate().expect("incomplete configuration");
//! ```

pub mod provider;
pub mod server;
pub mod session;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub use provider::ProviderConfig;
pub use server::ServerConfig;
pub use session::SessionConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// Embedded JSON schema used to validate configuration files
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure
///
/// Every section falls back to its defaults when absent from the file. The
/// defaults deliberately leave the provider credentials and the session secret
/// empty so that [`Config::validate`] refuses to start an unconfigured server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the HTTP server.
    #[serde(default)]
    pub server: ServerConfig,

    /// Identity provider and OAuth2 client settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Cookie session settings.
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file failing schema
    /// validation or deserialization produces a `*.sample.yaml` next to it and
    /// an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Override values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override values from an arbitrary variable lookup
    ///
    /// Empty values are ignored so that an exported but blank variable does
    /// not wipe a value coming from the file.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(domain) = lookup("AUTH0_DOMAIN") {
            debug!("Overriding provider domain from environment: {}", domain);
            self.provider.domain = domain;
        }
        if let Some(client_id) = lookup("AUTH0_CLIENT_ID") {
            debug!("Overriding client id from environment: {}", client_id);
            self.provider.client_id = client_id;
        }
        if let Some(client_secret) = lookup("AUTH0_CLIENT_SECRET") {
            debug!("Overriding client secret from environment");
            self.provider.client_secret = client_secret;
        }
        if let Some(callback_url) = lookup("AUTH0_CALLBACK_URL") {
            debug!("Overriding callback URL from environment: {}", callback_url);
            self.provider.callback_url = callback_url;
        }
        if let Some(secret) = lookup("SECRET") {
            debug!("Overriding session secret from environment");
            self.session.secret = secret;
        }
    }

    /// Apply command line arguments to override configuration values
    pub fn apply_args(&mut self, port: Option<u16>, address: Option<String>) {
        if let Some(port) = port {
            debug!("Overriding port from command line: {}", port);
            self.server.port = port;
        }

        if let Some(address) = address {
            debug!("Overriding address from command line: {}", address);
            self.server.address = address;
        }
    }

    /// Check that everything needed to talk to the provider is present
    ///
    /// This runs before discovery so that a server with missing credentials
    /// never starts.
    pub fn validate(&self) -> Result<(), AuthError> {
        utils::validate_specific_rules(self).map_err(|e| AuthError::Config(format!("{:#}", e)))
    }
}
