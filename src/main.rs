// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the OIDC login server

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use rust_oidc_login::config::{self, Config};
use rust_oidc_login::oidc::ProviderClient;
use rust_oidc_login::server;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file, created with defaults when missing
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Listening port, overrides the configuration file
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Listening address, overrides the configuration file
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Validate a configuration file and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // .env is optional; real environment variables take precedence
    let dotenv_path = dotenv::dotenv().ok();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = dotenv_path {
        debug!("Loaded environment from {}", path.display());
    }

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        let mut config = Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        config.apply_env();
        config.validate()?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    config.apply_env();
    config.apply_args(args.port, args.address.clone());
    config.validate().context("Incomplete configuration")?;
    debug!("Effective provider configuration: {:?}", config.provider);

    let provider = ProviderClient::discover(&config.provider)
        .await
        .context("Identity provider discovery failed")?;
    let flow = server::build_login_flow(&config, Arc::new(provider));

    info!(
        "Starting web server on {}:{}",
        config.server.address, config.server.port
    );
    let figment = server::rocket_figment(&config)?;
    let rocket = server::build_rocket(figment, &config, flow)?;
    rocket.launch().await.context("Web server failed")?;

    info!("Web server stopped");
    Ok(())
}
