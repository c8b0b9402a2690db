// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust OIDC Login library
//!
//! Browser login against an OpenID Connect identity provider. A visitor is sent
//! to the provider with an anti-forgery `state`, comes back to `/callback` with
//! an authorization code, and ends up with a verified profile stored in an
//! encrypted session cookie.
//!
//! - [`config`]: YAML configuration with environment and command line overrides
//! - [`oidc`]: provider discovery, code exchange and ID token verification
//! - [`session`]: the cookie-backed session store
//! - [`auth`]: the login, callback and logout state machine
//! - [`server`]: the Rocket routes

pub mod auth;
pub mod config;
pub mod error;
pub mod oidc;
pub mod server;
pub mod session;

pub use error::AuthError;
