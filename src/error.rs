// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error taxonomy for the login flow
//!
//! Every failure of the login state machine is terminal for the current request.
//! [`AuthError`] carries the failure category and maps it onto the HTTP status
//! the browser receives. Nothing is retried automatically.

use std::io::Cursor;

use log::{error, warn};
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use thiserror::Error;

/// Failures of the OIDC login flow
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing or invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider metadata unreachable or malformed
    #[error("Provider discovery failed: {0}")]
    Discovery(String),

    /// The entropy source could not produce a state value
    #[error("Error generating random state: {0}")]
    StateGeneration(String),

    /// The callback `state` does not match the one stored in the session
    #[error("Invalid state parameter")]
    InvalidState,

    /// Bad or expired code, or the provider rejected the exchange
    #[error("Failed to exchange code for token: {0}")]
    TokenExchange(String),

    /// The provider did not answer within the configured timeout
    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The token response carries no `id_token` field
    #[error("No id_token field in oauth2 token")]
    MissingIdToken,

    /// Signature, audience, issuer or expiry check failed
    #[error("Failed to verify ID token: {0}")]
    TokenVerification(String),

    /// The session cookie could not be written
    #[error("Failed to save session: {0}")]
    SessionPersist(String),
}

impl AuthError {
    /// HTTP status used when the error reaches the browser
    pub fn status(&self) -> Status {
        match self {
            AuthError::InvalidState => Status::BadRequest,
            AuthError::TokenExchange(_) => Status::Unauthorized,
            AuthError::ProviderUnavailable(_) => Status::ServiceUnavailable,
            AuthError::Config(_)
            | AuthError::Discovery(_)
            | AuthError::StateGeneration(_)
            | AuthError::MissingIdToken
            | AuthError::TokenVerification(_)
            | AuthError::SessionPersist(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for AuthError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            error!("{} {} failed: {}", request.method(), request.uri(), self);
        } else {
            warn!("{} {} rejected: {}", request.method(), request.uri(), self);
        }

        let body = self.to_string();
        Response::build()
            .status(status)
            .header(ContentType::Plain)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
