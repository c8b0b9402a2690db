// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session-bound login state machine
//!
//! ```text
//!  anonymous ──/login──▶ state stored ──/callback──▶ signed in
//!      ▲                     │  (state mismatch: 400,      │
//!      │                     │   session untouched)        │
//!      └──────────────/logout (session cleared)◀───────────┘
//! ```
//!
//! [`LoginFlow`] owns no HTTP details beyond the cookie jar: handlers pass in
//! the jar and the query parameters and turn the returned URLs into redirects.

use std::sync::Arc;

use log::{debug, info, warn};
use rocket::http::CookieJar;
use rocket::FromForm;
use url::Url;

use super::state::{generate_state, state_matches};
use crate::error::AuthError;
use crate::oidc::{IdentityClaims, IdentityProvider, TokenResponse};
use crate::session::SessionStore;

/// Query parameters the provider sends back to `/callback`
#[derive(Debug, Clone, Default, FromForm)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Login, callback, logout and current-user against one provider
pub struct LoginFlow {
    provider: Arc<dyn IdentityProvider>,
    sessions: Arc<dyn SessionStore>,
    landing_page: String,
}

impl LoginFlow {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionStore>,
        landing_page: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            sessions,
            landing_page: landing_page.into(),
        }
    }

    pub fn landing_page(&self) -> &str {
        &self.landing_page
    }

    /// Start an authorization request and return the provider URL to visit
    ///
    /// A state left by an earlier unfinished login is overwritten.
    pub fn login(&self, jar: &CookieJar<'_>) -> Result<Url, AuthError> {
        let state = generate_state()?;

        let mut session = self.sessions.load(jar);
        session.state = Some(state.clone());
        self.sessions.save(jar, &session)?;

        debug!("Login started, redirecting to the authorization endpoint");
        Ok(self.provider.authorization_url(&state))
    }

    /// Finish an authorization request and return the landing page path
    ///
    /// The state check happens before any call to the provider. Once the state
    /// matches it is consumed, whatever the outcome of the exchange.
    pub async fn callback(
        &self,
        jar: &CookieJar<'_>,
        params: CallbackParams,
    ) -> Result<String, AuthError> {
        let mut session = self.sessions.load(jar);

        let matched = match (params.state.as_deref(), session.state.as_deref()) {
            (Some(received), Some(stored)) => state_matches(received, stored),
            _ => false,
        };
        if !matched {
            warn!(
                "Callback rejected: state {} the session",
                if session.state.is_some() { "does not match" } else { "missing from" }
            );
            return Err(AuthError::InvalidState);
        }
        session.take_state();

        match self.redeem(&params).await {
            Ok((token, profile)) => {
                info!(
                    "User {} signed in",
                    profile.subject().unwrap_or("<unknown>")
                );
                session.sign_in(token.access_token, profile);
                self.sessions.save(jar, &session)?;
                Ok(self.landing_page.clone())
            }
            Err(e) => {
                session.access_token = None;
                session.profile = None;
                if let Err(save_error) = self.sessions.save(jar, &session) {
                    warn!("Could not persist consumed state: {}", save_error);
                }
                Err(e)
            }
        }
    }

    async fn redeem(
        &self,
        params: &CallbackParams,
    ) -> Result<(TokenResponse, IdentityClaims), AuthError> {
        if let Some(error) = &params.error {
            return Err(AuthError::TokenExchange(match &params.error_description {
                Some(description) => format!("provider returned {}: {}", error, description),
                None => format!("provider returned {}", error),
            }));
        }

        let code = params
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AuthError::TokenExchange("missing authorization code".to_string()))?;

        let token = self.provider.exchange_code(code).await?;
        let profile = self.provider.verify_id_token(&token).await?;
        Ok((token, profile))
    }

    /// Drop the local session and return the provider logout URL
    ///
    /// `return_to` is where the provider sends the browser afterwards, usually
    /// the origin of the current request.
    pub fn logout(&self, jar: &CookieJar<'_>, return_to: &str) -> Result<Url, AuthError> {
        self.sessions.clear(jar);
        let url = self.provider.logout_url(return_to)?;
        debug!("Logged out locally, returning through {}", return_to);
        Ok(url)
    }

    /// Profile of the signed-in user, if any
    pub fn current_user(&self, jar: &CookieJar<'_>) -> Option<IdentityClaims> {
        self.sessions.load(jar).profile
    }
}
