// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Route handlers
//!
//! Thin adapters between Rocket and [`LoginFlow`]: they pass the cookie jar
//! and query parameters in and turn the returned URLs into `307` redirects.

use rocket::http::{CookieJar, Status};
use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{get, State};

use super::home::HomePage;
use crate::auth::{CallbackParams, ClientOrigin, LoginFlow};
use crate::error::AuthError;
use crate::oidc::IdentityClaims;

/// Start a login and send the browser to the provider
#[get("/login")]
pub fn login(flow: &State<LoginFlow>, cookies: &CookieJar<'_>) -> Result<Redirect, AuthError> {
    let url = flow.login(cookies)?;
    Ok(Redirect::temporary(url.to_string()))
}

/// Provider redirect target
#[get("/callback?<params..>")]
pub async fn callback(
    flow: &State<LoginFlow>,
    cookies: &CookieJar<'_>,
    params: CallbackParams,
) -> Result<Redirect, AuthError> {
    let landing = flow.callback(cookies, params).await?;
    Ok(Redirect::temporary(landing))
}

#[get("/logout")]
pub fn logout(
    flow: &State<LoginFlow>,
    cookies: &CookieJar<'_>,
    origin: ClientOrigin,
) -> Result<Redirect, AuthError> {
    let url = flow.logout(cookies, &origin.to_string())?;
    Ok(Redirect::temporary(url.to_string()))
}

/// Profile of the signed-in user, `null` when anonymous
#[get("/user")]
pub fn user(flow: &State<LoginFlow>, cookies: &CookieJar<'_>) -> Json<Option<IdentityClaims>> {
    Json(flow.current_user(cookies))
}

#[get("/")]
pub fn home(
    flow: &State<LoginFlow>,
    page: &State<HomePage>,
    cookies: &CookieJar<'_>,
) -> Result<RawHtml<String>, Status> {
    let profile = flow.current_user(cookies);
    page.render(profile.as_ref())
        .map(RawHtml)
        .map_err(|_| Status::InternalServerError)
}
