// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP server
//!
//! Builds the Rocket instance serving the login routes:
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | [`handlers::home`] |
//! | `GET /login` | [`handlers::login`] |
//! | `GET /callback` | [`handlers::callback`] |
//! | `GET /logout` | [`handlers::logout`] |
//! | `GET /user` | [`handlers::user`] |
//!
//! The session secret becomes the Rocket `secret_key`, which encrypts the
//! private session cookie. TLS material from the configuration is handed to
//! Rocket directly.

pub mod handlers;
pub mod home;

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use log::{debug, info};
use rocket::config::LogLevel;
use rocket::figment::Figment;
use rocket::{routes, Build, Rocket};

use crate::auth::{LoginFlow, OriginPolicy};
use crate::config::Config;
use crate::error::AuthError;
use crate::oidc::IdentityProvider;
use crate::session::CookieSessionStore;

use home::HomePage;

/// Rocket configuration derived from the server and session settings
pub fn rocket_figment(config: &Config) -> Result<Figment> {
    let mut figment = rocket::Config::figment()
        .merge(("ident", config.server.name.clone()))
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port))
        .merge(("log_level", LogLevel::Normal))
        .merge(("secret_key", config.session.secret.trim().to_string()));

    if let (Some(cert), Some(key)) = (&config.server.cert, &config.server.key) {
        debug!("SSL certificates found in configuration, enabling TLS");

        let cert_data = BASE64_STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
        let key_data = BASE64_STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;

        figment = figment
            .merge(("tls.certs", cert_data))
            .merge(("tls.key", key_data));

        info!("TLS enabled for web server");
    }

    Ok(figment)
}

/// Wire a provider into the login flow with the cookie session store
pub fn build_login_flow(config: &Config, provider: Arc<dyn IdentityProvider>) -> LoginFlow {
    let sessions = CookieSessionStore::new(&config.session, config.server.tls_configured());
    LoginFlow::new(
        provider,
        Arc::new(sessions),
        config.provider.landing_page.clone(),
    )
}

/// Build the Rocket instance serving `flow`
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use rust_oidc_login::{config::Config, oidc::ProviderClient, server};
///
/// # async fn run() -> anyhow::Result<()> {
/// let config = Config::from_file("config.yaml")?;
/// let provider = Arc::new(ProviderClient::discover(&config.provider).await?);
/// let flow = server::build_login_flow(&config, provider);
/// let rocket = server::build_rocket(server::rocket_figment(&config)?, &config, flow)?;
/// rocket.launch().await?;
/// # Ok(())
/// # }
/// ```
pub fn build_rocket(
    figment: Figment,
    config: &Config,
    flow: LoginFlow,
) -> Result<Rocket<Build>, AuthError> {
    let home = HomePage::new(config.server.name.clone())
        .map_err(|e| AuthError::Config(format!("invalid home page template: {}", e)))?;

    Ok(rocket::custom(figment)
        .mount(
            "/",
            routes![
                handlers::home,
                handlers::login,
                handlers::callback,
                handlers::logout,
                handlers::user,
            ],
        )
        .manage(flow)
        .manage(home)
        .manage(OriginPolicy {
            trust_forwarded_proto: config.server.trust_forwarded_proto,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oidc::{IdentityClaims, MockIdentityProvider, TokenResponse};
    use crate::session::{Session, SessionStore};
    use rocket::http::{CookieJar, Header, Status};
    use rocket::local::asynchronous::{Client, LocalResponse};
    use serde_json::json;
    use url::Url;

    const TEST_SECRET: &str = "cnVzdC1vaWRjLWxvZ2luLXRlc3Qtc2Vzc2lvbi1rZXk=";

    fn test_config() -> Config {
        let mut config = Config::default();
        config.session.secret = TEST_SECRET.to_string();
        config
    }

    fn test_figment() -> Figment {
        rocket::Config::figment()
            .merge(("address", "127.0.0.1"))
            .merge(("port", 0))
            .merge(("log_level", LogLevel::Off))
            .merge(("secret_key", TEST_SECRET))
    }

    fn authorize_url(state: &str) -> Url {
        Url::parse_with_params("https://idp.example.com/authorize", &[("state", state)]).unwrap()
    }

    fn claims() -> IdentityClaims {
        serde_json::from_value(json!({
            "sub": "auth0|123",
            "name": "Ada Lovelace",
            "nickname": "ada",
            "picture": "https://cdn.example.com/ada.png",
            "iss": "https://tenant.auth0.com/",
            "aud": "client-123",
            "exp": 4102444800u64
        }))
        .unwrap()
    }

    fn token() -> TokenResponse {
        serde_json::from_value(json!({
            "access_token": "access-abc",
            "token_type": "Bearer",
            "id_token": "header.payload.signature"
        }))
        .unwrap()
    }

    async fn client_with(provider: MockIdentityProvider) -> Client {
        let config = test_config();
        let flow = build_login_flow(&config, Arc::new(provider));
        let rocket = build_rocket(test_figment(), &config, flow).unwrap();
        Client::tracked(rocket).await.unwrap()
    }

    fn location(response: &LocalResponse<'_>) -> Url {
        Url::parse(response.headers().get_one("Location").unwrap()).unwrap()
    }

    fn state_of(url: &Url) -> String {
        url.query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap()
    }

    fn callback_uri(state: &str, code: &str) -> String {
        let state: String = url::form_urlencoded::byte_serialize(state.as_bytes()).collect();
        format!("/callback?state={}&code={}", state, code)
    }

    async fn start_login(client: &Client) -> String {
        let response = client.get("/login").dispatch().await;
        assert_eq!(response.status(), Status::TemporaryRedirect);
        state_of(&location(&response))
    }

    async fn current_user(client: &Client) -> serde_json::Value {
        let response = client.get("/user").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        response.into_json().await.unwrap()
    }

    #[rocket::async_test]
    async fn test_login_redirects_with_fresh_state() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_authorization_url()
            .times(2)
            .returning(authorize_url);
        let client = client_with(provider).await;

        let response = client.get("/login").dispatch().await;
        assert_eq!(response.status(), Status::TemporaryRedirect);
        assert!(response.cookies().get("auth-session").is_some());
        let first = state_of(&location(&response));
        assert_eq!(first.len(), 44);

        let second = start_login(&client).await;
        assert_ne!(first, second);
    }

    #[rocket::async_test]
    async fn test_state_mismatch_makes_no_provider_call() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_authorization_url().returning(authorize_url);
        provider.expect_exchange_code().times(0);
        provider.expect_verify_id_token().times(0);
        let client = client_with(provider).await;

        start_login(&client).await;
        let response = client.get(callback_uri("forged", "code")).dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(
            response.into_string().await.unwrap(),
            "Invalid state parameter"
        );
        assert_eq!(current_user(&client).await, serde_json::Value::Null);
    }

    #[rocket::async_test]
    async fn test_callback_without_login_is_rejected() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_exchange_code().times(0);
        let client = client_with(provider).await;

        let response = client.get(callback_uri("anything", "code")).dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client.get("/callback").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_mismatch_leaves_pending_state_usable() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_authorization_url().returning(authorize_url);
        provider
            .expect_exchange_code()
            .times(1)
            .returning(|_| Ok(token()));
        provider
            .expect_verify_id_token()
            .times(1)
            .returning(|_| Ok(claims()));
        let client = client_with(provider).await;

        let state = start_login(&client).await;
        let response = client.get(callback_uri("forged", "code")).dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client.get(callback_uri(&state, "code")).dispatch().await;
        assert_eq!(response.status(), Status::TemporaryRedirect);
    }

    #[rocket::async_test]
    async fn test_successful_login_stores_profile() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_authorization_url().returning(authorize_url);
        provider
            .expect_exchange_code()
            .withf(|code| code == "the-code")
            .times(1)
            .returning(|_| Ok(token()));
        provider
            .expect_verify_id_token()
            .withf(|token| token.access_token == "access-abc")
            .times(1)
            .returning(|_| Ok(claims()));
        let client = client_with(provider).await;

        let state = start_login(&client).await;
        let response = client.get(callback_uri(&state, "the-code")).dispatch().await;
        assert_eq!(response.status(), Status::TemporaryRedirect);
        assert_eq!(response.headers().get_one("Location"), Some("/"));

        let cookie = response.cookies().get_private("auth-session").unwrap();
        let session = Session::decode(cookie.value()).unwrap();
        assert_eq!(session.access_token.as_deref(), Some("access-abc"));
        assert_eq!(session.state, None);

        let user = current_user(&client).await;
        assert_eq!(user, serde_json::to_value(claims()).unwrap());

        let html = client
            .get("/")
            .dispatch()
            .await
            .into_string()
            .await
            .unwrap();
        assert!(html.contains("Welcome, Ada Lovelace"));
    }

    #[rocket::async_test]
    async fn test_failed_exchange_stores_nothing_and_consumes_state() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_authorization_url().returning(authorize_url);
        provider
            .expect_exchange_code()
            .times(1)
            .returning(|_| Err(AuthError::TokenExchange("invalid_grant".to_string())));
        provider.expect_verify_id_token().times(0);
        let client = client_with(provider).await;

        let state = start_login(&client).await;
        let response = client.get(callback_uri(&state, "expired")).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
        let cookie = response.cookies().get_private("auth-session").unwrap();
        let session = Session::decode(cookie.value()).unwrap();
        assert_eq!(session, Session::default());
        assert_eq!(current_user(&client).await, serde_json::Value::Null);

        // A consumed state cannot be replayed
        let response = client.get(callback_uri(&state, "expired")).dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_failed_verification_stores_nothing() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_authorization_url().returning(authorize_url);
        provider.expect_exchange_code().returning(|_| Ok(token()));
        provider
            .expect_verify_id_token()
            .returning(|_| Err(AuthError::TokenVerification("aud mismatch".to_string())));
        let client = client_with(provider).await;

        let state = start_login(&client).await;
        let response = client.get(callback_uri(&state, "code")).dispatch().await;
        assert_eq!(response.status(), Status::InternalServerError);
        assert_eq!(current_user(&client).await, serde_json::Value::Null);
    }

    #[rocket::async_test]
    async fn test_provider_error_and_missing_code() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_authorization_url().returning(authorize_url);
        provider.expect_exchange_code().times(0);
        let client = client_with(provider).await;

        let state = start_login(&client).await;
        let encoded: String = url::form_urlencoded::byte_serialize(state.as_bytes()).collect();
        let response = client
            .get(format!(
                "/callback?state={}&error=access_denied&error_description=User%20cancelled",
                encoded
            ))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
        assert!(response.into_string().await.unwrap().contains("access_denied"));

        let state = start_login(&client).await;
        let encoded: String = url::form_urlencoded::byte_serialize(state.as_bytes()).collect();
        let response = client
            .get(format!("/callback?state={}", encoded))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_provider_timeout_is_503() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_authorization_url().returning(authorize_url);
        provider
            .expect_exchange_code()
            .returning(|_| Err(AuthError::ProviderUnavailable("timeout".to_string())));
        let client = client_with(provider).await;

        let state = start_login(&client).await;
        let response = client.get(callback_uri(&state, "code")).dispatch().await;
        assert_eq!(response.status(), Status::ServiceUnavailable);
    }

    const PROVIDER_LOGOUT: &str = "https://tenant.auth0.com/v2/logout?returnTo=http%3A%2F%2Fapp.example.com%3A42069&client_id=client-123";

    fn expect_provider_logout(provider: &mut MockIdentityProvider) {
        provider
            .expect_logout_url()
            .withf(|return_to| return_to == "http://app.example.com:42069")
            .times(1)
            .returning(|return_to| {
                Ok(Url::parse_with_params(
                    "https://tenant.auth0.com/v2/logout",
                    &[("returnTo", return_to), ("client_id", "client-123")],
                )
                .unwrap())
            });
    }

    async fn logout(client: &Client) {
        let response = client
            .get("/logout")
            .header(Header::new("Host", "app.example.com:42069"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::TemporaryRedirect);
        assert_eq!(response.headers().get_one("Location"), Some(PROVIDER_LOGOUT));
    }

    #[rocket::async_test]
    async fn test_logout_redirects_to_provider_and_clears_session() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_authorization_url().returning(authorize_url);
        provider.expect_exchange_code().returning(|_| Ok(token()));
        provider.expect_verify_id_token().returning(|_| Ok(claims()));
        expect_provider_logout(&mut provider);
        let client = client_with(provider).await;

        let state = start_login(&client).await;
        client.get(callback_uri(&state, "code")).dispatch().await;
        assert_ne!(current_user(&client).await, serde_json::Value::Null);

        logout(&client).await;
        assert_eq!(current_user(&client).await, serde_json::Value::Null);
    }

    #[rocket::async_test]
    async fn test_logout_without_login_redirects_the_same() {
        let mut provider = MockIdentityProvider::new();
        expect_provider_logout(&mut provider);
        let client = client_with(provider).await;

        logout(&client).await;
        assert_eq!(current_user(&client).await, serde_json::Value::Null);
    }

    #[rocket::async_test]
    async fn test_anonymous_user_is_null() {
        let client = client_with(MockIdentityProvider::new()).await;
        assert_eq!(current_user(&client).await, serde_json::Value::Null);

        let html = client
            .get("/")
            .dispatch()
            .await
            .into_string()
            .await
            .unwrap();
        assert!(html.contains("href=\"/login\""));
    }

    struct FailingStore;

    impl SessionStore for FailingStore {
        fn load(&self, _jar: &CookieJar<'_>) -> Session {
            Session::default()
        }

        fn save(&self, _jar: &CookieJar<'_>, _session: &Session) -> Result<(), AuthError> {
            Err(AuthError::SessionPersist("store offline".to_string()))
        }

        fn clear(&self, _jar: &CookieJar<'_>) {}
    }

    #[rocket::async_test]
    async fn test_unsaved_state_fails_login() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_authorization_url().times(0);
        let flow = LoginFlow::new(Arc::new(provider), Arc::new(FailingStore), "/");
        let rocket = build_rocket(test_figment(), &test_config(), flow).unwrap();
        let client = Client::tracked(rocket).await.unwrap();

        let response = client.get("/login").dispatch().await;
        assert_eq!(response.status(), Status::InternalServerError);
        assert!(response.headers().get_one("Location").is_none());
    }

    #[rocket::async_test]
    async fn test_undecodable_cookie_is_an_empty_session() {
        let client = client_with(MockIdentityProvider::new()).await;
        let response = client
            .get("/user")
            .private_cookie(rocket::http::Cookie::new("auth-session", r#"{"v":7}"#))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.unwrap(), "null");
    }
}
