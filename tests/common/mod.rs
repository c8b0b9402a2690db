// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Fake OpenID Connect provider shared by the integration tests
#![allow(dead_code)]

use std::sync::Once;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use rust_oidc_login::config::ProviderConfig;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PROVIDER_KEY: &str = include_str!("../fixtures/provider_key.pem");
pub const ROGUE_KEY: &str = include_str!("../fixtures/rogue_key.pem");

pub const CLIENT_ID: &str = "client-123";
pub const CLIENT_SECRET: &str = "client-secret";
pub const CALLBACK_URL: &str = "http://localhost:8080/callback";

/// Base64 of a 32 byte key
pub const TEST_SECRET: &str = "cnVzdC1vaWRjLWxvZ2luLXRlc3Qtc2Vzc2lvbi1rZXk=";

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

/// Public JWK of a PKCS#1 private key
pub fn jwk(pem: &str, kid: &str) -> Value {
    let key = RsaPrivateKey::from_pkcs1_pem(pem).expect("valid RSA fixture");
    json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "kid": kid,
        "n": URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
        "e": URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
    })
}

/// RS256 JWT over `claims`
pub fn sign(claims: &Value, pem: &str, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("valid RSA fixture");
    encode(&header, claims, &key).expect("token signing")
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// wiremock server answering discovery, token and JWKS requests
pub struct FakeProvider {
    pub server: MockServer,
}

impl FakeProvider {
    pub async fn start() -> Self {
        setup();
        Self {
            server: MockServer::start().await,
        }
    }

    /// Issuer identifier, as the client derives it from the configured domain
    pub fn issuer(&self) -> String {
        format!("{}/", self.server.uri())
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            domain: self.server.uri(),
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
            callback_url: CALLBACK_URL.to_string(),
            http_timeout_secs: 5,
            ..ProviderConfig::default()
        }
    }

    pub fn discovery_document(&self) -> Value {
        let base = self.server.uri();
        json!({
            "issuer": self.issuer(),
            "authorization_endpoint": format!("{}/authorize", base),
            "token_endpoint": format!("{}/oauth/token", base),
            "jwks_uri": format!("{}/.well-known/jwks.json", base),
            "userinfo_endpoint": format!("{}/userinfo", base),
            "response_types_supported": ["code"],
            "id_token_signing_alg_values_supported": ["HS256", "RS256"],
            "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post"]
        })
    }

    pub async fn mount_discovery(&self) {
        self.mount_discovery_document(self.discovery_document()).await;
    }

    pub async fn mount_discovery_document(&self, document: Value) {
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_jwks(&self, keys: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint accepting `code` with HTTP Basic client credentials
    pub async fn mount_token(&self, code: &str, id_token: &str) {
        let credentials = STANDARD.encode(format!("{}:{}", CLIENT_ID, CLIENT_SECRET));
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("authorization", format!("Basic {}", credentials).as_str()))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains(format!("code={}", code).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-token-from-provider",
                "token_type": "Bearer",
                "expires_in": 86400,
                "id_token": id_token
            })))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint rejecting every code
    pub async fn mount_token_rejection(&self) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code"
            })))
            .mount(&self.server)
            .await;
    }

    /// Claims of a valid ID token for this provider
    pub fn claims(&self) -> Value {
        json!({
            "iss": self.issuer(),
            "aud": CLIENT_ID,
            "sub": "auth0|64f1b2",
            "name": "Grace Hopper",
            "nickname": "grace",
            "picture": "https://cdn.example.com/grace.png",
            "iat": now(),
            "exp": now() + 3600
        })
    }
}
