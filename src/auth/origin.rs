// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use rocket::request::{FromRequest, Outcome};
use rocket::Request;

/// How the public scheme of a request is determined
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginPolicy {
    /// Honour `X-Forwarded-Proto: https` set by a TLS-terminating proxy
    pub trust_forwarded_proto: bool,
}

/// Scheme and host the browser used to reach this server
///
/// The scheme is `https` when Rocket serves TLS itself, or when the managed
/// [`OriginPolicy`] trusts a forwarded `https` protocol. The host is taken
/// verbatim from the `Host` header, port included, falling back to the
/// configured bind address.
///
/// # Usage in Routes
///
/// ```
/// use rocket::get;
/// use rust_oidc_login::auth::ClientOrigin;
///
/// #[get("/where")]
/// fn where_am_i(origin: ClientOrigin) -> String {
///     origin.to_string()
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOrigin {
    pub scheme: &'static str,
    pub host: String,
}

impl ClientOrigin {
    fn from_request_parts(req: &Request<'_>) -> Self {
        let policy = req
            .rocket()
            .state::<OriginPolicy>()
            .copied()
            .unwrap_or_default();

        let forwarded_https = policy.trust_forwarded_proto
            && req
                .headers()
                .get_one("X-Forwarded-Proto")
                .and_then(|value| value.split(',').next())
                .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
                .unwrap_or(false);

        let scheme = if req.rocket().config().tls_enabled() || forwarded_https {
            "https"
        } else {
            "http"
        };

        let host = req
            .host()
            .map(|host| host.to_string())
            .or_else(|| req.headers().get_one("Host").map(str::to_string))
            .unwrap_or_else(|| {
                let config = req.rocket().config();
                format!("{}:{}", config.address, config.port)
            });

        ClientOrigin { scheme, host }
    }
}

impl std::fmt::Display for ClientOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientOrigin {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(ClientOrigin::from_request_parts(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Header;
    use rocket::local::asynchronous::Client;
    use rocket::{get, routes};

    #[get("/origin")]
    fn origin(origin: ClientOrigin) -> String {
        origin.to_string()
    }

    async fn client(policy: OriginPolicy) -> Client {
        let rocket = rocket::custom(rocket::Config::debug_default())
            .manage(policy)
            .mount("/", routes![origin]);
        Client::tracked(rocket).await.unwrap()
    }

    #[rocket::async_test]
    async fn test_origin_uses_host_header() {
        let client = client(OriginPolicy::default()).await;
        let body = client
            .get("/origin")
            .header(Header::new("Host", "app.example.com:42069"))
            .dispatch()
            .await
            .into_string()
            .await
            .unwrap();
        assert_eq!(body, "http://app.example.com:42069");
    }

    #[rocket::async_test]
    async fn test_forwarded_proto_needs_opt_in() {
        let untrusted = client(OriginPolicy::default()).await;
        let body = untrusted
            .get("/origin")
            .header(Header::new("Host", "app.example.com"))
            .header(Header::new("X-Forwarded-Proto", "https"))
            .dispatch()
            .await
            .into_string()
            .await
            .unwrap();
        assert_eq!(body, "http://app.example.com");

        let trusted = client(OriginPolicy {
            trust_forwarded_proto: true,
        })
        .await;
        let body = trusted
            .get("/origin")
            .header(Header::new("Host", "app.example.com"))
            .header(Header::new("X-Forwarded-Proto", "https, http"))
            .dispatch()
            .await
            .into_string()
            .await
            .unwrap();
        assert_eq!(body, "https://app.example.com");
    }
}
