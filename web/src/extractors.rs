//! Request-part extractors shared by the handlers.
//!
//! `ClientIp` and `UserAgent` never reject; a missing value is `None` so the
//! audit trail can store NULL. `BearerToken` and `Pagination` reject with an
//! [`AppError`].

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{connect_info::ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// socket peer when the server was started with connect info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self(forwarded_ip(&parts.headers).or(peer)))
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header_value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header_value("x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .or_else(|| header_value("x-real-ip").and_then(|ip| ip.trim().parse().ok()))
}

/// `User-Agent` header, if the client sent a readable one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgent(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(Self(agent))
    }
}

/// Opaque token from `Authorization: Bearer <token>`.
///
/// Rejects with 401 when the header is missing or not a bearer credential.
/// Whether the token is valid is decided by the identity provider.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Expected a bearer token"))?;

        Ok(Self(token.to_string()))
    }
}

/// Raw `skip`/`limit` query parameters.
///
/// Only parses; defaults and the 1..=100 limit range belong to the query
/// layer. Non-numeric or negative values answer 422.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Rows to skip
    pub skip: Option<u64>,
    /// Maximum rows to return
    pub limit: Option<u64>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let mut pagination = Self::default();

        for pair in parts.uri.query().unwrap_or_default().split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let slot = match key {
                "skip" => &mut pagination.skip,
                "limit" => &mut pagination.limit,
                _ => continue,
            };
            let parsed = value
                .parse::<u64>()
                .map_err(|_| AppError::validation(format!("{key} must be a non-negative integer")))?;
            *slot = Some(parsed);
        }

        Ok(pagination)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    async fn extract<T: FromRequestParts<()>>(builder: axum::http::request::Builder) -> Result<T, T::Rejection> {
        T::from_request_parts(&mut parts(builder), &()).await
    }

    #[tokio::test]
    async fn client_ip_prefers_the_first_forwarded_hop() {
        let ip: ClientIp = extract(
            Request::builder()
                .header("X-Forwarded-For", "203.0.113.1, 198.51.100.1")
                .header("X-Real-IP", "198.51.100.42"),
        )
        .await
        .unwrap();
        assert_eq!(ip.0, Some("203.0.113.1".parse().unwrap()));

        let ip: ClientIp = extract(Request::builder().header("X-Real-IP", "198.51.100.42")).await.unwrap();
        assert_eq!(ip.0, Some("198.51.100.42".parse().unwrap()));
    }

    #[tokio::test]
    async fn client_ip_falls_back_to_the_peer() {
        let mut parts = parts(Request::builder().header("X-Forwarded-For", "garbage"));
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 9], 4711))));

        let ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip.0, Some("192.0.2.9".parse().unwrap()));

        let ip: ClientIp = extract(Request::builder()).await.unwrap();
        assert_eq!(ip.0, None);
    }

    #[tokio::test]
    async fn user_agent_is_optional() {
        let agent: UserAgent = extract(Request::builder().header(header::USER_AGENT, "curl/8.5")).await.unwrap();
        assert_eq!(agent.0.as_deref(), Some("curl/8.5"));

        let agent: UserAgent = extract(Request::builder()).await.unwrap();
        assert_eq!(agent.0, None);
    }

    #[tokio::test]
    async fn bearer_token_needs_the_bearer_scheme() {
        let token: BearerToken = extract(Request::builder().header(header::AUTHORIZATION, "Bearer abc123"))
            .await
            .unwrap();
        assert_eq!(token.0, "abc123");

        for value in ["Basic dXNlcjpwYXNz", "Bearer   "] {
            let rejection = extract::<BearerToken>(Request::builder().header(header::AUTHORIZATION, value))
                .await
                .unwrap_err();
            assert_eq!(rejection.code(), "UNAUTHORIZED");
        }

        let rejection = extract::<BearerToken>(Request::builder()).await.unwrap_err();
        assert_eq!(rejection.code(), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn pagination_reads_only_its_own_keys() {
        let page: Pagination = extract(Request::builder().uri("/api/tickets?status=OPEN&skip=50&limit=10"))
            .await
            .unwrap();
        assert_eq!(page, Pagination { skip: Some(50), limit: Some(10) });

        let page: Pagination = extract(Request::builder().uri("/api/tickets")).await.unwrap();
        assert_eq!(page, Pagination::default());
    }

    #[tokio::test]
    async fn pagination_rejects_negative_values() {
        let rejection = extract::<Pagination>(Request::builder().uri("/api/tickets?skip=-1"))
            .await
            .unwrap_err();
        assert_eq!(rejection.code(), "VALIDATION_ERROR");
    }
}
