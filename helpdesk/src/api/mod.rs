//! HTTP handlers.
//!
//! Handlers only translate: they pull the principal and request metadata out
//! of the request, call an engine, and map the result. Every rule lives in
//! the engines.

pub mod admin;
pub mod articles;
pub mod auth;
pub mod tickets;

use crate::audit::RequestContext;
use crate::error::HelpdeskError;
use crate::server::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use helpdesk_auth::Principal;
use helpdesk_web::{AppError, BearerToken, ClientIp, UserAgent};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

/// The authenticated caller, resolved from the bearer token.
///
/// Rejects with 401 when the token is missing, unknown, revoked or expired.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let principal = state
            .auth
            .verify_token(&token)
            .await
            .map_err(|err| AppError::from(HelpdeskError::from(err)))?;

        Ok(Self(principal))
    }
}

/// Client address and user agent, for the audit trail.
#[derive(Debug, Clone)]
pub struct RequestMeta(pub RequestContext);

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ClientIp(ip) = ClientIp::from_request_parts(parts, state).await?;
        let UserAgent(user_agent) = UserAgent::from_request_parts(parts, state).await?;

        Ok(Self(RequestContext {
            ip_address: ip.map(|ip| ip.to_string()),
            user_agent,
        }))
    }
}

/// Parse an optional query parameter, answering 422 for a bad value.
pub(crate) fn param<T>(params: &HashMap<String, String>, key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match params.get(key).map(String::as_str) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|err| AppError::validation(format!("invalid {key}: {err}"))),
    }
}
