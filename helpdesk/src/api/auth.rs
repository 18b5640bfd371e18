//! Login, logout and the current account.
//!
//! - POST /api/auth/login
//! - POST /api/auth/logout
//! - GET /api/auth/me

use super::AuthUser;
use crate::error::HelpdeskError;
use crate::server::AppState;
use crate::types::User;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use helpdesk_web::{AppError, BearerToken, WebResult};
use serde::{Deserialize, Serialize};

/// Login credentials.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Plain-text password
    pub password: String,
}

/// Issued bearer token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Token for `Authorization: Bearer`
    pub access_token: String,
    /// Always `bearer`
    pub token_type: &'static str,
    /// When the token stops working
    pub expires_at: DateTime<Utc>,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable message
    pub message: &'static str,
}

/// Exchange email and password for a bearer token.
///
/// ```bash
/// curl -X POST http://localhost:8000/api/auth/login \
///   -H "Content-Type: application/json" \
///   -d '{"email": "agent@example.com", "password": "s3cret"}'
/// ```
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> WebResult<Json<TokenResponse>> {
    let (_, issued) = state
        .auth
        .login(&request.email, &request.password)
        .await
        .map_err(|err| AppError::from(HelpdeskError::from(err)))?;

    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "bearer",
        expires_at: issued.expires_at,
    }))
}

/// Revoke the caller's token.
pub async fn logout(
    State(state): State<AppState>,
    _caller: AuthUser,
    BearerToken(token): BearerToken,
) -> WebResult<Json<MessageResponse>> {
    state
        .auth
        .revoke_token(&token)
        .await
        .map_err(|err| AppError::from(HelpdeskError::from(err)))?;

    Ok(Json(MessageResponse {
        message: "Successfully logged out",
    }))
}

/// The caller's account.
pub async fn me(State(state): State<AppState>, AuthUser(principal): AuthUser) -> WebResult<Json<User>> {
    Ok(Json(state.admin.me(&principal).await?))
}
