//! HTTP error responses.
//!
//! Every failure leaves a handler as an [`AppError`]: a kind that fixes the
//! status code and machine-readable code, a client-facing message, and an
//! optional source that is logged but never sent.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// What went wrong, as far as the client is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, unknown or expired credentials
    Unauthorized,
    /// Authenticated but not allowed
    Forbidden,
    /// Entity does not exist or is hidden from the caller
    NotFound,
    /// Uniqueness rule violated
    Conflict,
    /// Operation not allowed in the entity's current status
    InvalidState,
    /// Malformed or out-of-range input
    Validation,
    /// Anything the client cannot fix
    Internal,
}

impl ErrorKind {
    /// Status code answered for this kind.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict | Self::InvalidState => StatusCode::CONFLICT,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Code carried in the response body.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::InvalidState => "INVALID_STATE",
            Self::Validation => "VALIDATION_ERROR",
            Self::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Error returned by handlers and extractors.
///
/// ```ignore
/// async fn handler() -> Result<Json<Ticket>, AppError> {
///     let ticket = store.find_ticket(id).await?
///         .ok_or_else(|| AppError::not_found("Ticket", id))?;
///     Ok(Json(ticket))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Error of `kind` with a client-facing message.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause; logged, never serialized.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 401
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// 403
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// 404 for `resource` `id`.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("{resource} with id {id} not found"))
    }

    /// 409 for a uniqueness violation.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// 409 for an operation the entity's status does not allow
    /// (publishing an archived article, ...).
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    /// 422
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// 500
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// The error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status this error answers with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.kind == ErrorKind::Internal {
            match &self.source {
                Some(source) => tracing::error!(message = %self.message, error = %source, "Request failed"),
                None => tracing::error!(message = %self.message, "Request failed"),
            }
        }

        let body = ErrorBody {
            code: self.code(),
            message: &self.message,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_code_and_message() {
        let err = AppError::not_found("Ticket", "123");
        assert_eq!(err.to_string(), "[NOT_FOUND] Ticket with id 123 not found");
    }

    #[test]
    fn kinds_map_to_statuses() {
        let cases = [
            (AppError::unauthorized("x"), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AppError::forbidden("x"), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (AppError::conflict("x"), StatusCode::CONFLICT, "CONFLICT"),
            (AppError::invalid_state("x"), StatusCode::CONFLICT, "INVALID_STATE"),
            (AppError::validation("x"), StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            (AppError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR"),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[tokio::test]
    async fn source_stays_out_of_the_body() {
        use http_body_util::BodyExt;

        let response = AppError::internal("An internal error occurred")
            .with_source(anyhow::anyhow!("connection refused"))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response
            .into_body()
            .collect()
            .await
            .map(http_body_util::Collected::to_bytes)
            .unwrap_or_default();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or_default();
        assert_eq!(body, serde_json::json!({
            "code": "INTERNAL_SERVER_ERROR",
            "message": "An internal error occurred"
        }));
    }
}
