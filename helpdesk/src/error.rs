//! Error taxonomy for the helpdesk engines.
//!
//! Every engine operation returns [`Result<T>`]. The HTTP layer maps each
//! variant to a status code through [`helpdesk_web::AppError`].

use crate::store::StoreError;
use helpdesk_auth::AuthError;
use helpdesk_web::AppError;
use thiserror::Error;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, HelpdeskError>;

/// Everything an engine operation can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HelpdeskError {
    /// Referenced entity does not exist (or must not be revealed).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (`Ticket`, `Article`, ...)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Input failed validation (empty title, unknown status name, ...).
    #[error("{0}")]
    Validation(String),

    /// Caller's role or relationship does not allow the action.
    #[error("{0}")]
    PermissionDenied(String),

    /// Uniqueness rule violated (duplicate email, duplicate SLA priority).
    #[error("{0}")]
    Conflict(String),

    /// Operation not allowed in the entity's current status.
    #[error("{0}")]
    InvalidState(String),

    /// Missing, unknown or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Record store failure.
    #[error("storage error: {0}")]
    Storage(StoreError),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HelpdeskError {
    /// Shorthand for [`HelpdeskError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`HelpdeskError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for [`HelpdeskError::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

impl From<StoreError> for HelpdeskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => Self::Conflict(format!("{what} already exists")),
            other => Self::Storage(other),
        }
    }
}

impl From<AuthError> for HelpdeskError {
    fn from(err: AuthError) -> Self {
        if err.is_unauthenticated() {
            Self::Unauthorized(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<HelpdeskError> for AppError {
    fn from(err: HelpdeskError) -> Self {
        match err {
            HelpdeskError::NotFound { entity, id } => Self::not_found(entity, id),
            HelpdeskError::Validation(message) => Self::validation(message),
            HelpdeskError::PermissionDenied(message) => Self::forbidden(message),
            HelpdeskError::Conflict(message) => Self::conflict(message),
            HelpdeskError::InvalidState(message) => Self::invalid_state(message),
            HelpdeskError::Unauthorized(message) => Self::unauthorized(message),
            HelpdeskError::Storage(source) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(source))
            },
            HelpdeskError::Internal(message) => {
                Self::internal("An internal error occurred").with_source(anyhow::anyhow!(message))
            },
        }
    }
}
