//! Error types for authentication operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failure modes of login and token verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token was never issued or has been revoked.
    #[error("Session not found")]
    SessionNotFound,

    /// Token lifetime has elapsed.
    #[error("Session has expired")]
    SessionExpired,

    /// Stored password hash could not be parsed or produced.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Backing store failed.
    #[error("Credential store error: {0}")]
    Store(String),

    /// Internal server error (should not be exposed to users).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Returns `true` if the caller should simply log in again.
    ///
    /// # Examples
    ///
    /// ```
    /// # use helpdesk_auth::AuthError;
    /// assert!(AuthError::SessionExpired.is_unauthenticated());
    /// assert!(!AuthError::Store("down".into()).is_unauthenticated());
    /// ```
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::SessionNotFound | Self::SessionExpired
        )
    }
}
