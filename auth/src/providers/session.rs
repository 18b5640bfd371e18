//! Session store trait.

use crate::error::Result;
use crate::state::Session;

/// Storage for live bearer sessions keyed by token.
pub trait SessionStore: Send + Sync {
    /// Store a new session.
    ///
    /// # Errors
    ///
    /// Returns error if the token already exists or the backend fails.
    fn create_session(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Look up a session by token.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::SessionNotFound`] for unknown tokens.
    fn get_session(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Session>> + Send;

    /// Remove a session. Removing an unknown token is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn delete_session(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
