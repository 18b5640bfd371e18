//! Credential lookup trait.

use crate::error::Result;
use crate::state::{Principal, UserId};

/// What a login needs to know about an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// The identity a successful login yields.
    pub principal: Principal,
    /// argon2 PHC hash of the password.
    pub password_hash: String,
}

/// Source of login credentials (the user directory).
pub trait CredentialStore: Send + Sync {
    /// Find credentials by exact email.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store fails. An unknown email is `Ok(None)`.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<Credentials>>> + Send;

    /// Current identity of user `id`, used to resolve a bearer session.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store fails. A deleted user is `Ok(None)`.
    fn find_by_id(&self, id: UserId) -> impl std::future::Future<Output = Result<Option<Principal>>> + Send;
}
