//! Login, token issuance and token verification.

use crate::error::{AuthError, Result};
use crate::password::verify_password_async;
use crate::providers::{CredentialStore, SessionStore};
use crate::state::{Principal, Session};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use helpdesk_core::environment::Clock;
use rand::RngCore;
use std::sync::Arc;

/// A freshly issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Opaque token for the `Authorization: Bearer` header.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Identity provider: checks passwords and manages bearer sessions.
pub struct Authenticator<C, S> {
    credentials: C,
    sessions: S,
    clock: Arc<dyn Clock>,
    token_ttl: Duration,
}

impl<C, S> Authenticator<C, S>
where
    C: CredentialStore,
    S: SessionStore,
{
    /// Create an authenticator issuing tokens valid for `token_ttl`.
    #[must_use]
    pub fn new(credentials: C, sessions: S, clock: Arc<dyn Clock>, token_ttl: Duration) -> Self {
        Self {
            credentials,
            sessions,
            clock,
            token_ttl,
        }
    }

    /// Check an email/password pair.
    ///
    /// Returns `Ok(None)` for an unknown email or a wrong password, so callers
    /// cannot tell the two apart.
    ///
    /// # Errors
    ///
    /// Returns error if the credential store fails or the stored hash is malformed.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Principal>> {
        let Some(credentials) = self.credentials.find_by_email(email).await? else {
            tracing::debug!("Login attempt for unknown email");
            return Ok(None);
        };

        if verify_password_async(password.to_string(), credentials.password_hash).await? {
            Ok(Some(credentials.principal))
        } else {
            tracing::debug!(user_id = %credentials.principal.id, "Login attempt with wrong password");
            Ok(None)
        }
    }

    /// Issue a new bearer token for `principal`.
    ///
    /// # Errors
    ///
    /// Returns error if the session store fails.
    pub async fn issue_token(&self, principal: &Principal) -> Result<IssuedToken> {
        let issued_at = self.clock.now();
        let session = Session {
            token: generate_token(),
            user_id: principal.id,
            issued_at,
            expires_at: issued_at + self.token_ttl,
        };

        self.sessions.create_session(&session).await?;
        tracing::info!(user_id = %principal.id, role = %principal.role, "Session issued");

        Ok(IssuedToken {
            token: session.token,
            expires_at: session.expires_at,
        })
    }

    /// Resolve a bearer token to the user's current principal.
    ///
    /// The user is looked up again on every call: a changed role or email
    /// takes effect on tokens already issued.
    ///
    /// # Errors
    ///
    /// - [`AuthError::SessionNotFound`]: unknown or revoked token, or the
    ///   user no longer exists (the session is removed)
    /// - [`AuthError::SessionExpired`]: token past its lifetime (and now removed)
    pub async fn verify_token(&self, token: &str) -> Result<Principal> {
        let session = self.sessions.get_session(token).await?;

        if !session.is_live(self.clock.now()) {
            self.sessions.delete_session(token).await?;
            return Err(AuthError::SessionExpired);
        }

        match self.credentials.find_by_id(session.user_id).await? {
            Some(principal) => Ok(principal),
            None => {
                tracing::info!(user_id = %session.user_id, "Dropping session of removed user");
                self.sessions.delete_session(token).await?;
                Err(AuthError::SessionNotFound)
            },
        }
    }

    /// Revoke a bearer token (logout).
    ///
    /// # Errors
    ///
    /// Returns error if the session store fails.
    pub async fn revoke_token(&self, token: &str) -> Result<()> {
        self.sessions.delete_session(token).await
    }

    /// Authenticate and issue a token in one step.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the email/password pair
    /// does not match, or any store error.
    pub async fn login(&self, email: &str, password: &str) -> Result<(Principal, IssuedToken)> {
        let principal = self
            .authenticate(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let issued = self.issue_token(&principal).await?;
        Ok((principal, issued))
    }
}

/// Generate a cryptographically secure random token.
///
/// Returns a 256-bit random token encoded as base64url (43 characters).
fn generate_token() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}
