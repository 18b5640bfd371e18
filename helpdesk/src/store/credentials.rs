//! Login credentials served from the user directory.

use super::RecordStore;
use crate::types::User;
use helpdesk_auth::{AuthError, CredentialStore, Credentials, Principal, UserId};
use std::future::Future;
use std::sync::Arc;

/// [`CredentialStore`] backed by the record store's users.
#[derive(Clone)]
pub struct DirectoryCredentials {
    store: Arc<dyn RecordStore>,
}

impl DirectoryCredentials {
    /// Read credentials from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

impl CredentialStore for DirectoryCredentials {
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = helpdesk_auth::Result<Option<Credentials>>> + Send {
        let store = Arc::clone(&self.store);
        let email = email.to_string();

        async move {
            let user = store
                .find_user_by_email(&email)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;

            Ok(user.map(|user| Credentials {
                principal: principal_of(&user),
                password_hash: user.password_hash,
            }))
        }
    }

    fn find_by_id(&self, id: UserId) -> impl Future<Output = helpdesk_auth::Result<Option<Principal>>> + Send {
        let store = Arc::clone(&self.store);

        async move {
            let user = store.find_user(id).await.map_err(|e| AuthError::Store(e.to_string()))?;
            Ok(user.as_ref().map(principal_of))
        }
    }
}

fn principal_of(user: &User) -> Principal {
    Principal {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}
