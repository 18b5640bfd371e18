//! In-process session store.
//!
//! Sessions live for the lifetime of the server process. The authenticator
//! deletes an expired entry when a request presents it.

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::Session;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Session store backed by a `HashMap` behind an async lock.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions (live or not yet swept).
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_session(&self, session: &Session) -> impl Future<Output = Result<()>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let session = session.clone();

        async move {
            let mut guard = sessions.write().await;
            if guard.contains_key(&session.token) {
                return Err(AuthError::Store("Session token already exists".to_string()));
            }
            guard.insert(session.token.clone(), session);
            Ok(())
        }
    }

    fn get_session(&self, token: &str) -> impl Future<Output = Result<Session>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let token = token.to_string();

        async move {
            sessions
                .read()
                .await
                .get(&token)
                .cloned()
                .ok_or(AuthError::SessionNotFound)
        }
    }

    fn delete_session(&self, token: &str) -> impl Future<Output = Result<()>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let token = token.to_string();

        async move {
            sessions.write().await.remove(&token);
            Ok(())
        }
    }
}
