//! Application state shared by every handler.

use crate::admin::AdminService;
use crate::articles::{ArticleEngine, PublishedAtPolicy};
use crate::store::{DirectoryCredentials, RecordStore};
use crate::tickets::TicketEngine;
use helpdesk_auth::{Authenticator, InMemorySessionStore};
use helpdesk_core::environment::{Clock, IdGenerator};
use std::sync::Arc;

/// The identity provider used by the server.
pub type HelpdeskAuthenticator = Authenticator<DirectoryCredentials, InMemorySessionStore>;

/// Application state, cloned (cheaply, via `Arc`) into each request.
#[derive(Clone)]
pub struct AppState {
    /// Record store, for readiness checks
    pub store: Arc<dyn RecordStore>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Login and bearer tokens
    pub auth: Arc<HelpdeskAuthenticator>,
    /// Ticket lifecycle
    pub tickets: TicketEngine,
    /// Knowledge base
    pub articles: ArticleEngine,
    /// Reference data and audit log
    pub admin: AdminService,
}

impl AppState {
    /// Wire the engines over one store.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        token_ttl: chrono::Duration,
        published_at_policy: PublishedAtPolicy,
    ) -> Self {
        let auth = Authenticator::new(
            DirectoryCredentials::new(Arc::clone(&store)),
            InMemorySessionStore::new(),
            Arc::clone(&clock),
            token_ttl,
        );

        Self {
            tickets: TicketEngine::new(Arc::clone(&store), Arc::clone(&clock), Arc::clone(&ids)),
            articles: ArticleEngine::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&ids),
                published_at_policy,
            ),
            admin: AdminService::new(Arc::clone(&store), Arc::clone(&clock), ids),
            auth: Arc::new(auth),
            store,
            clock,
        }
    }
}
