//! Audit recorder.
//!
//! Mutating engine operations describe an audit append as an effect. The
//! effect runs after the mutation has been persisted; if the append fails
//! the failure is logged and counted, and the request still succeeds.

use crate::metrics;
use crate::store::RecordStore;
use crate::types::AuditEntryId;
use chrono::{DateTime, Utc};
use helpdesk_auth::UserId;
use helpdesk_core::effect::Effect;
use helpdesk_core::environment::{Clock, IdGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Ticket raised
    TicketCreated,
    /// Ticket status changed
    StatusChanged,
    /// Ticket assignee/team overwritten
    TicketAssigned,
    /// Comment posted on a ticket
    CommentAdded,
    /// Ticket fields edited
    TicketUpdated,
    /// Article drafted
    ArticleCreated,
    /// Article fields edited
    ArticleUpdated,
    /// Article published
    ArticlePublished,
    /// Article returned to draft
    ArticleUnpublished,
    /// Article retired
    ArticleArchived,
}

impl AuditAction {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TicketCreated => "TICKET_CREATED",
            Self::StatusChanged => "STATUS_CHANGED",
            Self::TicketAssigned => "TICKET_ASSIGNED",
            Self::CommentAdded => "COMMENT_ADDED",
            Self::TicketUpdated => "TICKET_UPDATED",
            Self::ArticleCreated => "ARTICLE_CREATED",
            Self::ArticleUpdated => "ARTICLE_UPDATED",
            Self::ArticlePublished => "ARTICLE_PUBLISHED",
            Self::ArticleUnpublished => "ARTICLE_UNPUBLISHED",
            Self::ArticleArchived => "ARTICLE_ARCHIVED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = crate::error::HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| crate::error::HelpdeskError::validation(format!("invalid audit action: {s}")))
    }
}

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// A ticket
    Ticket,
    /// A knowledge article
    Article,
}

impl EntityType {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ticket => "TICKET",
            Self::Article => "ARTICLE",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = crate::error::HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TICKET" => Ok(Self::Ticket),
            "ARTICLE" => Ok(Self::Article),
            other => Err(crate::error::HelpdeskError::validation(format!(
                "invalid entity type: {other}"
            ))),
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Identity
    pub id: AuditEntryId,
    /// Who acted
    pub actor_id: UserId,
    /// What happened
    pub action: AuditAction,
    /// Kind of entity touched
    pub entity_type: EntityType,
    /// Entity touched
    pub entity_id: Uuid,
    /// Action-specific details
    pub metadata: Value,
    /// Client address, when known
    pub ip_address: Option<String>,
    /// Client user agent, when known
    pub user_agent: Option<String>,
    /// When it happened
    pub created_at: DateTime<Utc>,
}

/// Where a request came from. Copied into audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Client address
    pub ip_address: Option<String>,
    /// Client user agent
    pub user_agent: Option<String>,
}

/// Builds audit-append effects.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl AuditRecorder {
    /// Create a recorder appending to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, clock, ids }
    }

    /// Describe appending one entry.
    ///
    /// The entry is stamped now; it is written when the effect runs.
    pub fn record<A>(
        &self,
        actor_id: UserId,
        context: &RequestContext,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: Uuid,
        metadata: Value,
    ) -> Effect<A>
    where
        A: Send + 'static,
    {
        let entry = AuditEntry {
            id: AuditEntryId::from_uuid(self.ids.next_id()),
            actor_id,
            action,
            entity_type,
            entity_id,
            metadata,
            ip_address: context.ip_address.clone(),
            user_agent: context.user_agent.clone(),
            created_at: self.clock.now(),
        };
        let store = Arc::clone(&self.store);

        Effect::future(async move {
            match store.append_audit(&entry).await {
                Ok(()) => {
                    tracing::debug!(
                        action = %entry.action,
                        entity_type = %entry.entity_type,
                        entity_id = %entry.entity_id,
                        "Audit entry appended"
                    );
                },
                Err(error) => {
                    tracing::error!(
                        action = %entry.action,
                        entity_id = %entry.entity_id,
                        error = %error,
                        "Failed to append audit entry"
                    );
                    metrics::record_audit_failure(entry.action);
                },
            }
            None
        })
    }
}

impl fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditRecorder").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::query::{AuditFilter, PageRequest};
    use crate::store::{AuditStore, InMemoryStore};
    use helpdesk_runtime::execute_effects;
    use helpdesk_testing::{SequentialIdGenerator, test_clock};
    use serde_json::json;

    #[test]
    fn action_names() {
        assert_eq!(AuditAction::StatusChanged.to_string(), "STATUS_CHANGED");
        assert_eq!("ARTICLE_ARCHIVED".parse::<AuditAction>(), Ok(AuditAction::ArticleArchived));
        assert!("DELETED".parse::<AuditAction>().is_err());
        assert_eq!("TICKET".parse::<EntityType>(), Ok(EntityType::Ticket));
    }

    #[tokio::test]
    async fn effect_appends_entry() {
        let store = Arc::new(InMemoryStore::new());
        let recorder = AuditRecorder::new(
            store.clone(),
            Arc::new(test_clock()),
            Arc::new(SequentialIdGenerator::new()),
        );
        let actor = UserId::new();
        let context = RequestContext {
            ip_address: Some("10.0.0.1".into()),
            user_agent: None,
        };

        let effect = recorder.record::<()>(
            actor,
            &context,
            AuditAction::TicketCreated,
            EntityType::Ticket,
            Uuid::nil(),
            json!({ "ticket_number": "TKT-00001" }),
        );
        assert!(execute_effects([effect]).await.is_empty());

        let entries = store
            .list_audit(&AuditFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor_id, actor);
        assert_eq!(entries[0].ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(entries[0].metadata["ticket_number"], "TKT-00001");
    }
}
