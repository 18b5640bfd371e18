//! Record store contracts.
//!
//! The engines depend only on these traits. Methods return boxed futures so
//! the store can be shared as `Arc<dyn RecordStore>` across handlers.
//!
//! Two implementations ship with the crate:
//! - [`InMemoryStore`]: tests and local development
//! - `PostgresStore` (feature `postgres`): production

use crate::audit::AuditEntry;
use crate::query::{ArticleFilter, AuditFilter, PageRequest, TicketFilter};
use crate::types::{
    ArticleId, Category, CategoryId, Comment, KnowledgeArticle, SlaPolicy, SlaPolicyId, Tag, Team,
    TeamId, Ticket, TicketId, TicketNumber, TicketPriority, User, UserId,
};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

mod credentials;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use credentials::DirectoryCredentials;
pub use memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

/// Boxed future returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Record store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated; names what collided.
    #[error("duplicate {0}")]
    Duplicate(String),

    /// Backend failure (connection, query).
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Tickets and their comments.
pub trait TicketStore: Send + Sync {
    /// Reserve the next ticket number. Never hands out the same number twice.
    fn next_ticket_number(&self) -> StoreFuture<'_, TicketNumber>;

    /// Insert a new ticket with its tag links.
    fn insert_ticket<'a>(&'a self, ticket: &'a Ticket) -> StoreFuture<'a, ()>;

    /// Overwrite a ticket, replacing its tag links.
    fn update_ticket<'a>(&'a self, ticket: &'a Ticket) -> StoreFuture<'a, ()>;

    /// Load a ticket with its tags.
    fn find_ticket(&self, id: TicketId) -> StoreFuture<'_, Option<Ticket>>;

    /// Tickets matching `filter`, newest first, windowed by `page`.
    fn list_tickets<'a>(
        &'a self,
        filter: &'a TicketFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Vec<Ticket>>;

    /// Number of tickets matching `filter`.
    fn count_tickets<'a>(&'a self, filter: &'a TicketFilter) -> StoreFuture<'a, u64>;

    /// Insert a comment.
    fn insert_comment<'a>(&'a self, comment: &'a Comment) -> StoreFuture<'a, ()>;

    /// Comments on a ticket, oldest first.
    fn list_comments(
        &self,
        ticket_id: TicketId,
        include_internal: bool,
    ) -> StoreFuture<'_, Vec<Comment>>;
}

/// Knowledge-base articles.
pub trait ArticleStore: Send + Sync {
    /// Insert a new article with its tag links.
    fn insert_article<'a>(&'a self, article: &'a KnowledgeArticle) -> StoreFuture<'a, ()>;

    /// Overwrite an article, replacing its tag links. Leaves `view_count` alone.
    fn update_article<'a>(&'a self, article: &'a KnowledgeArticle) -> StoreFuture<'a, ()>;

    /// Load an article with its tags.
    fn find_article(&self, id: ArticleId) -> StoreFuture<'_, Option<KnowledgeArticle>>;

    /// Articles matching `filter`, newest first, windowed by `page`.
    fn list_articles<'a>(
        &'a self,
        filter: &'a ArticleFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Vec<KnowledgeArticle>>;

    /// Number of articles matching `filter`.
    fn count_articles<'a>(&'a self, filter: &'a ArticleFilter) -> StoreFuture<'a, u64>;

    /// Atomically add one to `view_count`, returning the new value.
    fn increment_article_views(&self, id: ArticleId) -> StoreFuture<'_, i64>;
}

/// Users, teams, categories, tags and SLA policies.
pub trait DirectoryStore: Send + Sync {
    /// Insert a user. Duplicate email answers [`StoreError::Duplicate`].
    fn insert_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, ()>;

    /// Overwrite a user. Duplicate email answers [`StoreError::Duplicate`].
    fn update_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, ()>;

    /// Load a user.
    fn find_user(&self, id: UserId) -> StoreFuture<'_, Option<User>>;

    /// Load a user by exact email.
    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>>;

    /// All users, oldest first.
    fn list_users(&self) -> StoreFuture<'_, Vec<User>>;

    /// Insert a team.
    fn insert_team<'a>(&'a self, team: &'a Team) -> StoreFuture<'a, ()>;

    /// Overwrite a team.
    fn update_team<'a>(&'a self, team: &'a Team) -> StoreFuture<'a, ()>;

    /// Load a team.
    fn find_team(&self, id: TeamId) -> StoreFuture<'_, Option<Team>>;

    /// All teams, by name.
    fn list_teams(&self) -> StoreFuture<'_, Vec<Team>>;

    /// Insert a category.
    fn insert_category<'a>(&'a self, category: &'a Category) -> StoreFuture<'a, ()>;

    /// Load a category.
    fn find_category(&self, id: CategoryId) -> StoreFuture<'_, Option<Category>>;

    /// All categories, by name.
    fn list_categories(&self) -> StoreFuture<'_, Vec<Category>>;

    /// Return the tag named `candidate.name`, inserting `candidate` if none exists.
    fn find_or_create_tag(&self, candidate: Tag) -> StoreFuture<'_, Tag>;

    /// All tags, by name.
    fn list_tags(&self) -> StoreFuture<'_, Vec<Tag>>;

    /// Insert an SLA policy. Duplicate priority answers [`StoreError::Duplicate`].
    fn insert_sla_policy<'a>(&'a self, policy: &'a SlaPolicy) -> StoreFuture<'a, ()>;

    /// Overwrite an SLA policy.
    fn update_sla_policy<'a>(&'a self, policy: &'a SlaPolicy) -> StoreFuture<'a, ()>;

    /// Load an SLA policy.
    fn find_sla_policy(&self, id: SlaPolicyId) -> StoreFuture<'_, Option<SlaPolicy>>;

    /// Load the SLA policy for a priority.
    fn find_sla_policy_by_priority(
        &self,
        priority: TicketPriority,
    ) -> StoreFuture<'_, Option<SlaPolicy>>;

    /// All SLA policies, by priority.
    fn list_sla_policies(&self) -> StoreFuture<'_, Vec<SlaPolicy>>;
}

/// The append-only audit log.
pub trait AuditStore: Send + Sync {
    /// Append an entry. Entries are never updated or removed.
    fn append_audit<'a>(&'a self, entry: &'a AuditEntry) -> StoreFuture<'a, ()>;

    /// Entries matching `filter`, newest first, windowed by `page`.
    fn list_audit<'a>(
        &'a self,
        filter: &'a AuditFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Vec<AuditEntry>>;

    /// Number of entries matching `filter`.
    fn count_audit<'a>(&'a self, filter: &'a AuditFilter) -> StoreFuture<'a, u64>;
}

/// Everything the helpdesk persists.
pub trait RecordStore: TicketStore + ArticleStore + DirectoryStore + AuditStore {
    /// Cheap liveness probe for readiness checks.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
