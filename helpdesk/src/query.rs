//! Filtered, paginated retrieval.
//!
//! Filters are plain equality matches plus an optional case-insensitive title
//! search. Results are newest first. Every list answers one page of items and
//! a total computed by a separate count over the same filter.
//!
//! Role scoping happens here, not in the store: requesters only ever see
//! their own tickets and published articles, whatever filters they sent.

use crate::audit::{AuditAction, AuditEntry, EntityType};
use crate::error::{HelpdeskError, Result};
use crate::permissions::{self, Action, Relationship};
use crate::store::RecordStore;
use crate::types::{
    ArticleStatus, CategoryId, KnowledgeArticle, Ticket, TicketPriority, TicketStatus, UserId,
};
use helpdesk_auth::{Principal, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page size for ticket and article lists.
pub const DEFAULT_LIMIT: u64 = 25;

/// Default page size for the audit log.
pub const DEFAULT_AUDIT_LIMIT: u64 = 50;

/// Largest page a caller may ask for.
pub const MAX_LIMIT: u64 = 100;

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    skip: u64,
    limit: u64,
}

impl PageRequest {
    /// Validate a requested window, falling back to [`DEFAULT_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Validation`] when `limit` is outside `1..=100`.
    pub fn new(skip: Option<u64>, limit: Option<u64>) -> Result<Self> {
        Self::with_default(skip, limit, DEFAULT_LIMIT)
    }

    /// Same as [`PageRequest::new`] with the audit log default of 50.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Validation`] when `limit` is outside `1..=100`.
    pub fn audit(skip: Option<u64>, limit: Option<u64>) -> Result<Self> {
        Self::with_default(skip, limit, DEFAULT_AUDIT_LIMIT)
    }

    fn with_default(skip: Option<u64>, limit: Option<u64>, default: u64) -> Result<Self> {
        let limit = limit.unwrap_or(default);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(HelpdeskError::validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        Ok(Self {
            skip: skip.unwrap_or(0),
            limit,
        })
    }

    /// Rows to skip
    #[must_use]
    pub const fn skip(self) -> u64 {
        self.skip
    }

    /// Rows to return at most
    #[must_use]
    pub const fn limit(self) -> u64 {
        self.limit
    }

    /// Apply the window to an already ordered iterator.
    pub fn slice<T>(self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(limit).collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// The rows in this window
    pub items: Vec<T>,
    /// Rows matching the filter, ignoring the window
    pub total: u64,
    /// Window start
    pub skip: u64,
    /// Window size
    pub limit: u64,
}

impl<T> Page<T> {
    fn new(items: Vec<T>, total: u64, page: PageRequest) -> Self {
        Self {
            items,
            total,
            skip: page.skip,
            limit: page.limit,
        }
    }
}

fn title_matches(title: &str, search: Option<&str>) -> bool {
    search.is_none_or(|needle| title.to_lowercase().contains(&needle.to_lowercase()))
}

/// Ticket list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TicketFilter {
    /// Status equals
    pub status: Option<TicketStatus>,
    /// Priority equals
    pub priority: Option<TicketPriority>,
    /// Assignee equals
    pub assignee_id: Option<UserId>,
    /// Category equals
    pub category_id: Option<CategoryId>,
    /// Requester equals
    pub requester_id: Option<UserId>,
    /// Case-insensitive title substring
    pub search: Option<String>,
}

impl TicketFilter {
    /// Whether `ticket` passes every set filter.
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.is_none_or(|s| ticket.status == s)
            && self.priority.is_none_or(|p| ticket.priority == p)
            && self.assignee_id.is_none_or(|a| ticket.assignee_id == Some(a))
            && self.category_id.is_none_or(|c| ticket.category_id == Some(c))
            && self.requester_id.is_none_or(|r| ticket.requester_id == r)
            && title_matches(&ticket.title, self.search.as_deref())
    }

    /// Restrict the filter to what `principal` may see.
    #[must_use]
    pub fn scoped_to(mut self, principal: &Principal) -> Self {
        if principal.role == Role::Requester {
            self.requester_id = Some(principal.id);
        }
        self
    }
}

/// Article list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArticleFilter {
    /// Status equals
    pub status: Option<ArticleStatus>,
    /// Author equals
    pub author_id: Option<UserId>,
    /// Category equals
    pub category_id: Option<CategoryId>,
    /// Case-insensitive title substring
    pub search: Option<String>,
}

impl ArticleFilter {
    /// Whether `article` passes every set filter.
    #[must_use]
    pub fn matches(&self, article: &KnowledgeArticle) -> bool {
        self.status.is_none_or(|s| article.status == s)
            && self.author_id.is_none_or(|a| article.author_id == a)
            && self.category_id.is_none_or(|c| article.category_id == Some(c))
            && title_matches(&article.title, self.search.as_deref())
    }

    /// Restrict the filter to what `principal` may see.
    #[must_use]
    pub fn scoped_to(mut self, principal: &Principal) -> Self {
        if principal.role == Role::Requester {
            self.status = Some(ArticleStatus::Published);
        }
        self
    }
}

/// Audit log filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuditFilter {
    /// Entity type equals
    pub entity_type: Option<EntityType>,
    /// Entity id equals
    pub entity_id: Option<Uuid>,
    /// Action equals
    pub action: Option<AuditAction>,
}

impl AuditFilter {
    /// Whether `entry` passes every set filter.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.entity_type.is_none_or(|t| entry.entity_type == t)
            && self.entity_id.is_none_or(|id| entry.entity_id == id)
            && self.action.is_none_or(|a| entry.action == a)
    }
}

/// List tickets visible to `principal`.
///
/// # Errors
///
/// Returns [`HelpdeskError::Storage`] if the store fails.
pub async fn list_tickets(
    store: &dyn RecordStore,
    principal: &Principal,
    filter: TicketFilter,
    page: PageRequest,
) -> Result<Page<Ticket>> {
    let filter = filter.scoped_to(principal);
    let items = store.list_tickets(&filter, page).await?;
    let total = store.count_tickets(&filter).await?;
    Ok(Page::new(items, total, page))
}

/// List articles visible to `principal`.
///
/// # Errors
///
/// Returns [`HelpdeskError::Storage`] if the store fails.
pub async fn list_articles(
    store: &dyn RecordStore,
    principal: &Principal,
    filter: ArticleFilter,
    page: PageRequest,
) -> Result<Page<KnowledgeArticle>> {
    let filter = filter.scoped_to(principal);
    let items = store.list_articles(&filter, page).await?;
    let total = store.count_articles(&filter).await?;
    Ok(Page::new(items, total, page))
}

/// Read the audit log. Admin only.
///
/// # Errors
///
/// - [`HelpdeskError::PermissionDenied`]: caller is not an admin
/// - [`HelpdeskError::Storage`]: the store failed
pub async fn list_audit_entries(
    store: &dyn RecordStore,
    principal: &Principal,
    filter: AuditFilter,
    page: PageRequest,
) -> Result<Page<AuditEntry>> {
    permissions::authorize(principal, Relationship::NotApplicable, Action::ReadAuditLog)?;

    let items = store.list_audit(&filter, page).await?;
    let total = store.count_audit(&filter).await?;
    Ok(Page::new(items, total, page))
}
