//! In-memory record store.
//!
//! Rows live in insertion-ordered vectors behind one `RwLock`. The ticket
//! number sequence has its own mutex so reservations never interleave.

use super::{
    ArticleStore, AuditStore, DirectoryStore, RecordStore, StoreError, StoreFuture, TicketStore,
};
use crate::audit::AuditEntry;
use crate::query::{ArticleFilter, AuditFilter, PageRequest, TicketFilter};
use crate::types::{
    ArticleId, Category, CategoryId, Comment, KnowledgeArticle, SlaPolicy, SlaPolicyId, Tag, Team,
    TeamId, Ticket, TicketId, TicketNumber, TicketPriority, User, UserId,
};
use std::cmp::Reverse;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Default)]
struct Tables {
    tickets: Vec<Ticket>,
    comments: Vec<Comment>,
    articles: Vec<KnowledgeArticle>,
    users: Vec<User>,
    teams: Vec<Team>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    sla_policies: Vec<SlaPolicy>,
    audit: Vec<AuditEntry>,
}

/// Record store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    ticket_sequence: Mutex<u64>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Replace the row matching `is_target`; a missing row is a no-op, like an UPDATE.
fn replace<T: Clone>(rows: &mut [T], is_target: impl Fn(&T) -> bool, row: &T) {
    if let Some(slot) = rows.iter_mut().find(|existing| is_target(existing)) {
        *slot = row.clone();
    }
}

fn newest_tickets<'t>(tables: &'t Tables, filter: &TicketFilter) -> Vec<&'t Ticket> {
    let mut rows: Vec<&Ticket> = tables.tickets.iter().filter(|t| filter.matches(t)).collect();
    rows.sort_by_key(|t| Reverse((t.created_at, t.ticket_number)));
    rows
}

fn newest_articles<'t>(tables: &'t Tables, filter: &ArticleFilter) -> Vec<&'t KnowledgeArticle> {
    // Later insertions win ties on created_at.
    let mut rows: Vec<&KnowledgeArticle> =
        tables.articles.iter().rev().filter(|a| filter.matches(a)).collect();
    rows.sort_by_key(|a| Reverse(a.created_at));
    rows
}

impl TicketStore for InMemoryStore {
    fn next_ticket_number(&self) -> StoreFuture<'_, TicketNumber> {
        Box::pin(async move {
            let mut sequence = self.ticket_sequence.lock().await;
            *sequence += 1;
            Ok(TicketNumber::new(*sequence))
        })
    }

    fn insert_ticket<'a>(&'a self, ticket: &'a Ticket) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if tables
                .tickets
                .iter()
                .any(|t| t.id == ticket.id || t.ticket_number == ticket.ticket_number)
            {
                return Err(StoreError::Duplicate(format!("ticket {}", ticket.ticket_number)));
            }
            tables.tickets.push(ticket.clone());
            Ok(())
        })
    }

    fn update_ticket<'a>(&'a self, ticket: &'a Ticket) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            replace(&mut tables.tickets, |t| t.id == ticket.id, ticket);
            Ok(())
        })
    }

    fn find_ticket(&self, id: TicketId) -> StoreFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.tickets.iter().find(|t| t.id == id).cloned())
        })
    }

    fn list_tickets<'a>(
        &'a self,
        filter: &'a TicketFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Vec<Ticket>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(page.slice(newest_tickets(&tables, filter).into_iter().cloned()))
        })
    }

    fn count_tickets<'a>(&'a self, filter: &'a TicketFilter) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(count(tables.tickets.iter().filter(|t| filter.matches(t)).count()))
        })
    }

    fn insert_comment<'a>(&'a self, comment: &'a Comment) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.tables.write().await.comments.push(comment.clone());
            Ok(())
        })
    }

    fn list_comments(
        &self,
        ticket_id: TicketId,
        include_internal: bool,
    ) -> StoreFuture<'_, Vec<Comment>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut comments: Vec<Comment> = tables
                .comments
                .iter()
                .filter(|c| c.ticket_id == ticket_id && (include_internal || !c.is_internal))
                .cloned()
                .collect();
            comments.sort_by_key(|c| c.created_at);
            Ok(comments)
        })
    }
}

impl ArticleStore for InMemoryStore {
    fn insert_article<'a>(&'a self, article: &'a KnowledgeArticle) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.tables.write().await.articles.push(article.clone());
            Ok(())
        })
    }

    fn update_article<'a>(&'a self, article: &'a KnowledgeArticle) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if let Some(slot) = tables.articles.iter_mut().find(|a| a.id == article.id) {
                let view_count = slot.view_count;
                *slot = article.clone();
                slot.view_count = view_count;
            }
            Ok(())
        })
    }

    fn find_article(&self, id: ArticleId) -> StoreFuture<'_, Option<KnowledgeArticle>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.articles.iter().find(|a| a.id == id).cloned())
        })
    }

    fn list_articles<'a>(
        &'a self,
        filter: &'a ArticleFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Vec<KnowledgeArticle>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(page.slice(newest_articles(&tables, filter).into_iter().cloned()))
        })
    }

    fn count_articles<'a>(&'a self, filter: &'a ArticleFilter) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(count(tables.articles.iter().filter(|a| filter.matches(a)).count()))
        })
    }

    fn increment_article_views(&self, id: ArticleId) -> StoreFuture<'_, i64> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let article = tables
                .articles
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| StoreError::Database(format!("article {id} does not exist")))?;
            article.view_count += 1;
            Ok(article.view_count)
        })
    }
}

impl DirectoryStore for InMemoryStore {
    fn insert_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if tables.users.iter().any(|u| u.email == user.email) {
                return Err(StoreError::Duplicate("user email".to_string()));
            }
            tables.users.push(user.clone());
            Ok(())
        })
    }

    fn update_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if tables.users.iter().any(|u| u.email == user.email && u.id != user.id) {
                return Err(StoreError::Duplicate("user email".to_string()));
            }
            replace(&mut tables.users, |u| u.id == user.id, user);
            Ok(())
        })
    }

    fn find_user(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.users.iter().find(|u| u.id == id).cloned())
        })
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.users.iter().find(|u| u.email == email).cloned())
        })
    }

    fn list_users(&self) -> StoreFuture<'_, Vec<User>> {
        Box::pin(async move { Ok(self.tables.read().await.users.clone()) })
    }

    fn insert_team<'a>(&'a self, team: &'a Team) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.tables.write().await.teams.push(team.clone());
            Ok(())
        })
    }

    fn update_team<'a>(&'a self, team: &'a Team) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            replace(&mut tables.teams, |t| t.id == team.id, team);
            Ok(())
        })
    }

    fn find_team(&self, id: TeamId) -> StoreFuture<'_, Option<Team>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.teams.iter().find(|t| t.id == id).cloned())
        })
    }

    fn list_teams(&self) -> StoreFuture<'_, Vec<Team>> {
        Box::pin(async move {
            let mut teams = self.tables.read().await.teams.clone();
            teams.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(teams)
        })
    }

    fn insert_category<'a>(&'a self, category: &'a Category) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.tables.write().await.categories.push(category.clone());
            Ok(())
        })
    }

    fn find_category(&self, id: CategoryId) -> StoreFuture<'_, Option<Category>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.categories.iter().find(|c| c.id == id).cloned())
        })
    }

    fn list_categories(&self) -> StoreFuture<'_, Vec<Category>> {
        Box::pin(async move {
            let mut categories = self.tables.read().await.categories.clone();
            categories.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(categories)
        })
    }

    fn find_or_create_tag(&self, candidate: Tag) -> StoreFuture<'_, Tag> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if let Some(existing) = tables.tags.iter().find(|t| t.name == candidate.name) {
                return Ok(existing.clone());
            }
            tables.tags.push(candidate.clone());
            Ok(candidate)
        })
    }

    fn list_tags(&self) -> StoreFuture<'_, Vec<Tag>> {
        Box::pin(async move {
            let mut tags = self.tables.read().await.tags.clone();
            tags.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(tags)
        })
    }

    fn insert_sla_policy<'a>(&'a self, policy: &'a SlaPolicy) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if tables.sla_policies.iter().any(|p| p.priority == policy.priority) {
                return Err(StoreError::Duplicate(format!("SLA policy for {}", policy.priority)));
            }
            tables.sla_policies.push(policy.clone());
            Ok(())
        })
    }

    fn update_sla_policy<'a>(&'a self, policy: &'a SlaPolicy) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if tables
                .sla_policies
                .iter()
                .any(|p| p.priority == policy.priority && p.id != policy.id)
            {
                return Err(StoreError::Duplicate(format!("SLA policy for {}", policy.priority)));
            }
            replace(&mut tables.sla_policies, |p| p.id == policy.id, policy);
            Ok(())
        })
    }

    fn find_sla_policy(&self, id: SlaPolicyId) -> StoreFuture<'_, Option<SlaPolicy>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.sla_policies.iter().find(|p| p.id == id).cloned())
        })
    }

    fn find_sla_policy_by_priority(
        &self,
        priority: TicketPriority,
    ) -> StoreFuture<'_, Option<SlaPolicy>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.sla_policies.iter().find(|p| p.priority == priority).cloned())
        })
    }

    fn list_sla_policies(&self) -> StoreFuture<'_, Vec<SlaPolicy>> {
        Box::pin(async move {
            let mut policies = self.tables.read().await.sla_policies.clone();
            policies.sort_by_key(|p| TicketPriority::ALL.iter().position(|q| *q == p.priority));
            Ok(policies)
        })
    }
}

impl AuditStore for InMemoryStore {
    fn append_audit<'a>(&'a self, entry: &'a AuditEntry) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.tables.write().await.audit.push(entry.clone());
            Ok(())
        })
    }

    fn list_audit<'a>(
        &'a self,
        filter: &'a AuditFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Vec<AuditEntry>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut rows: Vec<&AuditEntry> =
                tables.audit.iter().rev().filter(|e| filter.matches(e)).collect();
            rows.sort_by_key(|e| Reverse(e.created_at));
            Ok(page.slice(rows.into_iter().cloned()))
        })
    }

    fn count_audit<'a>(&'a self, filter: &'a AuditFilter) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(count(tables.audit.iter().filter(|e| filter.matches(e)).count()))
        })
    }
}

impl RecordStore for InMemoryStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::TicketStatus;
    use chrono::{Duration, Utc};
    use helpdesk_testing::test_clock;
    use helpdesk_core::environment::Clock;
    use std::sync::Arc;
    use uuid::Uuid;

    fn ticket(number: u64, title: &str, created_at: chrono::DateTime<Utc>) -> Ticket {
        Ticket {
            id: TicketId::from_uuid(Uuid::new_v4()),
            ticket_number: TicketNumber::new(number),
            title: title.to_string(),
            description: "details".to_string(),
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            category_id: None,
            requester_id: UserId::new(),
            assignee_id: None,
            assigned_team_id: None,
            first_response_at: None,
            resolved_at: None,
            closed_at: None,
            waiting_customer_started_at: None,
            total_waiting_customer_duration: 0,
            tags: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn concurrent_number_reservations_are_unique() {
        let store = Arc::new(InMemoryStore::new());
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.next_ticket_number().await.unwrap() })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().value());
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn tickets_list_newest_first_with_total() {
        let store = InMemoryStore::new();
        let start = test_clock().now();
        for n in 1..=5 {
            let created = start + Duration::minutes(i64::try_from(n).unwrap());
            store.insert_ticket(&ticket(n, &format!("Ticket {n}"), created)).await.unwrap();
        }

        let filter = TicketFilter::default();
        let page = PageRequest::new(Some(1), Some(2)).unwrap();
        let rows = store.list_tickets(&filter, page).await.unwrap();

        let numbers: Vec<u64> = rows.iter().map(|t| t.ticket_number.value()).collect();
        assert_eq!(numbers, vec![4, 3]);
        assert_eq!(store.count_tickets(&filter).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        let now = test_clock().now();
        let user = User {
            id: UserId::new(),
            email: "a@example.com".into(),
            name: "A".into(),
            role: helpdesk_auth::Role::Requester,
            team_id: None,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };
        store.insert_user(&user).await.unwrap();

        let again = User { id: UserId::new(), ..user };
        assert_eq!(
            store.insert_user(&again).await,
            Err(StoreError::Duplicate("user email".into()))
        );
    }

    #[tokio::test]
    async fn view_increment_survives_article_updates() {
        let store = InMemoryStore::new();
        let now = test_clock().now();
        let mut article = KnowledgeArticle {
            id: ArticleId::from_uuid(Uuid::new_v4()),
            title: "Reset your password".into(),
            content: "Steps".into(),
            status: crate::types::ArticleStatus::Published,
            author_id: UserId::new(),
            category_id: None,
            view_count: 0,
            published_at: Some(now),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        store.insert_article(&article).await.unwrap();

        assert_eq!(store.increment_article_views(article.id).await.unwrap(), 1);
        article.title = "Reset a password".into();
        store.update_article(&article).await.unwrap();

        let stored = store.find_article(article.id).await.unwrap().unwrap();
        assert_eq!(stored.view_count, 1);
        assert_eq!(stored.title, "Reset a password");
    }
}
