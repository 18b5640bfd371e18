//! PostgreSQL record store.
//!
//! Runtime-checked queries over the schema in `migrations/`. Tag links keep
//! their position so tags come back in the order they were given. Ticket
//! numbers come from the `ticket_number_seq` sequence, so a number is never
//! handed out twice even when the insert that reserved it fails.
//!
//! # Example
//!
//! ```no_run
//! use helpdesk::store::PostgresStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresStore::connect("postgresql://localhost/helpdesk", 10).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use super::{
    ArticleStore, AuditStore, DirectoryStore, RecordStore, StoreError, StoreFuture, TicketStore,
};
use crate::audit::AuditEntry;
use crate::query::{ArticleFilter, AuditFilter, PageRequest, TicketFilter};
use crate::types::{
    ArticleId, AuditEntryId, Category, CategoryId, Comment, CommentId, KnowledgeArticle, SlaPolicy,
    SlaPolicyId, Tag, TagId, Team, TeamId, Ticket, TicketId, TicketNumber, TicketPriority, User,
    UserId,
};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

const TICKET_COLUMNS: &str = "id, ticket_number, title, description, status, priority, \
    category_id, requester_id, assignee_id, assigned_team_id, first_response_at, resolved_at, \
    closed_at, waiting_customer_started_at, total_waiting_customer_duration, created_at, updated_at";

const ARTICLE_COLUMNS: &str = "id, title, content, status, author_id, category_id, view_count, \
    published_at, created_at, updated_at";

const USER_COLUMNS: &str = "id, email, name, role, team_id, password_hash, created_at, updated_at";

const SLA_COLUMNS: &str = "id, priority, first_response_target_minutes, resolution_target_minutes, \
    pause_on_waiting_customer, timezone, created_at, updated_at";

const AUDIT_COLUMNS: &str = "id, user_id, action, entity_type, entity_id, metadata, ip_address, \
    user_agent, created_at";

/// PostgreSQL-backed [`RecordStore`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;

        Ok(Self::new(pool))
    }

    /// Apply the bundled migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    async fn tags_for(
        &self,
        links: TagLinks,
        owners: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<Tag>>, StoreError> {
        let mut by_owner: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        if owners.is_empty() {
            return Ok(by_owner);
        }

        let rows = sqlx::query(links.select_sql())
            .bind(owners)
            .fetch_all(&self.pool)
            .await
            .map_err(database)?;

        for row in &rows {
            let owner: Uuid = row.try_get("owner_id").map_err(database)?;
            by_owner.entry(owner).or_default().push(tag_from_row(row)?);
        }
        Ok(by_owner)
    }

    async fn tickets_with_tags(&self, rows: &[PgRow]) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets = rows.iter().map(ticket_from_row).collect::<Result<Vec<_>, _>>()?;
        let ids = tickets.iter().map(|t| *t.id.as_uuid()).collect();
        let mut tags = self.tags_for(TagLinks::Tickets, ids).await?;
        for ticket in &mut tickets {
            ticket.tags = tags.remove(ticket.id.as_uuid()).unwrap_or_default();
        }
        Ok(tickets)
    }

    async fn articles_with_tags(&self, rows: &[PgRow]) -> Result<Vec<KnowledgeArticle>, StoreError> {
        let mut articles = rows.iter().map(article_from_row).collect::<Result<Vec<_>, _>>()?;
        let ids = articles.iter().map(|a| *a.id.as_uuid()).collect();
        let mut tags = self.tags_for(TagLinks::Articles, ids).await?;
        for article in &mut articles {
            article.tags = tags.remove(article.id.as_uuid()).unwrap_or_default();
        }
        Ok(articles)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn database(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

fn corrupt(err: impl fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

/// Map a unique violation to [`StoreError::Duplicate`], anything else to `Database`.
fn unique_violation(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate(what());
        }
    }
    database(err)
}

fn to_i64(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(corrupt)
}

/// `ILIKE` pattern matching `needle` anywhere, with wildcards escaped.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

/// Which link table ties tags to their owner.
#[derive(Clone, Copy)]
enum TagLinks {
    Tickets,
    Articles,
}

impl TagLinks {
    const fn select_sql(self) -> &'static str {
        match self {
            Self::Tickets => {
                r"
                SELECT l.ticket_id AS owner_id, t.id, t.name, t.created_at
                FROM ticket_tags l
                JOIN tags t ON t.id = l.tag_id
                WHERE l.ticket_id = ANY($1)
                ORDER BY l.position
                "
            },
            Self::Articles => {
                r"
                SELECT l.article_id AS owner_id, t.id, t.name, t.created_at
                FROM article_tags l
                JOIN tags t ON t.id = l.tag_id
                WHERE l.article_id = ANY($1)
                ORDER BY l.position
                "
            },
        }
    }

    const fn delete_sql(self) -> &'static str {
        match self {
            Self::Tickets => "DELETE FROM ticket_tags WHERE ticket_id = $1",
            Self::Articles => "DELETE FROM article_tags WHERE article_id = $1",
        }
    }

    const fn insert_sql(self) -> &'static str {
        match self {
            Self::Tickets => {
                r"
                INSERT INTO ticket_tags (ticket_id, tag_id, position)
                SELECT $1, link.tag_id, link.position
                FROM UNNEST($2::uuid[]) WITH ORDINALITY AS link(tag_id, position)
                "
            },
            Self::Articles => {
                r"
                INSERT INTO article_tags (article_id, tag_id, position)
                SELECT $1, link.tag_id, link.position
                FROM UNNEST($2::uuid[]) WITH ORDINALITY AS link(tag_id, position)
                "
            },
        }
    }
}

/// Replace the tag links of `owner` with `tags`, in order.
async fn write_tag_links(
    conn: &mut PgConnection,
    links: TagLinks,
    owner: Uuid,
    tags: &[Tag],
) -> Result<(), StoreError> {
    sqlx::query(links.delete_sql())
        .bind(owner)
        .execute(&mut *conn)
        .await
        .map_err(database)?;

    if tags.is_empty() {
        return Ok(());
    }

    let tag_ids: Vec<Uuid> = tags.iter().map(|t| *t.id.as_uuid()).collect();
    sqlx::query(links.insert_sql())
        .bind(owner)
        .bind(tag_ids)
        .execute(&mut *conn)
        .await
        .map_err(database)?;
    Ok(())
}

// ============================================================================
// Row decoding
// ============================================================================

fn tag_from_row(row: &PgRow) -> Result<Tag, StoreError> {
    Ok(Tag {
        id: TagId::from_uuid(row.try_get("id").map_err(database)?),
        name: row.try_get("name").map_err(database)?,
        created_at: row.try_get("created_at").map_err(database)?,
    })
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, StoreError> {
    let number: i64 = row.try_get("ticket_number").map_err(database)?;
    let status: String = row.try_get("status").map_err(database)?;
    let priority: String = row.try_get("priority").map_err(database)?;

    Ok(Ticket {
        id: TicketId::from_uuid(row.try_get("id").map_err(database)?),
        ticket_number: TicketNumber::new(u64::try_from(number).map_err(corrupt)?),
        title: row.try_get("title").map_err(database)?,
        description: row.try_get("description").map_err(database)?,
        status: status.parse().map_err(corrupt)?,
        priority: priority.parse().map_err(corrupt)?,
        category_id: row
            .try_get::<Option<Uuid>, _>("category_id")
            .map_err(database)?
            .map(CategoryId::from_uuid),
        requester_id: UserId(row.try_get("requester_id").map_err(database)?),
        assignee_id: row
            .try_get::<Option<Uuid>, _>("assignee_id")
            .map_err(database)?
            .map(UserId),
        assigned_team_id: row
            .try_get::<Option<Uuid>, _>("assigned_team_id")
            .map_err(database)?
            .map(TeamId::from_uuid),
        first_response_at: row.try_get("first_response_at").map_err(database)?,
        resolved_at: row.try_get("resolved_at").map_err(database)?,
        closed_at: row.try_get("closed_at").map_err(database)?,
        waiting_customer_started_at: row.try_get("waiting_customer_started_at").map_err(database)?,
        total_waiting_customer_duration: row
            .try_get("total_waiting_customer_duration")
            .map_err(database)?,
        tags: Vec::new(),
        created_at: row.try_get("created_at").map_err(database)?,
        updated_at: row.try_get("updated_at").map_err(database)?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, StoreError> {
    Ok(Comment {
        id: CommentId::from_uuid(row.try_get("id").map_err(database)?),
        ticket_id: TicketId::from_uuid(row.try_get("ticket_id").map_err(database)?),
        author_id: UserId(row.try_get("author_id").map_err(database)?),
        content: row.try_get("content").map_err(database)?,
        is_internal: row.try_get("is_internal").map_err(database)?,
        created_at: row.try_get("created_at").map_err(database)?,
        updated_at: row.try_get("updated_at").map_err(database)?,
    })
}

fn article_from_row(row: &PgRow) -> Result<KnowledgeArticle, StoreError> {
    let status: String = row.try_get("status").map_err(database)?;

    Ok(KnowledgeArticle {
        id: ArticleId::from_uuid(row.try_get("id").map_err(database)?),
        title: row.try_get("title").map_err(database)?,
        content: row.try_get("content").map_err(database)?,
        status: status.parse().map_err(corrupt)?,
        author_id: UserId(row.try_get("author_id").map_err(database)?),
        category_id: row
            .try_get::<Option<Uuid>, _>("category_id")
            .map_err(database)?
            .map(CategoryId::from_uuid),
        view_count: row.try_get("view_count").map_err(database)?,
        published_at: row.try_get("published_at").map_err(database)?,
        tags: Vec::new(),
        created_at: row.try_get("created_at").map_err(database)?,
        updated_at: row.try_get("updated_at").map_err(database)?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role").map_err(database)?;

    Ok(User {
        id: UserId(row.try_get("id").map_err(database)?),
        email: row.try_get("email").map_err(database)?,
        name: row.try_get("name").map_err(database)?,
        role: role.parse().map_err(corrupt)?,
        team_id: row
            .try_get::<Option<Uuid>, _>("team_id")
            .map_err(database)?
            .map(TeamId::from_uuid),
        password_hash: row.try_get("password_hash").map_err(database)?,
        created_at: row.try_get("created_at").map_err(database)?,
        updated_at: row.try_get("updated_at").map_err(database)?,
    })
}

fn team_from_row(row: &PgRow) -> Result<Team, StoreError> {
    Ok(Team {
        id: TeamId::from_uuid(row.try_get("id").map_err(database)?),
        name: row.try_get("name").map_err(database)?,
        description: row.try_get("description").map_err(database)?,
        created_at: row.try_get("created_at").map_err(database)?,
        updated_at: row.try_get("updated_at").map_err(database)?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, StoreError> {
    let kind: String = row.try_get("type").map_err(database)?;

    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id").map_err(database)?),
        name: row.try_get("name").map_err(database)?,
        kind: kind.parse().map_err(corrupt)?,
        description: row.try_get("description").map_err(database)?,
        created_at: row.try_get("created_at").map_err(database)?,
    })
}

fn sla_policy_from_row(row: &PgRow) -> Result<SlaPolicy, StoreError> {
    let priority: String = row.try_get("priority").map_err(database)?;

    Ok(SlaPolicy {
        id: SlaPolicyId::from_uuid(row.try_get("id").map_err(database)?),
        priority: priority.parse().map_err(corrupt)?,
        first_response_target_minutes: row
            .try_get("first_response_target_minutes")
            .map_err(database)?,
        resolution_target_minutes: row.try_get("resolution_target_minutes").map_err(database)?,
        pause_on_waiting_customer: row.try_get("pause_on_waiting_customer").map_err(database)?,
        timezone: row.try_get("timezone").map_err(database)?,
        created_at: row.try_get("created_at").map_err(database)?,
        updated_at: row.try_get("updated_at").map_err(database)?,
    })
}

fn audit_from_row(row: &PgRow) -> Result<AuditEntry, StoreError> {
    let action: String = row.try_get("action").map_err(database)?;
    let entity_type: String = row.try_get("entity_type").map_err(database)?;

    Ok(AuditEntry {
        id: AuditEntryId::from_uuid(row.try_get("id").map_err(database)?),
        actor_id: UserId(row.try_get("user_id").map_err(database)?),
        action: action.parse().map_err(corrupt)?,
        entity_type: entity_type.parse().map_err(corrupt)?,
        entity_id: row.try_get("entity_id").map_err(database)?,
        metadata: row.try_get("metadata").map_err(database)?,
        ip_address: row.try_get("ip_address").map_err(database)?,
        user_agent: row.try_get("user_agent").map_err(database)?,
        created_at: row.try_get("created_at").map_err(database)?,
    })
}

// ============================================================================
// Filters
// ============================================================================

fn push_ticket_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TicketFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(assignee) = filter.assignee_id {
        qb.push(" AND assignee_id = ").push_bind(assignee.0);
    }
    if let Some(category) = filter.category_id {
        qb.push(" AND category_id = ").push_bind(*category.as_uuid());
    }
    if let Some(requester) = filter.requester_id {
        qb.push(" AND requester_id = ").push_bind(requester.0);
    }
    if let Some(search) = &filter.search {
        qb.push(" AND title ILIKE ").push_bind(contains_pattern(search));
    }
}

fn push_article_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(author) = filter.author_id {
        qb.push(" AND author_id = ").push_bind(author.0);
    }
    if let Some(category) = filter.category_id {
        qb.push(" AND category_id = ").push_bind(*category.as_uuid());
    }
    if let Some(search) = &filter.search {
        qb.push(" AND title ILIKE ").push_bind(contains_pattern(search));
    }
}

fn push_audit_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AuditFilter) {
    qb.push(" WHERE TRUE");
    if let Some(entity_type) = filter.entity_type {
        qb.push(" AND entity_type = ").push_bind(entity_type.as_str());
    }
    if let Some(entity_id) = filter.entity_id {
        qb.push(" AND entity_id = ").push_bind(entity_id);
    }
    if let Some(action) = filter.action {
        qb.push(" AND action = ").push_bind(action.as_str());
    }
}

fn push_window(qb: &mut QueryBuilder<'_, Postgres>, page: PageRequest) -> Result<(), StoreError> {
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(to_i64(page.limit())?)
        .push(" OFFSET ")
        .push_bind(to_i64(page.skip())?);
    Ok(())
}

fn count_from(total: i64) -> Result<u64, StoreError> {
    u64::try_from(total).map_err(corrupt)
}

// ============================================================================
// Store implementations
// ============================================================================

impl TicketStore for PostgresStore {
    fn next_ticket_number(&self) -> StoreFuture<'_, TicketNumber> {
        Box::pin(async move {
            let value: i64 = sqlx::query_scalar("SELECT nextval('ticket_number_seq')")
                .fetch_one(&self.pool)
                .await
                .map_err(database)?;
            Ok(TicketNumber::new(u64::try_from(value).map_err(corrupt)?))
        })
    }

    fn insert_ticket<'a>(&'a self, ticket: &'a Ticket) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(database)?;

            sqlx::query(
                r"
                INSERT INTO tickets (
                    id, ticket_number, title, description, status, priority, category_id,
                    requester_id, assignee_id, assigned_team_id, first_response_at, resolved_at,
                    closed_at, waiting_customer_started_at, total_waiting_customer_duration,
                    created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                ",
            )
            .bind(ticket.id.as_uuid())
            .bind(to_i64(ticket.ticket_number.value())?)
            .bind(&ticket.title)
            .bind(&ticket.description)
            .bind(ticket.status.as_str())
            .bind(ticket.priority.as_str())
            .bind(ticket.category_id.map(|c| *c.as_uuid()))
            .bind(ticket.requester_id.0)
            .bind(ticket.assignee_id.map(|u| u.0))
            .bind(ticket.assigned_team_id.map(|t| *t.as_uuid()))
            .bind(ticket.first_response_at)
            .bind(ticket.resolved_at)
            .bind(ticket.closed_at)
            .bind(ticket.waiting_customer_started_at)
            .bind(ticket.total_waiting_customer_duration)
            .bind(ticket.created_at)
            .bind(ticket.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| unique_violation(e, || format!("ticket {}", ticket.ticket_number)))?;

            write_tag_links(&mut *tx, TagLinks::Tickets, *ticket.id.as_uuid(), &ticket.tags).await?;
            tx.commit().await.map_err(database)
        })
    }

    fn update_ticket<'a>(&'a self, ticket: &'a Ticket) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(database)?;

            sqlx::query(
                r"
                UPDATE tickets SET
                    title = $2, description = $3, status = $4, priority = $5, category_id = $6,
                    assignee_id = $7, assigned_team_id = $8, first_response_at = $9,
                    resolved_at = $10, closed_at = $11, waiting_customer_started_at = $12,
                    total_waiting_customer_duration = $13, updated_at = $14
                WHERE id = $1
                ",
            )
            .bind(ticket.id.as_uuid())
            .bind(&ticket.title)
            .bind(&ticket.description)
            .bind(ticket.status.as_str())
            .bind(ticket.priority.as_str())
            .bind(ticket.category_id.map(|c| *c.as_uuid()))
            .bind(ticket.assignee_id.map(|u| u.0))
            .bind(ticket.assigned_team_id.map(|t| *t.as_uuid()))
            .bind(ticket.first_response_at)
            .bind(ticket.resolved_at)
            .bind(ticket.closed_at)
            .bind(ticket.waiting_customer_started_at)
            .bind(ticket.total_waiting_customer_duration)
            .bind(ticket.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(database)?;

            write_tag_links(&mut *tx, TagLinks::Tickets, *ticket.id.as_uuid(), &ticket.tags).await?;
            tx.commit().await.map_err(database)
        })
    }

    fn find_ticket(&self, id: TicketId) -> StoreFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(TICKET_COLUMNS).push(" FROM tickets WHERE id = ").push_bind(*id.as_uuid());
            let rows = qb.build().fetch_all(&self.pool).await.map_err(database)?;

            Ok(self.tickets_with_tags(&rows).await?.into_iter().next())
        })
    }

    fn list_tickets<'a>(
        &'a self,
        filter: &'a TicketFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Vec<Ticket>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(TICKET_COLUMNS).push(" FROM tickets");
            push_ticket_filter(&mut qb, filter);
            push_window(&mut qb, page)?;
            let rows = qb.build().fetch_all(&self.pool).await.map_err(database)?;

            self.tickets_with_tags(&rows).await
        })
    }

    fn count_tickets<'a>(&'a self, filter: &'a TicketFilter) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tickets");
            push_ticket_filter(&mut qb, filter);
            let total: i64 =
                qb.build_query_scalar().fetch_one(&self.pool).await.map_err(database)?;
            count_from(total)
        })
    }

    fn insert_comment<'a>(&'a self, comment: &'a Comment) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO comments (id, ticket_id, author_id, content, is_internal, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(comment.id.as_uuid())
            .bind(comment.ticket_id.as_uuid())
            .bind(comment.author_id.0)
            .bind(&comment.content)
            .bind(comment.is_internal)
            .bind(comment.created_at)
            .bind(comment.updated_at)
            .execute(&self.pool)
            .await
            .map_err(database)?;
            Ok(())
        })
    }

    fn list_comments(
        &self,
        ticket_id: TicketId,
        include_internal: bool,
    ) -> StoreFuture<'_, Vec<Comment>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, ticket_id, author_id, content, is_internal, created_at, updated_at
                FROM comments
                WHERE ticket_id = $1 AND ($2 OR NOT is_internal)
                ORDER BY created_at ASC
                ",
            )
            .bind(ticket_id.as_uuid())
            .bind(include_internal)
            .fetch_all(&self.pool)
            .await
            .map_err(database)?;

            rows.iter().map(comment_from_row).collect()
        })
    }
}

impl ArticleStore for PostgresStore {
    fn insert_article<'a>(&'a self, article: &'a KnowledgeArticle) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(database)?;

            sqlx::query(
                r"
                INSERT INTO knowledge_articles (
                    id, title, content, status, author_id, category_id, view_count,
                    published_at, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(article.id.as_uuid())
            .bind(&article.title)
            .bind(&article.content)
            .bind(article.status.as_str())
            .bind(article.author_id.0)
            .bind(article.category_id.map(|c| *c.as_uuid()))
            .bind(article.view_count)
            .bind(article.published_at)
            .bind(article.created_at)
            .bind(article.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(database)?;

            write_tag_links(&mut *tx, TagLinks::Articles, *article.id.as_uuid(), &article.tags)
                .await?;
            tx.commit().await.map_err(database)
        })
    }

    fn update_article<'a>(&'a self, article: &'a KnowledgeArticle) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(database)?;

            sqlx::query(
                r"
                UPDATE knowledge_articles SET
                    title = $2, content = $3, status = $4, category_id = $5,
                    published_at = $6, updated_at = $7
                WHERE id = $1
                ",
            )
            .bind(article.id.as_uuid())
            .bind(&article.title)
            .bind(&article.content)
            .bind(article.status.as_str())
            .bind(article.category_id.map(|c| *c.as_uuid()))
            .bind(article.published_at)
            .bind(article.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(database)?;

            write_tag_links(&mut *tx, TagLinks::Articles, *article.id.as_uuid(), &article.tags)
                .await?;
            tx.commit().await.map_err(database)
        })
    }

    fn find_article(&self, id: ArticleId) -> StoreFuture<'_, Option<KnowledgeArticle>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(ARTICLE_COLUMNS)
                .push(" FROM knowledge_articles WHERE id = ")
                .push_bind(*id.as_uuid());
            let rows = qb.build().fetch_all(&self.pool).await.map_err(database)?;

            Ok(self.articles_with_tags(&rows).await?.into_iter().next())
        })
    }

    fn list_articles<'a>(
        &'a self,
        filter: &'a ArticleFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Vec<KnowledgeArticle>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(ARTICLE_COLUMNS).push(" FROM knowledge_articles");
            push_article_filter(&mut qb, filter);
            push_window(&mut qb, page)?;
            let rows = qb.build().fetch_all(&self.pool).await.map_err(database)?;

            self.articles_with_tags(&rows).await
        })
    }

    fn count_articles<'a>(&'a self, filter: &'a ArticleFilter) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM knowledge_articles");
            push_article_filter(&mut qb, filter);
            let total: i64 =
                qb.build_query_scalar().fetch_one(&self.pool).await.map_err(database)?;
            count_from(total)
        })
    }

    fn increment_article_views(&self, id: ArticleId) -> StoreFuture<'_, i64> {
        Box::pin(async move {
            let views: Option<i64> = sqlx::query_scalar(
                r"
                UPDATE knowledge_articles
                SET view_count = view_count + 1
                WHERE id = $1
                RETURNING view_count
                ",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?;

            views.ok_or_else(|| StoreError::Database(format!("article {id} does not exist")))
        })
    }
}

impl DirectoryStore for PostgresStore {
    fn insert_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO users (id, email, name, role, team_id, password_hash, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(user.id.0)
            .bind(&user.email)
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(user.team_id.map(|t| *t.as_uuid()))
            .bind(&user.password_hash)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_violation(e, || "user email".to_string()))?;
            Ok(())
        })
    }

    fn update_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE users SET
                    email = $2, name = $3, role = $4, team_id = $5, password_hash = $6, updated_at = $7
                WHERE id = $1
                ",
            )
            .bind(user.id.0)
            .bind(&user.email)
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(user.team_id.map(|t| *t.as_uuid()))
            .bind(&user.password_hash)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_violation(e, || "user email".to_string()))?;
            Ok(())
        })
    }

    fn find_user(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(USER_COLUMNS).push(" FROM users WHERE id = ").push_bind(id.0);
            let row = qb.build().fetch_optional(&self.pool).await.map_err(database)?;

            row.as_ref().map(user_from_row).transpose()
        })
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(USER_COLUMNS).push(" FROM users WHERE email = ").push_bind(email);
            let row = qb.build().fetch_optional(&self.pool).await.map_err(database)?;

            row.as_ref().map(user_from_row).transpose()
        })
    }

    fn list_users(&self) -> StoreFuture<'_, Vec<User>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(USER_COLUMNS).push(" FROM users ORDER BY created_at ASC, id ASC");
            let rows = qb.build().fetch_all(&self.pool).await.map_err(database)?;

            rows.iter().map(user_from_row).collect()
        })
    }

    fn insert_team<'a>(&'a self, team: &'a Team) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO teams (id, name, description, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(team.id.as_uuid())
            .bind(&team.name)
            .bind(&team.description)
            .bind(team.created_at)
            .bind(team.updated_at)
            .execute(&self.pool)
            .await
            .map_err(database)?;
            Ok(())
        })
    }

    fn update_team<'a>(&'a self, team: &'a Team) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE teams SET name = $2, description = $3, updated_at = $4 WHERE id = $1")
                .bind(team.id.as_uuid())
                .bind(&team.name)
                .bind(&team.description)
                .bind(team.updated_at)
                .execute(&self.pool)
                .await
                .map_err(database)?;
            Ok(())
        })
    }

    fn find_team(&self, id: TeamId) -> StoreFuture<'_, Option<Team>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, name, description, created_at, updated_at FROM teams WHERE id = $1",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?;

            row.as_ref().map(team_from_row).transpose()
        })
    }

    fn list_teams(&self) -> StoreFuture<'_, Vec<Team>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT id, name, description, created_at, updated_at FROM teams ORDER BY name",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(database)?;

            rows.iter().map(team_from_row).collect()
        })
    }

    fn insert_category<'a>(&'a self, category: &'a Category) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO categories (id, name, type, description, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(category.kind.as_str())
            .bind(&category.description)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(database)?;
            Ok(())
        })
    }

    fn find_category(&self, id: CategoryId) -> StoreFuture<'_, Option<Category>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, name, type, description, created_at FROM categories WHERE id = $1",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?;

            row.as_ref().map(category_from_row).transpose()
        })
    }

    fn list_categories(&self) -> StoreFuture<'_, Vec<Category>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT id, name, type, description, created_at FROM categories ORDER BY name",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(database)?;

            rows.iter().map(category_from_row).collect()
        })
    }

    fn find_or_create_tag(&self, candidate: Tag) -> StoreFuture<'_, Tag> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO tags (id, name, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (name) DO NOTHING
                ",
            )
            .bind(candidate.id.as_uuid())
            .bind(&candidate.name)
            .bind(candidate.created_at)
            .execute(&self.pool)
            .await
            .map_err(database)?;

            let row = sqlx::query("SELECT id, name, created_at FROM tags WHERE name = $1")
                .bind(&candidate.name)
                .fetch_one(&self.pool)
                .await
                .map_err(database)?;

            tag_from_row(&row)
        })
    }

    fn list_tags(&self) -> StoreFuture<'_, Vec<Tag>> {
        Box::pin(async move {
            let rows = sqlx::query("SELECT id, name, created_at FROM tags ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(database)?;

            rows.iter().map(tag_from_row).collect()
        })
    }

    fn insert_sla_policy<'a>(&'a self, policy: &'a SlaPolicy) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO sla_policies (
                    id, priority, first_response_target_minutes, resolution_target_minutes,
                    pause_on_waiting_customer, timezone, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(policy.id.as_uuid())
            .bind(policy.priority.as_str())
            .bind(policy.first_response_target_minutes)
            .bind(policy.resolution_target_minutes)
            .bind(policy.pause_on_waiting_customer)
            .bind(&policy.timezone)
            .bind(policy.created_at)
            .bind(policy.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_violation(e, || format!("SLA policy for {}", policy.priority)))?;
            Ok(())
        })
    }

    fn update_sla_policy<'a>(&'a self, policy: &'a SlaPolicy) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE sla_policies SET
                    priority = $2, first_response_target_minutes = $3,
                    resolution_target_minutes = $4, pause_on_waiting_customer = $5,
                    timezone = $6, updated_at = $7
                WHERE id = $1
                ",
            )
            .bind(policy.id.as_uuid())
            .bind(policy.priority.as_str())
            .bind(policy.first_response_target_minutes)
            .bind(policy.resolution_target_minutes)
            .bind(policy.pause_on_waiting_customer)
            .bind(&policy.timezone)
            .bind(policy.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_violation(e, || format!("SLA policy for {}", policy.priority)))?;
            Ok(())
        })
    }

    fn find_sla_policy(&self, id: SlaPolicyId) -> StoreFuture<'_, Option<SlaPolicy>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(SLA_COLUMNS).push(" FROM sla_policies WHERE id = ").push_bind(*id.as_uuid());
            let row = qb.build().fetch_optional(&self.pool).await.map_err(database)?;

            row.as_ref().map(sla_policy_from_row).transpose()
        })
    }

    fn find_sla_policy_by_priority(
        &self,
        priority: TicketPriority,
    ) -> StoreFuture<'_, Option<SlaPolicy>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(SLA_COLUMNS)
                .push(" FROM sla_policies WHERE priority = ")
                .push_bind(priority.as_str());
            let row = qb.build().fetch_optional(&self.pool).await.map_err(database)?;

            row.as_ref().map(sla_policy_from_row).transpose()
        })
    }

    fn list_sla_policies(&self) -> StoreFuture<'_, Vec<SlaPolicy>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(SLA_COLUMNS).push(" FROM sla_policies");
            let rows = qb.build().fetch_all(&self.pool).await.map_err(database)?;

            let mut policies = rows.iter().map(sla_policy_from_row).collect::<Result<Vec<_>, _>>()?;
            policies.sort_by_key(|p| TicketPriority::ALL.iter().position(|q| *q == p.priority));
            Ok(policies)
        })
    }
}

impl AuditStore for PostgresStore {
    fn append_audit<'a>(&'a self, entry: &'a AuditEntry) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO audit_logs (
                    id, user_id, action, entity_type, entity_id, metadata, ip_address,
                    user_agent, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(entry.id.as_uuid())
            .bind(entry.actor_id.0)
            .bind(entry.action.as_str())
            .bind(entry.entity_type.as_str())
            .bind(entry.entity_id)
            .bind(&entry.metadata)
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .map_err(database)?;
            Ok(())
        })
    }

    fn list_audit<'a>(
        &'a self,
        filter: &'a AuditFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Vec<AuditEntry>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
            qb.push(AUDIT_COLUMNS).push(" FROM audit_logs");
            push_audit_filter(&mut qb, filter);
            push_window(&mut qb, page)?;
            let rows = qb.build().fetch_all(&self.pool).await.map_err(database)?;

            rows.iter().map(audit_from_row).collect()
        })
    }

    fn count_audit<'a>(&'a self, filter: &'a AuditFilter) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs");
            push_audit_filter(&mut qb, filter);
            let total: i64 =
                qb.build_query_scalar().fetch_one(&self.pool).await.map_err(database)?;
            count_from(total)
        })
    }
}

impl RecordStore for PostgresStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await.map_err(database)?;
            Ok(())
        })
    }
}
