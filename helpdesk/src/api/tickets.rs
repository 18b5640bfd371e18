//! Ticket endpoints.
//!
//! - POST /api/tickets
//! - GET /api/tickets
//! - GET /api/tickets/:id
//! - PATCH /api/tickets/:id
//! - POST /api/tickets/:id/transition
//! - POST /api/tickets/:id/assign
//! - POST /api/tickets/:id/comments
//! - GET /api/tickets/:id/comments
//! - GET /api/tickets/:id/sla

use super::{param, AuthUser, RequestMeta};
use crate::query::{Page, PageRequest, TicketFilter};
use crate::server::AppState;
use crate::sla::SlaStatus;
use crate::tickets::{CreateTicket, UpdateTicket};
use crate::types::{nullable, CategoryId, Comment, TeamId, Ticket, TicketId, TicketPriority, TicketStatus, UserId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use helpdesk_web::{Pagination, WebResult};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /api/tickets`.
#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    /// Short summary
    pub title: String,
    /// Full description
    pub description: String,
    /// Priority
    pub priority: TicketPriority,
    /// Optional category
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Tag names
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of `PATCH /api/tickets/:id`.
///
/// Absent fields are left alone; `null` clears a nullable field.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicketRequest {
    /// New title
    #[serde(default)]
    pub title: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<String>,
    /// New priority
    #[serde(default)]
    pub priority: Option<TicketPriority>,
    /// New category
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<CategoryId>>,
    /// New assignee
    #[serde(default, deserialize_with = "nullable")]
    pub assignee_id: Option<Option<UserId>>,
    /// New team
    #[serde(default, deserialize_with = "nullable")]
    pub assigned_team_id: Option<Option<TeamId>>,
    /// Replacement tag names
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Body of `POST /api/tickets/:id/transition`.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Target status
    pub status: TicketStatus,
}

/// Body of `POST /api/tickets/:id/assign`.
///
/// Both fields are overwritten; an absent or `null` field unassigns.
#[derive(Debug, Default, Deserialize)]
pub struct AssignRequest {
    /// Operator to assign
    #[serde(default)]
    pub assignee_id: Option<UserId>,
    /// Team to assign
    #[serde(default)]
    pub assigned_team_id: Option<TeamId>,
}

/// Body of `POST /api/tickets/:id/comments`.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    /// Comment text
    pub content: String,
    /// Staff-only note
    #[serde(default)]
    pub is_internal: bool,
}

fn ticket_filter(params: &HashMap<String, String>) -> WebResult<TicketFilter> {
    Ok(TicketFilter {
        status: param(params, "status")?,
        priority: param(params, "priority")?,
        assignee_id: param::<Uuid>(params, "assignee_id")?.map(UserId),
        category_id: param::<Uuid>(params, "category_id")?.map(CategoryId::from_uuid),
        requester_id: param::<Uuid>(params, "requester_id")?.map(UserId),
        search: params.get("search").filter(|s| !s.is_empty()).cloned(),
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// Raise a ticket. The caller becomes the requester.
pub async fn create_ticket(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    RequestMeta(context): RequestMeta,
    Json(request): Json<CreateTicketRequest>,
) -> WebResult<(StatusCode, Json<Ticket>)> {
    let ticket = state
        .tickets
        .create(&principal, context, CreateTicket {
            title: request.title,
            description: request.description,
            priority: request.priority,
            category_id: request.category_id,
            tags: request.tags,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

/// List tickets, newest first.
///
/// Filters: `status`, `priority`, `assignee_id`, `category_id`,
/// `requester_id`, `search`; paging with `skip` and `limit`. Requesters only
/// ever see their own tickets.
///
/// ```bash
/// curl "http://localhost:8000/api/tickets?status=OPEN&limit=10" \
///   -H "Authorization: Bearer <token>"
/// ```
pub async fn list_tickets(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    pagination: Pagination,
    Query(params): Query<HashMap<String, String>>,
) -> WebResult<Json<Page<Ticket>>> {
    let filter = ticket_filter(&params)?;
    let page = PageRequest::new(pagination.skip, pagination.limit)?;

    Ok(Json(state.tickets.list(&principal, filter, page).await?))
}

/// Read one ticket.
pub async fn get_ticket(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> WebResult<Json<Ticket>> {
    Ok(Json(state.tickets.get(&principal, TicketId::from_uuid(id)).await?))
}

/// Edit ticket fields. Staff only.
pub async fn update_ticket(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    RequestMeta(context): RequestMeta,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTicketRequest>,
) -> WebResult<Json<Ticket>> {
    let ticket = state
        .tickets
        .update(&principal, context, TicketId::from_uuid(id), UpdateTicket {
            title: request.title,
            description: request.description,
            priority: request.priority,
            category_id: request.category_id,
            assignee_id: request.assignee_id,
            assigned_team_id: request.assigned_team_id,
            tags: request.tags,
        })
        .await?;

    Ok(Json(ticket))
}

/// Move a ticket to another status.
///
/// ```bash
/// curl -X POST http://localhost:8000/api/tickets/<id>/transition \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"status": "WAITING_CUSTOMER"}'
/// ```
pub async fn transition_ticket(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    RequestMeta(context): RequestMeta,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> WebResult<Json<Ticket>> {
    let ticket = state
        .tickets
        .transition(&principal, context, TicketId::from_uuid(id), request.status)
        .await?;

    Ok(Json(ticket))
}

/// Overwrite assignee and team. Staff only.
pub async fn assign_ticket(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    RequestMeta(context): RequestMeta,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignRequest>,
) -> WebResult<Json<Ticket>> {
    let ticket = state
        .tickets
        .assign(
            &principal,
            context,
            TicketId::from_uuid(id),
            request.assignee_id,
            request.assigned_team_id,
        )
        .await?;

    Ok(Json(ticket))
}

/// Post a comment.
pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    RequestMeta(context): RequestMeta,
    Path(id): Path<Uuid>,
    Json(request): Json<CommentRequest>,
) -> WebResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .tickets
        .add_comment(
            &principal,
            context,
            TicketId::from_uuid(id),
            request.content,
            request.is_internal,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Comments on a ticket, oldest first. Internal notes are staff only.
pub async fn list_comments(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> WebResult<Json<Vec<Comment>>> {
    Ok(Json(state.tickets.list_comments(&principal, TicketId::from_uuid(id)).await?))
}

/// SLA standing of a ticket.
pub async fn ticket_sla(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> WebResult<Json<SlaStatus>> {
    Ok(Json(state.tickets.sla(&principal, TicketId::from_uuid(id)).await?))
}
