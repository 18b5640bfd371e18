//! Administration endpoints.
//!
//! - GET/POST /api/admin/users, PATCH /api/admin/users/:id
//! - GET/POST /api/admin/teams, PATCH /api/admin/teams/:id
//! - GET/POST /api/admin/categories
//! - GET/POST /api/admin/tags
//! - GET/POST /api/admin/sla-settings, PATCH /api/admin/sla-settings/:id
//! - GET /api/admin/audit-logs

use super::{param, AuthUser};
use crate::admin::{
    CreateCategory, CreateSlaPolicy, CreateTeam, CreateUser, UpdateSlaPolicy, UpdateTeam, UpdateUser,
};
use crate::audit::AuditEntry;
use crate::query::{AuditFilter, Page, PageRequest};
use crate::server::AppState;
use crate::types::{Category, SlaPolicy, SlaPolicyId, Tag, Team, TeamId, User, UserId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use helpdesk_web::{Pagination, WebResult};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Body of `POST /api/admin/tags`.
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    /// Tag name, matched exactly
    pub name: String,
}

// ----------------------------------------------------------------------------
// Users
// ----------------------------------------------------------------------------

/// One page of users. Admin only.
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    pagination: Pagination,
) -> WebResult<Json<Vec<User>>> {
    let page = PageRequest::new(pagination.skip, pagination.limit)?;
    Ok(Json(state.admin.list_users(&principal, page).await?))
}

/// Create an account. Admin only.
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(request): Json<CreateUser>,
) -> WebResult<(StatusCode, Json<User>)> {
    let user = state.admin.create_user(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Edit an account. Admin only.
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUser>,
) -> WebResult<Json<User>> {
    Ok(Json(state.admin.update_user(&principal, UserId(id), request).await?))
}

// ----------------------------------------------------------------------------
// Teams
// ----------------------------------------------------------------------------

/// All teams.
pub async fn list_teams(State(state): State<AppState>, AuthUser(principal): AuthUser) -> WebResult<Json<Vec<Team>>> {
    Ok(Json(state.admin.list_teams(&principal).await?))
}

/// Create a team. Admin only.
pub async fn create_team(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(request): Json<CreateTeam>,
) -> WebResult<(StatusCode, Json<Team>)> {
    let team = state.admin.create_team(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// Edit a team. Admin only.
pub async fn update_team(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTeam>,
) -> WebResult<Json<Team>> {
    Ok(Json(state.admin.update_team(&principal, TeamId::from_uuid(id), request).await?))
}

// ----------------------------------------------------------------------------
// Categories and tags
// ----------------------------------------------------------------------------

/// All categories.
pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> WebResult<Json<Vec<Category>>> {
    Ok(Json(state.admin.list_categories(&principal).await?))
}

/// Create a category. Admin only.
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(request): Json<CreateCategory>,
) -> WebResult<(StatusCode, Json<Category>)> {
    let category = state.admin.create_category(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// All tags.
pub async fn list_tags(State(state): State<AppState>, AuthUser(principal): AuthUser) -> WebResult<Json<Vec<Tag>>> {
    Ok(Json(state.admin.list_tags(&principal).await?))
}

/// Find or create a tag by name. Open to everyone.
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(request): Json<CreateTagRequest>,
) -> WebResult<(StatusCode, Json<Tag>)> {
    let tag = state.admin.create_tag(&principal, request.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

// ----------------------------------------------------------------------------
// SLA settings
// ----------------------------------------------------------------------------

/// All SLA policies.
pub async fn list_sla_settings(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> WebResult<Json<Vec<SlaPolicy>>> {
    Ok(Json(state.admin.list_sla_policies(&principal).await?))
}

/// Create the policy for a priority. Admin only.
pub async fn create_sla_settings(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(request): Json<CreateSlaPolicy>,
) -> WebResult<(StatusCode, Json<SlaPolicy>)> {
    let policy = state.admin.create_sla_policy(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(policy)))
}

/// Edit an SLA policy. Admin only.
pub async fn update_sla_settings(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSlaPolicy>,
) -> WebResult<Json<SlaPolicy>> {
    let policy = state
        .admin
        .update_sla_policy(&principal, SlaPolicyId::from_uuid(id), request)
        .await?;
    Ok(Json(policy))
}

// ----------------------------------------------------------------------------
// Audit log
// ----------------------------------------------------------------------------

/// Read the audit log, newest first. Admin only.
///
/// Filters: `entity_type`, `entity_id`, `action`; paging with `skip` and
/// `limit` (default 50).
pub async fn list_audit_logs(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    pagination: Pagination,
    Query(params): Query<HashMap<String, String>>,
) -> WebResult<Json<Page<AuditEntry>>> {
    let filter = AuditFilter {
        entity_type: param(&params, "entity_type")?,
        entity_id: param(&params, "entity_id")?,
        action: param(&params, "action")?,
    };
    let page = PageRequest::audit(pagination.skip, pagination.limit)?;

    Ok(Json(state.admin.audit_logs(&principal, filter, page).await?))
}
