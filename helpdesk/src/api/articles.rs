//! Knowledge-base endpoints.
//!
//! - POST /api/articles
//! - GET /api/articles
//! - GET /api/articles/:id
//! - PATCH /api/articles/:id
//! - DELETE /api/articles/:id (archives)
//! - POST /api/articles/:id/publish
//! - POST /api/articles/:id/unpublish

use super::{param, AuthUser, RequestMeta};
use crate::articles::{CreateArticle, UpdateArticle};
use crate::query::{ArticleFilter, Page, PageRequest};
use crate::server::AppState;
use crate::types::{nullable, ArticleId, CategoryId, KnowledgeArticle, UserId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use helpdesk_web::{Pagination, WebResult};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Body of `POST /api/articles`.
#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    /// Title
    pub title: String,
    /// Body
    pub content: String,
    /// Optional category
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Tag names
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of `PATCH /api/articles/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateArticleRequest {
    /// New title
    #[serde(default)]
    pub title: Option<String>,
    /// New body
    #[serde(default)]
    pub content: Option<String>,
    /// New category; `null` clears
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<CategoryId>>,
    /// Replacement tag names
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

fn article_filter(params: &HashMap<String, String>) -> WebResult<ArticleFilter> {
    Ok(ArticleFilter {
        status: param(params, "status")?,
        author_id: param::<Uuid>(params, "author_id")?.map(UserId),
        category_id: param::<Uuid>(params, "category_id")?.map(CategoryId::from_uuid),
        search: params.get("search").filter(|s| !s.is_empty()).cloned(),
    })
}

/// Draft an article. Staff only.
pub async fn create_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    RequestMeta(context): RequestMeta,
    Json(request): Json<CreateArticleRequest>,
) -> WebResult<(StatusCode, Json<KnowledgeArticle>)> {
    let article = state
        .articles
        .create(&principal, context, CreateArticle {
            title: request.title,
            content: request.content,
            category_id: request.category_id,
            tags: request.tags,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(article)))
}

/// List articles, newest first. Requesters only see published ones.
pub async fn list_articles(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    pagination: Pagination,
    Query(params): Query<HashMap<String, String>>,
) -> WebResult<Json<Page<KnowledgeArticle>>> {
    let filter = article_filter(&params)?;
    let page = PageRequest::new(pagination.skip, pagination.limit)?;

    Ok(Json(state.articles.list(&principal, filter, page).await?))
}

/// Read one article, counting the view.
pub async fn get_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> WebResult<Json<KnowledgeArticle>> {
    Ok(Json(state.articles.get(&principal, ArticleId::from_uuid(id)).await?))
}

/// Edit an article. Staff only; archived articles are frozen.
pub async fn update_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    RequestMeta(context): RequestMeta,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateArticleRequest>,
) -> WebResult<Json<KnowledgeArticle>> {
    let article = state
        .articles
        .update(&principal, context, ArticleId::from_uuid(id), UpdateArticle {
            title: request.title,
            content: request.content,
            category_id: request.category_id,
            tags: request.tags,
        })
        .await?;

    Ok(Json(article))
}

/// Publish a draft.
pub async fn publish_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    RequestMeta(context): RequestMeta,
    Path(id): Path<Uuid>,
) -> WebResult<Json<KnowledgeArticle>> {
    Ok(Json(
        state.articles.publish(&principal, context, ArticleId::from_uuid(id)).await?,
    ))
}

/// Return a published article to draft.
pub async fn unpublish_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    RequestMeta(context): RequestMeta,
    Path(id): Path<Uuid>,
) -> WebResult<Json<KnowledgeArticle>> {
    Ok(Json(
        state.articles.unpublish(&principal, context, ArticleId::from_uuid(id)).await?,
    ))
}

/// Archive an article. Answers 204.
pub async fn archive_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    RequestMeta(context): RequestMeta,
    Path(id): Path<Uuid>,
) -> WebResult<StatusCode> {
    state.articles.archive(&principal, context, ArticleId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
