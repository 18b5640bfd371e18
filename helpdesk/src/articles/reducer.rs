//! Article publication reducer.
//!
//! `DRAFT <-> PUBLISHED -> ARCHIVED`. Archived is terminal: archived articles
//! can be neither edited nor published again.

use super::actions::{ArticleAction, ArticleChanges, NewArticle};
use crate::audit::{AuditAction, AuditRecorder, EntityType, RequestContext};
use crate::error::HelpdeskError;
use crate::permissions::{Action, Grant};
use crate::tags::sorted_names;
use crate::types::{require_text, ArticleId, ArticleStatus, KnowledgeArticle};
use helpdesk_auth::Principal;
use helpdesk_core::environment::{Clock, IdGenerator};
use helpdesk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// When publishing stamps `published_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublishedAtPolicy {
    /// Only the first publication stamps it
    #[default]
    FirstPublishOnly,
    /// Every publication restamps it
    EveryPublish,
}

impl FromStr for PublishedAtPolicy {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_publish_only" => Ok(Self::FirstPublishOnly),
            "every_publish" => Ok(Self::EveryPublish),
            other => Err(HelpdeskError::validation(format!(
                "invalid published-at policy: {other} (expected first_publish_only or every_publish)"
            ))),
        }
    }
}

impl fmt::Display for PublishedAtPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstPublishOnly => f.write_str("first_publish_only"),
            Self::EveryPublish => f.write_str("every_publish"),
        }
    }
}

/// Whether a read by `reader` counts towards `view_count`.
#[must_use]
pub fn view_qualifies(article: &KnowledgeArticle, reader: &Principal) -> bool {
    article.status == ArticleStatus::Published && article.author_id != reader.id
}

/// State the article reducer works on.
#[derive(Debug, Clone, Default)]
pub struct ArticleState {
    /// The loaded article, `None` before creation
    pub article: Option<KnowledgeArticle>,
    /// Why the last command was rejected
    pub last_error: Option<HelpdeskError>,
}

impl ArticleState {
    /// State for an existing article.
    #[must_use]
    pub fn loaded(article: KnowledgeArticle) -> Self {
        Self {
            article: Some(article),
            last_error: None,
        }
    }
}

/// Dependencies of the article reducer.
#[derive(Clone)]
pub struct ArticleEnvironment {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Identity source
    pub ids: Arc<dyn IdGenerator>,
    /// Audit effect builder
    pub audit: AuditRecorder,
    /// `published_at` behaviour
    pub published_at_policy: PublishedAtPolicy,
}

/// Reducer for article publication.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleReducer;

type Effects = SmallVec<[Effect<ArticleAction>; 4]>;

impl ArticleReducer {
    fn require(grant: &Grant, action: Action) -> Result<(), HelpdeskError> {
        if grant.covers(&action) {
            Ok(())
        } else {
            Err(HelpdeskError::PermissionDenied(format!(
                "grant for {} does not cover {action}",
                grant.action()
            )))
        }
    }

    fn validate_create(state: &ArticleState, grant: &Grant, article: &NewArticle) -> Result<(), HelpdeskError> {
        if state.article.is_some() {
            return Err(HelpdeskError::invalid_state("article already exists"));
        }
        Self::require(grant, Action::AuthorArticle)?;
        require_text("title", &article.title)?;
        require_text("content", &article.content)
    }

    fn validate_update(article: &KnowledgeArticle, grant: &Grant, changes: &ArticleChanges) -> Result<(), HelpdeskError> {
        Self::require(grant, Action::AuthorArticle)?;
        if article.status == ArticleStatus::Archived {
            return Err(HelpdeskError::invalid_state("archived articles cannot be edited"));
        }
        if let Some(title) = &changes.title {
            require_text("title", title)?;
        }
        if let Some(content) = &changes.content {
            require_text("content", content)?;
        }
        Ok(())
    }

    fn validate_publish(article: &KnowledgeArticle, grant: &Grant) -> Result<(), HelpdeskError> {
        Self::require(grant, Action::PublishArticle)?;
        match article.status {
            ArticleStatus::Draft => Ok(()),
            ArticleStatus::Published => Err(HelpdeskError::invalid_state("article is already published")),
            ArticleStatus::Archived => {
                Err(HelpdeskError::invalid_state("archived articles cannot be published"))
            },
        }
    }

    fn validate_unpublish(article: &KnowledgeArticle, grant: &Grant) -> Result<(), HelpdeskError> {
        Self::require(grant, Action::PublishArticle)?;
        if article.status == ArticleStatus::Published {
            Ok(())
        } else {
            Err(HelpdeskError::invalid_state("only published articles can be unpublished"))
        }
    }

    fn effective_changes(article: &KnowledgeArticle, requested: ArticleChanges) -> (ArticleChanges, Value, Value) {
        let mut effective = ArticleChanges::default();
        let mut old = Map::new();
        let mut new = Map::new();

        if let Some(title) = requested.title.filter(|t| *t != article.title) {
            old.insert("title".to_string(), json!(article.title));
            new.insert("title".to_string(), json!(title));
            effective.title = Some(title);
        }
        if let Some(content) = requested.content.filter(|c| *c != article.content) {
            old.insert("content".to_string(), json!(article.content));
            new.insert("content".to_string(), json!(content));
            effective.content = Some(content);
        }
        if let Some(category_id) = requested.category_id.filter(|c| *c != article.category_id) {
            old.insert("category_id".to_string(), json!(article.category_id));
            new.insert("category_id".to_string(), json!(category_id));
            effective.category_id = Some(category_id);
        }
        if let Some(tags) = requested.tags {
            let (before, after) = (sorted_names(&article.tags), sorted_names(&tags));
            if before != after {
                old.insert("tags".to_string(), json!(before));
                new.insert("tags".to_string(), json!(after));
                effective.tags = Some(tags);
            }
        }

        (effective, Value::Object(old), Value::Object(new))
    }

    fn apply_event(state: &mut ArticleState, action: &ArticleAction) {
        match action {
            ArticleAction::Created { article } => {
                state.article = Some((**article).clone());
                state.last_error = None;
            },
            ArticleAction::Updated { changes, at } => {
                if let Some(article) = state.article.as_mut() {
                    if let Some(title) = &changes.title {
                        article.title.clone_from(title);
                    }
                    if let Some(content) = &changes.content {
                        article.content.clone_from(content);
                    }
                    if let Some(category_id) = changes.category_id {
                        article.category_id = category_id;
                    }
                    if let Some(tags) = &changes.tags {
                        article.tags.clone_from(tags);
                    }
                    article.updated_at = *at;
                }
                state.last_error = None;
            },
            ArticleAction::Published { published_at, at } => {
                if let Some(article) = state.article.as_mut() {
                    article.status = ArticleStatus::Published;
                    article.published_at = *published_at;
                    article.updated_at = *at;
                }
                state.last_error = None;
            },
            ArticleAction::Unpublished { at } => {
                if let Some(article) = state.article.as_mut() {
                    article.status = ArticleStatus::Draft;
                    article.updated_at = *at;
                }
                state.last_error = None;
            },
            ArticleAction::Archived { at } => {
                if let Some(article) = state.article.as_mut() {
                    article.status = ArticleStatus::Archived;
                    article.updated_at = *at;
                }
                state.last_error = None;
            },
            ArticleAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            // Commands are not applied
            ArticleAction::Create { .. }
            | ArticleAction::Update { .. }
            | ArticleAction::Publish { .. }
            | ArticleAction::Unpublish { .. }
            | ArticleAction::Archive { .. } => {},
        }
    }

    fn reject(state: &mut ArticleState, error: HelpdeskError) -> Effects {
        Self::apply_event(state, &ArticleAction::ValidationFailed { error });
        SmallVec::new()
    }

    fn not_loaded() -> HelpdeskError {
        HelpdeskError::Internal("no article loaded".to_string())
    }

    fn audit(
        env: &ArticleEnvironment,
        grant: &Grant,
        context: &RequestContext,
        action: AuditAction,
        article: ArticleId,
        metadata: Value,
    ) -> Effects {
        smallvec![env.audit.record(
            grant.actor().id,
            context,
            action,
            EntityType::Article,
            *article.as_uuid(),
            metadata,
        )]
    }
}

impl Reducer for ArticleReducer {
    type State = ArticleState;
    type Action = ArticleAction;
    type Environment = ArticleEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per command
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            ArticleAction::Create {
                grant,
                context,
                article,
            } => {
                if let Err(error) = Self::validate_create(state, &grant, &article) {
                    return Self::reject(state, error);
                }

                let now = env.clock.now();
                let created = KnowledgeArticle {
                    id: ArticleId::from_uuid(env.ids.next_id()),
                    title: article.title,
                    content: article.content,
                    status: ArticleStatus::Draft,
                    author_id: grant.actor().id,
                    category_id: article.category_id,
                    view_count: 0,
                    published_at: None,
                    tags: article.tags,
                    created_at: now,
                    updated_at: now,
                };
                let id = created.id;
                let metadata = json!({ "title": created.title, "status": ArticleStatus::Draft });

                Self::apply_event(state, &ArticleAction::Created {
                    article: Box::new(created),
                });
                Self::audit(env, &grant, &context, AuditAction::ArticleCreated, id, metadata)
            },

            ArticleAction::Update {
                grant,
                context,
                changes,
            } => {
                let Some(article) = state.article.as_ref() else {
                    return Self::reject(state, Self::not_loaded());
                };
                if let Err(error) = Self::validate_update(article, &grant, &changes) {
                    return Self::reject(state, error);
                }

                let id = article.id;
                let (effective, old, new) = Self::effective_changes(article, changes);
                if effective == ArticleChanges::default() {
                    state.last_error = None;
                    return SmallVec::new();
                }

                Self::apply_event(state, &ArticleAction::Updated {
                    changes: effective,
                    at: env.clock.now(),
                });
                let metadata = json!({ "old": old, "new": new });
                Self::audit(env, &grant, &context, AuditAction::ArticleUpdated, id, metadata)
            },

            ArticleAction::Publish { grant, context } => {
                let Some(article) = state.article.as_ref() else {
                    return Self::reject(state, Self::not_loaded());
                };
                if let Err(error) = Self::validate_publish(article, &grant) {
                    return Self::reject(state, error);
                }

                let now = env.clock.now();
                let published_at = match env.published_at_policy {
                    PublishedAtPolicy::FirstPublishOnly => article.published_at.or(Some(now)),
                    PublishedAtPolicy::EveryPublish => Some(now),
                };
                let (id, metadata) = (article.id, json!({ "title": article.title }));

                Self::apply_event(state, &ArticleAction::Published { published_at, at: now });
                Self::audit(env, &grant, &context, AuditAction::ArticlePublished, id, metadata)
            },

            ArticleAction::Unpublish { grant, context } => {
                let Some(article) = state.article.as_ref() else {
                    return Self::reject(state, Self::not_loaded());
                };
                if let Err(error) = Self::validate_unpublish(article, &grant) {
                    return Self::reject(state, error);
                }
                let (id, metadata) = (article.id, json!({ "title": article.title }));

                Self::apply_event(state, &ArticleAction::Unpublished { at: env.clock.now() });
                Self::audit(env, &grant, &context, AuditAction::ArticleUnpublished, id, metadata)
            },

            ArticleAction::Archive { grant, context } => {
                let Some(article) = state.article.as_ref() else {
                    return Self::reject(state, Self::not_loaded());
                };
                if let Err(error) = Self::require(&grant, Action::PublishArticle) {
                    return Self::reject(state, error);
                }
                let (id, metadata) = (article.id, json!({ "title": article.title }));

                Self::apply_event(state, &ArticleAction::Archived { at: env.clock.now() });
                Self::audit(env, &grant, &context, AuditAction::ArticleArchived, id, metadata)
            },

            // ========== Events ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}
