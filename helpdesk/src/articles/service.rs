//! Article engine.

use super::actions::{ArticleAction, ArticleChanges, NewArticle};
use super::reducer::{view_qualifies, ArticleEnvironment, ArticleReducer, ArticleState, PublishedAtPolicy};
use crate::audit::{AuditRecorder, RequestContext};
use crate::error::{HelpdeskError, Result};
use crate::metrics;
use crate::permissions::{self, Action, Relationship};
use crate::query::{self, ArticleFilter, Page, PageRequest};
use crate::store::RecordStore;
use crate::tags::resolve_or_create_tags;
use crate::types::{require_text, ArticleId, CategoryId, KnowledgeArticle};
use helpdesk_auth::Principal;
use helpdesk_core::effect::Effect;
use helpdesk_core::environment::{Clock, IdGenerator};
use helpdesk_core::reducer::Reducer;
use helpdesk_runtime::execute_effects;
use std::sync::Arc;

/// Request to draft an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateArticle {
    /// Title
    pub title: String,
    /// Body
    pub content: String,
    /// Optional category
    pub category_id: Option<CategoryId>,
    /// Tag names
    pub tags: Vec<String>,
}

/// Request to edit an article. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateArticle {
    /// New title
    pub title: Option<String>,
    /// New body
    pub content: Option<String>,
    /// New category (`Some(None)` clears)
    pub category_id: Option<Option<CategoryId>>,
    /// Replacement tag names
    pub tags: Option<Vec<String>>,
}

/// Article publication engine.
#[derive(Clone)]
pub struct ArticleEngine {
    store: Arc<dyn RecordStore>,
    env: ArticleEnvironment,
}

impl ArticleEngine {
    /// Create an engine over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        published_at_policy: PublishedAtPolicy,
    ) -> Self {
        let audit = AuditRecorder::new(Arc::clone(&store), Arc::clone(&clock), Arc::clone(&ids));
        Self {
            store,
            env: ArticleEnvironment {
                clock,
                ids,
                audit,
                published_at_policy,
            },
        }
    }

    async fn load(&self, id: ArticleId) -> Result<KnowledgeArticle> {
        self.store
            .find_article(id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("Article", id))
    }

    async fn require_category(&self, id: Option<CategoryId>) -> Result<()> {
        if let Some(id) = id {
            if self.store.find_category(id).await?.is_none() {
                return Err(HelpdeskError::not_found("Category", id));
            }
        }
        Ok(())
    }

    fn reduce(&self, state: &mut ArticleState, action: ArticleAction) -> Result<Vec<Effect<ArticleAction>>> {
        let effects = ArticleReducer.reduce(state, action, &self.env);
        match state.last_error.take() {
            Some(error) => Err(error),
            None => Ok(effects.into_vec()),
        }
    }

    fn loaded(state: ArticleState) -> Result<KnowledgeArticle> {
        state
            .article
            .ok_or_else(|| HelpdeskError::Internal("reducer produced no article".to_string()))
    }

    /// Persist a reduced article and run its effects.
    async fn commit(&self, article: &KnowledgeArticle, effects: Vec<Effect<ArticleAction>>) -> Result<()> {
        if effects.is_empty() {
            return Ok(());
        }
        self.store.update_article(article).await?;
        execute_effects(effects).await;
        Ok(())
    }

    /// Load an article and authorize a staff command on it.
    async fn load_for(&self, principal: &Principal, id: ArticleId, action: Action) -> Result<(KnowledgeArticle, permissions::Grant)> {
        let article = self.load(id).await?;
        let grant = permissions::authorize(principal, Relationship::NotApplicable, action)?;
        Ok((article, grant))
    }

    /// Draft a new article.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::PermissionDenied`]: caller is not staff
    /// - [`HelpdeskError::Validation`]: empty title or content
    /// - [`HelpdeskError::NotFound`]: unknown category
    #[tracing::instrument(skip_all, fields(user_id = %principal.id))]
    pub async fn create(
        &self,
        principal: &Principal,
        context: RequestContext,
        request: CreateArticle,
    ) -> Result<KnowledgeArticle> {
        let grant = permissions::authorize(principal, Relationship::NotApplicable, Action::AuthorArticle)?;
        require_text("title", &request.title)?;
        require_text("content", &request.content)?;
        self.require_category(request.category_id).await?;
        let tags = resolve_or_create_tags(
            self.store.as_ref(),
            self.env.clock.as_ref(),
            self.env.ids.as_ref(),
            &request.tags,
        )
        .await?;

        let mut state = ArticleState::default();
        let effects = self.reduce(&mut state, ArticleAction::Create {
            grant,
            context,
            article: NewArticle {
                title: request.title,
                content: request.content,
                category_id: request.category_id,
                tags,
            },
        })?;
        let article = Self::loaded(state)?;

        self.store.insert_article(&article).await?;
        execute_effects(effects).await;

        tracing::info!(article_id = %article.id, "Article drafted");
        Ok(article)
    }

    /// Read one article, counting the view when it qualifies.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: no such article, or not published and the caller is a requester
    pub async fn get(&self, principal: &Principal, id: ArticleId) -> Result<KnowledgeArticle> {
        let mut article = self.load(id).await?;
        permissions::authorize(
            principal,
            Relationship::NotApplicable,
            Action::ViewArticle {
                status: article.status,
            },
        )
        .map_err(|denied| denied.into_error("Article", id))?;

        if view_qualifies(&article, principal) {
            article.view_count = self.store.increment_article_views(id).await?;
        }
        Ok(article)
    }

    /// List articles visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Storage`] if the store fails.
    pub async fn list(
        &self,
        principal: &Principal,
        filter: ArticleFilter,
        page: PageRequest,
    ) -> Result<Page<KnowledgeArticle>> {
        query::list_articles(self.store.as_ref(), principal, filter, page).await
    }

    /// Edit an article. Audits only when something changed.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: unknown article or category
    /// - [`HelpdeskError::InvalidState`]: article is archived
    /// - [`HelpdeskError::Validation`]: empty title or content
    #[tracing::instrument(skip_all, fields(user_id = %principal.id, article_id = %id))]
    pub async fn update(
        &self,
        principal: &Principal,
        context: RequestContext,
        id: ArticleId,
        request: UpdateArticle,
    ) -> Result<KnowledgeArticle> {
        let (article, grant) = self.load_for(principal, id, Action::AuthorArticle).await?;
        self.require_category(request.category_id.flatten()).await?;
        let tags = match &request.tags {
            Some(names) => Some(
                resolve_or_create_tags(
                    self.store.as_ref(),
                    self.env.clock.as_ref(),
                    self.env.ids.as_ref(),
                    names,
                )
                .await?,
            ),
            None => None,
        };

        let mut state = ArticleState::loaded(article);
        let effects = self.reduce(&mut state, ArticleAction::Update {
            grant,
            context,
            changes: ArticleChanges {
                title: request.title,
                content: request.content,
                category_id: request.category_id,
                tags,
            },
        })?;
        let article = Self::loaded(state)?;
        self.commit(&article, effects).await?;
        Ok(article)
    }

    /// Publish a draft.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: unknown article
    /// - [`HelpdeskError::InvalidState`]: already published, or archived
    #[tracing::instrument(skip_all, fields(user_id = %principal.id, article_id = %id))]
    pub async fn publish(
        &self,
        principal: &Principal,
        context: RequestContext,
        id: ArticleId,
    ) -> Result<KnowledgeArticle> {
        let (article, grant) = self.load_for(principal, id, Action::PublishArticle).await?;
        let mut state = ArticleState::loaded(article);
        let effects = self.reduce(&mut state, ArticleAction::Publish { grant, context })?;
        let article = Self::loaded(state)?;
        self.commit(&article, effects).await?;

        metrics::record_article_transition(article.status);
        tracing::info!("Article published");
        Ok(article)
    }

    /// Return a published article to draft.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: unknown article
    /// - [`HelpdeskError::InvalidState`]: article is not published
    #[tracing::instrument(skip_all, fields(user_id = %principal.id, article_id = %id))]
    pub async fn unpublish(
        &self,
        principal: &Principal,
        context: RequestContext,
        id: ArticleId,
    ) -> Result<KnowledgeArticle> {
        let (article, grant) = self.load_for(principal, id, Action::PublishArticle).await?;
        let mut state = ArticleState::loaded(article);
        let effects = self.reduce(&mut state, ArticleAction::Unpublish { grant, context })?;
        let article = Self::loaded(state)?;
        self.commit(&article, effects).await?;

        metrics::record_article_transition(article.status);
        tracing::info!("Article unpublished");
        Ok(article)
    }

    /// Archive an article. Always allowed for staff.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: unknown article
    /// - [`HelpdeskError::PermissionDenied`]: caller is not staff
    #[tracing::instrument(skip_all, fields(user_id = %principal.id, article_id = %id))]
    pub async fn archive(
        &self,
        principal: &Principal,
        context: RequestContext,
        id: ArticleId,
    ) -> Result<KnowledgeArticle> {
        let (article, grant) = self.load_for(principal, id, Action::PublishArticle).await?;
        let mut state = ArticleState::loaded(article);
        let effects = self.reduce(&mut state, ArticleAction::Archive { grant, context })?;
        let article = Self::loaded(state)?;
        self.commit(&article, effects).await?;

        metrics::record_article_transition(article.status);
        tracing::info!("Article archived");
        Ok(article)
    }
}
