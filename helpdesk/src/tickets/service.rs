//! Ticket engine: loads, authorizes, reduces, persists, audits.

use super::actions::{NewTicket, TicketAction, TicketChanges};
use super::reducer::{TicketEnvironment, TicketReducer, TicketState};
use crate::audit::{AuditRecorder, RequestContext};
use crate::error::{HelpdeskError, Result};
use crate::metrics;
use crate::permissions::{self, Action, Relationship};
use crate::query::{self, Page, PageRequest, TicketFilter};
use crate::sla::{self, SlaStatus};
use crate::store::RecordStore;
use crate::tags::resolve_or_create_tags;
use crate::types::{
    require_text, CategoryId, Comment, TeamId, Ticket, TicketId, TicketPriority, TicketStatus,
    UserId,
};
use helpdesk_auth::Principal;
use helpdesk_core::effect::Effect;
use helpdesk_core::environment::{Clock, IdGenerator};
use helpdesk_core::reducer::Reducer;
use helpdesk_runtime::execute_effects;
use std::sync::Arc;

/// Request to raise a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTicket {
    /// Short summary
    pub title: String,
    /// Full description
    pub description: String,
    /// Priority
    pub priority: TicketPriority,
    /// Optional category
    pub category_id: Option<CategoryId>,
    /// Tag names, resolved or created on the fly
    pub tags: Vec<String>,
}

/// Request to edit a ticket. `None` leaves a field unchanged; for the
/// doubly optional fields `Some(None)` clears.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTicket {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New priority
    pub priority: Option<TicketPriority>,
    /// New category
    pub category_id: Option<Option<CategoryId>>,
    /// New assignee
    pub assignee_id: Option<Option<UserId>>,
    /// New team
    pub assigned_team_id: Option<Option<TeamId>>,
    /// Replacement tag names
    pub tags: Option<Vec<String>>,
}

/// Ticket lifecycle engine.
///
/// Every mutation follows the same path: load the ticket, authorize the
/// caller, run [`TicketReducer`], persist, then execute the audit effect.
#[derive(Clone)]
pub struct TicketEngine {
    store: Arc<dyn RecordStore>,
    env: TicketEnvironment,
}

impl TicketEngine {
    /// Create an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        let audit = AuditRecorder::new(Arc::clone(&store), Arc::clone(&clock), Arc::clone(&ids));
        Self {
            store,
            env: TicketEnvironment::new(clock, ids, audit),
        }
    }

    async fn load(&self, id: TicketId) -> Result<Ticket> {
        self.store
            .find_ticket(id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("Ticket", id))
    }

    async fn require_category(&self, id: Option<CategoryId>) -> Result<()> {
        if let Some(id) = id {
            if self.store.find_category(id).await?.is_none() {
                return Err(HelpdeskError::not_found("Category", id));
            }
        }
        Ok(())
    }

    async fn require_user(&self, id: Option<UserId>) -> Result<()> {
        if let Some(id) = id {
            if self.store.find_user(id).await?.is_none() {
                return Err(HelpdeskError::not_found("User", id));
            }
        }
        Ok(())
    }

    async fn require_team(&self, id: Option<TeamId>) -> Result<()> {
        if let Some(id) = id {
            if self.store.find_team(id).await?.is_none() {
                return Err(HelpdeskError::not_found("Team", id));
            }
        }
        Ok(())
    }

    /// Run one command through the reducer, surfacing its rejection.
    fn reduce(&self, state: &mut TicketState, action: TicketAction) -> Result<Vec<Effect<TicketAction>>> {
        let effects = TicketReducer.reduce(state, action, &self.env);
        match state.last_error.take() {
            Some(error) => Err(error),
            None => Ok(effects.into_vec()),
        }
    }

    fn loaded(state: TicketState) -> Result<Ticket> {
        state
            .ticket
            .ok_or_else(|| HelpdeskError::Internal("reducer produced no ticket".to_string()))
    }

    /// Raise a ticket.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::Validation`]: empty title or description, blank tag name
    /// - [`HelpdeskError::NotFound`]: unknown category
    #[tracing::instrument(skip_all, fields(user_id = %principal.id))]
    pub async fn create(
        &self,
        principal: &Principal,
        context: RequestContext,
        request: CreateTicket,
    ) -> Result<Ticket> {
        let grant = permissions::authorize(principal, Relationship::NotApplicable, Action::CreateTicket)?;
        require_text("title", &request.title)?;
        require_text("description", &request.description)?;
        self.require_category(request.category_id).await?;

        let tags = resolve_or_create_tags(
            self.store.as_ref(),
            self.env.clock.as_ref(),
            self.env.ids.as_ref(),
            &request.tags,
        )
        .await?;
        let ticket_number = self.store.next_ticket_number().await?;

        let mut state = TicketState::default();
        let effects = self.reduce(&mut state, TicketAction::Create {
            grant,
            context,
            ticket: NewTicket {
                ticket_number,
                title: request.title,
                description: request.description,
                priority: request.priority,
                category_id: request.category_id,
                tags,
            },
        })?;
        let ticket = Self::loaded(state)?;

        self.store.insert_ticket(&ticket).await?;
        execute_effects(effects).await;

        metrics::record_ticket_created(ticket.priority);
        tracing::info!(ticket_id = %ticket.id, ticket_number = %ticket.ticket_number, "Ticket created");
        Ok(ticket)
    }

    /// Read one ticket.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: no such ticket
    /// - [`HelpdeskError::PermissionDenied`]: requester reading someone else's ticket
    pub async fn get(&self, principal: &Principal, id: TicketId) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        permissions::authorize(
            principal,
            Relationship::between(principal.id, ticket.requester_id),
            Action::ViewTicket,
        )
        .map_err(|denied| denied.into_error("Ticket", id))?;
        Ok(ticket)
    }

    /// List tickets visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Storage`] if the store fails.
    pub async fn list(
        &self,
        principal: &Principal,
        filter: TicketFilter,
        page: PageRequest,
    ) -> Result<Page<Ticket>> {
        query::list_tickets(self.store.as_ref(), principal, filter, page).await
    }

    /// Move a ticket to `to`, doing the SLA bookkeeping.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: no such ticket
    /// - [`HelpdeskError::PermissionDenied`]: transition not allowed for the caller
    #[tracing::instrument(skip_all, fields(user_id = %principal.id, ticket_id = %id, to = %to))]
    pub async fn transition(
        &self,
        principal: &Principal,
        context: RequestContext,
        id: TicketId,
        to: TicketStatus,
    ) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        let from = ticket.status;
        let grant = permissions::authorize(
            principal,
            Relationship::between(principal.id, ticket.requester_id),
            Action::TransitionTicket { from, to },
        )?;

        let mut state = TicketState::loaded(ticket);
        let effects = self.reduce(&mut state, TicketAction::Transition { grant, context, to })?;
        let ticket = Self::loaded(state)?;

        self.store.update_ticket(&ticket).await?;
        execute_effects(effects).await;

        metrics::record_ticket_transition(from, to);
        tracing::info!(from = %from, "Ticket status changed");
        Ok(ticket)
    }

    /// Overwrite assignee and team. A `None` clears the field.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: unknown ticket, user or team
    /// - [`HelpdeskError::PermissionDenied`]: caller is not staff
    #[tracing::instrument(skip_all, fields(user_id = %principal.id, ticket_id = %id))]
    pub async fn assign(
        &self,
        principal: &Principal,
        context: RequestContext,
        id: TicketId,
        assignee_id: Option<UserId>,
        assigned_team_id: Option<TeamId>,
    ) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        let grant = permissions::authorize(
            principal,
            Relationship::between(principal.id, ticket.requester_id),
            Action::AssignTicket,
        )?;
        self.require_user(assignee_id).await?;
        self.require_team(assigned_team_id).await?;

        let mut state = TicketState::loaded(ticket);
        let effects = self.reduce(&mut state, TicketAction::Assign {
            grant,
            context,
            assignee_id,
            assigned_team_id,
        })?;
        let ticket = Self::loaded(state)?;

        self.store.update_ticket(&ticket).await?;
        execute_effects(effects).await;

        tracing::info!("Ticket assigned");
        Ok(ticket)
    }

    /// Post a comment; a staff member's first public reply stamps `first_response_at`.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: no such ticket
    /// - [`HelpdeskError::PermissionDenied`]: not the caller's ticket, or internal note by a requester
    /// - [`HelpdeskError::Validation`]: empty content
    #[tracing::instrument(skip_all, fields(user_id = %principal.id, ticket_id = %id))]
    pub async fn add_comment(
        &self,
        principal: &Principal,
        context: RequestContext,
        id: TicketId,
        content: String,
        is_internal: bool,
    ) -> Result<Comment> {
        let ticket = self.load(id).await?;
        let relationship = Relationship::between(principal.id, ticket.requester_id);
        permissions::authorize(principal, relationship, Action::ViewTicket)
            .map_err(|denied| denied.into_error("Ticket", id))?;
        let grant = permissions::authorize(principal, relationship, Action::CommentOnTicket {
            internal: is_internal,
        })?;

        let answered = ticket.first_response_at.is_some();
        let mut state = TicketState::loaded(ticket);
        let effects = self.reduce(&mut state, TicketAction::AddComment {
            grant,
            context,
            content,
            is_internal,
        })?;
        let comment = state
            .last_comment
            .take()
            .ok_or_else(|| HelpdeskError::Internal("reducer produced no comment".to_string()))?;
        let ticket = Self::loaded(state)?;

        self.store.insert_comment(&comment).await?;
        if !answered && ticket.first_response_at.is_some() {
            self.store.update_ticket(&ticket).await?;
        }
        execute_effects(effects).await;

        tracing::info!(comment_id = %comment.id, is_internal, "Comment added");
        Ok(comment)
    }

    /// Comments on a ticket, oldest first. Internal notes only for staff.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: no such ticket
    /// - [`HelpdeskError::PermissionDenied`]: requester reading someone else's ticket
    pub async fn list_comments(&self, principal: &Principal, id: TicketId) -> Result<Vec<Comment>> {
        let ticket = self.get(principal, id).await?;
        let include_internal = permissions::authorize(
            principal,
            Relationship::between(principal.id, ticket.requester_id),
            Action::ViewInternalComments,
        )
        .is_ok();

        Ok(self.store.list_comments(id, include_internal).await?)
    }

    /// Patch ticket fields. Audits and bumps `updated_at` only when something changed.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: unknown ticket, category, user or team
    /// - [`HelpdeskError::PermissionDenied`]: caller is not staff
    /// - [`HelpdeskError::Validation`]: empty title/description, blank tag name
    #[tracing::instrument(skip_all, fields(user_id = %principal.id, ticket_id = %id))]
    pub async fn update(
        &self,
        principal: &Principal,
        context: RequestContext,
        id: TicketId,
        request: UpdateTicket,
    ) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        let grant = permissions::authorize(
            principal,
            Relationship::between(principal.id, ticket.requester_id),
            Action::EditTicket,
        )?;
        self.require_category(request.category_id.flatten()).await?;
        self.require_user(request.assignee_id.flatten()).await?;
        self.require_team(request.assigned_team_id.flatten()).await?;

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

        let mut state = TicketState::loaded(ticket);
        let effects = self.reduce(&mut state, TicketAction::Update {
            grant,
            context,
            changes: TicketChanges {
                title: request.title,
                description: request.description,
                priority: request.priority,
                category_id: request.category_id,
                assignee_id: request.assignee_id,
                assigned_team_id: request.assigned_team_id,
                tags,
            },
        })?;
        let ticket = Self::loaded(state)?;

        if effects.is_empty() {
            tracing::debug!("Ticket update changed nothing");
            return Ok(ticket);
        }

        self.store.update_ticket(&ticket).await?;
        execute_effects(effects).await;

        tracing::info!("Ticket updated");
        Ok(ticket)
    }

    /// SLA standing of a ticket against its priority's policy.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: unknown ticket or no policy for its priority
    /// - [`HelpdeskError::PermissionDenied`]: requester reading someone else's ticket
    pub async fn sla(&self, principal: &Principal, id: TicketId) -> Result<SlaStatus> {
        let ticket = self.get(principal, id).await?;
        let policy = self
            .store
            .find_sla_policy_by_priority(ticket.priority)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("SlaPolicy", ticket.priority))?;

        Ok(sla::evaluate(&ticket, &policy, self.env.clock.now()))
    }
}
