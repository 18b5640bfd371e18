//! Ticket lifecycle reducer.
//!
//! Validates a command against the loaded ticket, applies the resulting event
//! (status, SLA stamps, waiting-time accounting) and describes the audit
//! append. Rejected commands leave the ticket untouched and set
//! [`TicketState::last_error`].

use super::actions::{NewTicket, TicketAction, TicketChanges};
use crate::audit::{AuditAction, AuditRecorder, EntityType, RequestContext};
use crate::error::HelpdeskError;
use crate::permissions::{Action, Grant};
use crate::tags::sorted_names;
use crate::types::{require_text, Comment, CommentId, Ticket, TicketId, TicketStatus};
use chrono::{DateTime, Utc};
use helpdesk_core::environment::{Clock, IdGenerator};
use helpdesk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// State the ticket reducer works on: at most one ticket.
#[derive(Debug, Clone, Default)]
pub struct TicketState {
    /// The loaded ticket, `None` before creation
    pub ticket: Option<Ticket>,
    /// Comment produced by the last `AddComment`
    pub last_comment: Option<Comment>,
    /// Why the last command was rejected
    pub last_error: Option<HelpdeskError>,
}

impl TicketState {
    /// State for an existing ticket.
    #[must_use]
    pub fn loaded(ticket: Ticket) -> Self {
        Self {
            ticket: Some(ticket),
            ..Self::default()
        }
    }
}

/// Dependencies of the ticket reducer.
#[derive(Clone)]
pub struct TicketEnvironment {
    /// Time source for every stamp
    pub clock: Arc<dyn Clock>,
    /// Identity source for tickets and comments
    pub ids: Arc<dyn IdGenerator>,
    /// Audit effect builder
    pub audit: AuditRecorder,
}

impl TicketEnvironment {
    /// Bundle the reducer's dependencies.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>, audit: AuditRecorder) -> Self {
        Self { clock, ids, audit }
    }
}

/// Reducer for the ticket lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketReducer;

type Effects = SmallVec<[Effect<TicketAction>; 4]>;

impl TicketReducer {
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

    fn not_loaded() -> HelpdeskError {
        HelpdeskError::Internal("no ticket loaded".to_string())
    }

    fn validate_create(state: &TicketState, grant: &Grant, ticket: &NewTicket) -> Result<(), HelpdeskError> {
        if state.ticket.is_some() {
            return Err(HelpdeskError::invalid_state("ticket already exists"));
        }
        Self::require(grant, Action::CreateTicket)?;
        require_text("title", &ticket.title)?;
        require_text("description", &ticket.description)
    }

    fn validate_changes(changes: &TicketChanges) -> Result<(), HelpdeskError> {
        if let Some(title) = &changes.title {
            require_text("title", title)?;
        }
        if let Some(description) = &changes.description {
            require_text("description", description)?;
        }
        Ok(())
    }

    /// Keep only the requested changes that differ from `ticket`, recording
    /// old and new values for the audit diff.
    fn effective_changes(ticket: &Ticket, requested: TicketChanges) -> (TicketChanges, Value, Value) {
        let mut effective = TicketChanges::default();
        let mut old = Map::new();
        let mut new = Map::new();

        macro_rules! diff {
            ($field:ident, $current:expr) => {
                if let Some(value) = requested.$field {
                    if value != $current {
                        old.insert(stringify!($field).to_string(), json!($current));
                        new.insert(stringify!($field).to_string(), json!(value));
                        effective.$field = Some(value);
                    }
                }
            };
        }

        diff!(title, ticket.title);
        diff!(description, ticket.description);
        diff!(priority, ticket.priority);
        diff!(category_id, ticket.category_id);
        diff!(assignee_id, ticket.assignee_id);
        diff!(assigned_team_id, ticket.assigned_team_id);

        if let Some(tags) = requested.tags {
            let (before, after) = (sorted_names(&ticket.tags), sorted_names(&tags));
            if before != after {
                old.insert("tags".to_string(), json!(before));
                new.insert("tags".to_string(), json!(after));
                effective.tags = Some(tags);
            }
        }

        (effective, Value::Object(old), Value::Object(new))
    }

    /// Apply an event to state.
    fn apply_event(state: &mut TicketState, action: &TicketAction) {
        match action {
            TicketAction::Created { ticket } => {
                state.ticket = Some((**ticket).clone());
                state.last_error = None;
            },
            TicketAction::StatusChanged { from, to, at } => {
                if let Some(ticket) = state.ticket.as_mut() {
                    apply_transition(ticket, *from, *to, *at);
                }
                state.last_error = None;
            },
            TicketAction::Assigned {
                assignee_id,
                assigned_team_id,
                at,
            } => {
                if let Some(ticket) = state.ticket.as_mut() {
                    ticket.assignee_id = *assignee_id;
                    ticket.assigned_team_id = *assigned_team_id;
                    ticket.updated_at = *at;
                }
                state.last_error = None;
            },
            TicketAction::CommentAdded {
                comment,
                first_response,
            } => {
                if let Some(ticket) = state.ticket.as_mut() {
                    if *first_response {
                        ticket.first_response_at = Some(comment.created_at);
                        ticket.updated_at = comment.created_at;
                    }
                }
                state.last_comment = Some(comment.clone());
                state.last_error = None;
            },
            TicketAction::Updated { changes, at } => {
                if let Some(ticket) = state.ticket.as_mut() {
                    apply_changes(ticket, changes);
                    ticket.updated_at = *at;
                }
                state.last_error = None;
            },
            TicketAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            // Commands are not applied
            TicketAction::Create { .. }
            | TicketAction::Transition { .. }
            | TicketAction::Assign { .. }
            | TicketAction::AddComment { .. }
            | TicketAction::Update { .. } => {},
        }
    }

    fn reject(state: &mut TicketState, error: HelpdeskError) -> Effects {
        Self::apply_event(state, &TicketAction::ValidationFailed { error });
        SmallVec::new()
    }

    fn audit(
        env: &TicketEnvironment,
        grant: &Grant,
        context: &RequestContext,
        action: AuditAction,
        ticket: TicketId,
        metadata: Value,
    ) -> Effects {
        smallvec![env.audit.record(
            grant.actor().id,
            context,
            action,
            EntityType::Ticket,
            *ticket.as_uuid(),
            metadata,
        )]
    }
}

/// SLA bookkeeping for one status change.
///
/// Entering `WAITING_CUSTOMER` starts the waiting interval; leaving it adds
/// the elapsed whole seconds (never negative) to the running total.
/// `resolved_at` and `closed_at` are stamped on first entry only.
pub fn apply_transition(ticket: &mut Ticket, from: TicketStatus, to: TicketStatus, at: DateTime<Utc>) {
    if to == TicketStatus::WaitingCustomer && from != TicketStatus::WaitingCustomer {
        ticket.waiting_customer_started_at = Some(at);
    }

    if from == TicketStatus::WaitingCustomer && to != TicketStatus::WaitingCustomer {
        if let Some(started) = ticket.waiting_customer_started_at.take() {
            ticket.total_waiting_customer_duration += (at - started).num_seconds().max(0);
        }
    }

    if to == TicketStatus::Resolved && ticket.resolved_at.is_none() {
        ticket.resolved_at = Some(at);
    }

    if to == TicketStatus::Closed && ticket.closed_at.is_none() {
        ticket.closed_at = Some(at);
    }

    ticket.status = to;
    ticket.updated_at = at;
}

fn apply_changes(ticket: &mut Ticket, changes: &TicketChanges) {
    if let Some(title) = &changes.title {
        ticket.title.clone_from(title);
    }
    if let Some(description) = &changes.description {
        ticket.description.clone_from(description);
    }
    if let Some(priority) = changes.priority {
        ticket.priority = priority;
    }
    if let Some(category_id) = changes.category_id {
        ticket.category_id = category_id;
    }
    if let Some(assignee_id) = changes.assignee_id {
        ticket.assignee_id = assignee_id;
    }
    if let Some(team_id) = changes.assigned_team_id {
        ticket.assigned_team_id = team_id;
    }
    if let Some(tags) = &changes.tags {
        ticket.tags.clone_from(tags);
    }
}

impl Reducer for TicketReducer {
    type State = TicketState;
    type Action = TicketAction;
    type Environment = TicketEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per command
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            TicketAction::Create {
                grant,
                context,
                ticket,
            } => {
                if let Err(error) = Self::validate_create(state, &grant, &ticket) {
                    return Self::reject(state, error);
                }

                let now = env.clock.now();
                let created = Ticket {
                    id: TicketId::from_uuid(env.ids.next_id()),
                    ticket_number: ticket.ticket_number,
                    title: ticket.title,
                    description: ticket.description,
                    status: TicketStatus::Open,
                    priority: ticket.priority,
                    category_id: ticket.category_id,
                    requester_id: grant.actor().id,
                    assignee_id: None,
                    assigned_team_id: None,
                    first_response_at: None,
                    resolved_at: None,
                    closed_at: None,
                    waiting_customer_started_at: None,
                    total_waiting_customer_duration: 0,
                    tags: ticket.tags,
                    created_at: now,
                    updated_at: now,
                };
                let metadata = json!({
                    "ticket_number": created.ticket_number,
                    "title": created.title,
                });
                let id = created.id;

                Self::apply_event(state, &TicketAction::Created {
                    ticket: Box::new(created),
                });
                Self::audit(env, &grant, &context, AuditAction::TicketCreated, id, metadata)
            },

            TicketAction::Transition { grant, context, to } => {
                let Some(ticket) = state.ticket.as_ref() else {
                    return Self::reject(state, Self::not_loaded());
                };
                let (id, from) = (ticket.id, ticket.status);
                if let Err(error) = Self::require(&grant, Action::TransitionTicket { from, to }) {
                    return Self::reject(state, error);
                }

                Self::apply_event(state, &TicketAction::StatusChanged {
                    from,
                    to,
                    at: env.clock.now(),
                });
                let metadata = json!({ "old_status": from, "new_status": to });
                Self::audit(env, &grant, &context, AuditAction::StatusChanged, id, metadata)
            },

            TicketAction::Assign {
                grant,
                context,
                assignee_id,
                assigned_team_id,
            } => {
                let Some(ticket) = state.ticket.as_ref() else {
                    return Self::reject(state, Self::not_loaded());
                };
                let (id, old_assignee, old_team) = (ticket.id, ticket.assignee_id, ticket.assigned_team_id);
                if let Err(error) = Self::require(&grant, Action::AssignTicket) {
                    return Self::reject(state, error);
                }

                Self::apply_event(state, &TicketAction::Assigned {
                    assignee_id,
                    assigned_team_id,
                    at: env.clock.now(),
                });
                let metadata = json!({
                    "old_assignee_id": old_assignee,
                    "new_assignee_id": assignee_id,
                    "old_team_id": old_team,
                    "new_team_id": assigned_team_id,
                });
                Self::audit(env, &grant, &context, AuditAction::TicketAssigned, id, metadata)
            },

            TicketAction::AddComment {
                grant,
                context,
                content,
                is_internal,
            } => {
                let Some(ticket) = state.ticket.as_ref() else {
                    return Self::reject(state, Self::not_loaded());
                };
                let (id, answered) = (ticket.id, ticket.first_response_at.is_some());
                let validation = Self::require(&grant, Action::CommentOnTicket {
                    internal: is_internal,
                })
                .and_then(|()| require_text("content", &content));
                if let Err(error) = validation {
                    return Self::reject(state, error);
                }

                let now = env.clock.now();
                let comment = Comment {
                    id: CommentId::from_uuid(env.ids.next_id()),
                    ticket_id: id,
                    author_id: grant.actor().id,
                    content,
                    is_internal,
                    created_at: now,
                    updated_at: now,
                };
                let first_response = !is_internal && !answered && grant.actor().role.is_staff();
                let metadata = json!({ "comment_id": comment.id, "is_internal": is_internal });

                Self::apply_event(state, &TicketAction::CommentAdded {
                    comment,
                    first_response,
                });
                Self::audit(env, &grant, &context, AuditAction::CommentAdded, id, metadata)
            },

            TicketAction::Update {
                grant,
                context,
                changes,
            } => {
                let validation = Self::require(&grant, Action::EditTicket)
                    .and_then(|()| Self::validate_changes(&changes));
                if let Err(error) = validation {
                    return Self::reject(state, error);
                }
                let Some(ticket) = state.ticket.as_ref() else {
                    return Self::reject(state, Self::not_loaded());
                };

                let id = ticket.id;
                let (effective, old, new) = Self::effective_changes(ticket, changes);
                if effective == TicketChanges::default() {
                    state.last_error = None;
                    return SmallVec::new();
                }

                Self::apply_event(state, &TicketAction::Updated {
                    changes: effective,
                    at: env.clock.now(),
                });
                let metadata = json!({ "old": old, "new": new });
                Self::audit(env, &grant, &context, AuditAction::TicketUpdated, id, metadata)
            },

            // ========== Events ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::permissions::test_support::grant;
    use crate::store::InMemoryStore;
    use crate::types::{Tag, TagId, TicketNumber, TicketPriority, UserId};
    use helpdesk_auth::{Principal, Role};
    use helpdesk_testing::{assertions, test_clock, FixedClock, ReducerTest, SequentialIdGenerator};
    use chrono::Duration;

    fn env_with_clock(clock: Arc<dyn Clock>) -> TicketEnvironment {
        let ids: Arc<dyn IdGenerator> = Arc::new(SequentialIdGenerator::new());
        let audit = AuditRecorder::new(Arc::new(InMemoryStore::new()), Arc::clone(&clock), Arc::clone(&ids));
        TicketEnvironment::new(clock, ids, audit)
    }

    fn env() -> TicketEnvironment {
        env_with_clock(Arc::new(test_clock()))
    }

    fn principal(role: Role) -> Principal {
        Principal {
            id: UserId::new(),
            email: format!("{role}@example.com"),
            role,
        }
    }

    fn new_ticket(title: &str) -> NewTicket {
        NewTicket {
            ticket_number: TicketNumber::new(1),
            title: title.to_string(),
            description: "Cannot connect since this morning".to_string(),
            priority: TicketPriority::High,
            category_id: None,
            tags: Vec::new(),
        }
    }

    fn open_ticket(requester: &Principal) -> Ticket {
        let now = test_clock().now();
        Ticket {
            id: TicketId::from_uuid(uuid::Uuid::new_v4()),
            ticket_number: TicketNumber::new(7),
            title: "VPN down".to_string(),
            description: "Cannot connect".to_string(),
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            category_id: None,
            requester_id: requester.id,
            assignee_id: None,
            assigned_team_id: None,
            first_response_at: None,
            resolved_at: None,
            closed_at: None,
            waiting_customer_started_at: None,
            total_waiting_customer_duration: 0,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn ticket_with_status(requester: &Principal, status: TicketStatus) -> Ticket {
        Ticket {
            status,
            ..open_ticket(requester)
        }
    }

    #[test]
    fn create_opens_ticket_for_requester() {
        let requester = principal(Role::Requester);
        let requester_id = requester.id;

        ReducerTest::new(TicketReducer)
            .with_env(env())
            .given_state(TicketState::default())
            .when_action(TicketAction::Create {
                grant: grant(&requester, Action::CreateTicket),
                context: RequestContext::default(),
                ticket: new_ticket("VPN down"),
            })
            .then_state(move |state| {
                let ticket = state.ticket.as_ref().unwrap();
                assert_eq!(ticket.status, TicketStatus::Open);
                assert_eq!(ticket.requester_id, requester_id);
                assert_eq!(ticket.ticket_number.to_string(), "TKT-00001");
                assert!(state.last_error.is_none());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn create_rejects_blank_title() {
        let requester = principal(Role::Requester);

        ReducerTest::new(TicketReducer)
            .with_env(env())
            .given_state(TicketState::default())
            .when_action(TicketAction::Create {
                grant: grant(&requester, Action::CreateTicket),
                context: RequestContext::default(),
                ticket: new_ticket("   "),
            })
            .then_state(|state| {
                assert!(state.ticket.is_none());
                assert_eq!(
                    state.last_error,
                    Some(HelpdeskError::validation("title must not be empty"))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn grant_for_other_action_is_rejected() {
        let operator = principal(Role::Operator);
        let ticket = open_ticket(&operator);

        ReducerTest::new(TicketReducer)
            .with_env(env())
            .given_state(TicketState::loaded(ticket))
            .when_action(TicketAction::Transition {
                grant: grant(&operator, Action::AssignTicket),
                context: RequestContext::default(),
                to: TicketStatus::Resolved,
            })
            .then_state(|state| {
                assert_eq!(state.ticket.as_ref().unwrap().status, TicketStatus::Open);
                assert!(matches!(state.last_error, Some(HelpdeskError::PermissionDenied(_))));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn grant_for_stale_source_status_is_rejected() {
        let requester = principal(Role::Requester);
        let ticket = ticket_with_status(&requester, TicketStatus::Open);
        let stale = Action::TransitionTicket {
            from: TicketStatus::WaitingCustomer,
            to: TicketStatus::InProgress,
        };

        ReducerTest::new(TicketReducer)
            .with_env(env())
            .given_state(TicketState::loaded(ticket))
            .when_action(TicketAction::Transition {
                grant: grant(&requester, stale),
                context: RequestContext::default(),
                to: TicketStatus::InProgress,
            })
            .then_state(|state| {
                assert!(matches!(state.last_error, Some(HelpdeskError::PermissionDenied(_))));
            })
            .run();
    }

    #[test]
    fn entering_waiting_starts_interval() {
        let operator = principal(Role::Operator);
        let ticket = ticket_with_status(&operator, TicketStatus::InProgress);
        let now = test_clock().now();

        ReducerTest::new(TicketReducer)
            .with_env(env())
            .given_state(TicketState::loaded(ticket))
            .when_action(TicketAction::Transition {
                grant: grant(&operator, Action::TransitionTicket {
                    from: TicketStatus::InProgress,
                    to: TicketStatus::WaitingCustomer,
                }),
                context: RequestContext::default(),
                to: TicketStatus::WaitingCustomer,
            })
            .then_state(move |state| {
                let ticket = state.ticket.as_ref().unwrap();
                assert_eq!(ticket.status, TicketStatus::WaitingCustomer);
                assert_eq!(ticket.waiting_customer_started_at, Some(now));
                assert_eq!(ticket.updated_at, now);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn leaving_waiting_accumulates_seconds() {
        let requester = principal(Role::Requester);
        let now = test_clock().now();
        let ticket = Ticket {
            waiting_customer_started_at: Some(now - Duration::seconds(100)),
            total_waiting_customer_duration: 20,
            ..ticket_with_status(&requester, TicketStatus::WaitingCustomer)
        };

        ReducerTest::new(TicketReducer)
            .with_env(env())
            .given_state(TicketState::loaded(ticket))
            .when_action(TicketAction::Transition {
                grant: grant(&requester, Action::TransitionTicket {
                    from: TicketStatus::WaitingCustomer,
                    to: TicketStatus::InProgress,
                }),
                context: RequestContext::default(),
                to: TicketStatus::InProgress,
            })
            .then_state(|state| {
                let ticket = state.ticket.as_ref().unwrap();
                assert_eq!(ticket.waiting_customer_started_at, None);
                assert_eq!(ticket.total_waiting_customer_duration, 120);
            })
            .run();
    }

    #[test]
    fn waiting_start_in_future_adds_nothing() {
        let requester = principal(Role::Requester);
        let now = test_clock().now();
        let mut ticket = Ticket {
            waiting_customer_started_at: Some(now + Duration::seconds(30)),
            ..ticket_with_status(&requester, TicketStatus::WaitingCustomer)
        };

        apply_transition(&mut ticket, TicketStatus::WaitingCustomer, TicketStatus::Resolved, now);

        assert_eq!(ticket.total_waiting_customer_duration, 0);
        assert_eq!(ticket.waiting_customer_started_at, None);
        assert_eq!(ticket.resolved_at, Some(now));
    }

    #[test]
    fn resolved_and_closed_are_stamped_once() {
        let requester = principal(Role::Requester);
        let first = test_clock().now();
        let later = first + Duration::hours(2);
        let mut ticket = open_ticket(&requester);

        apply_transition(&mut ticket, TicketStatus::Open, TicketStatus::Resolved, first);
        apply_transition(&mut ticket, TicketStatus::Resolved, TicketStatus::Closed, first);
        apply_transition(&mut ticket, TicketStatus::Closed, TicketStatus::InProgress, later);
        apply_transition(&mut ticket, TicketStatus::InProgress, TicketStatus::Resolved, later);
        apply_transition(&mut ticket, TicketStatus::Resolved, TicketStatus::Closed, later);

        assert_eq!(ticket.resolved_at, Some(first));
        assert_eq!(ticket.closed_at, Some(first));
        assert_eq!(ticket.updated_at, later);
    }

    #[test]
    fn staff_public_comment_stamps_first_response() {
        let operator = principal(Role::Operator);
        let requester = principal(Role::Requester);
        let now = test_clock().now();

        ReducerTest::new(TicketReducer)
            .with_env(env())
            .given_state(TicketState::loaded(open_ticket(&requester)))
            .when_action(TicketAction::AddComment {
                grant: grant(&operator, Action::CommentOnTicket { internal: false }),
                context: RequestContext::default(),
                content: "Looking into it".to_string(),
                is_internal: false,
            })
            .then_state(move |state| {
                assert_eq!(state.ticket.as_ref().unwrap().first_response_at, Some(now));
                assert!(state.last_comment.is_some());
            })
            .run();
    }

    #[test]
    fn internal_or_requester_comment_does_not_stamp() {
        let operator = principal(Role::Operator);
        let requester = principal(Role::Requester);

        for (author, internal) in [(&operator, true), (&requester, false)] {
            ReducerTest::new(TicketReducer)
                .with_env(env())
                .given_state(TicketState::loaded(open_ticket(&requester)))
                .when_action(TicketAction::AddComment {
                    grant: grant(author, Action::CommentOnTicket { internal }),
                    context: RequestContext::default(),
                    content: "note".to_string(),
                    is_internal: internal,
                })
                .then_state(move |state| {
                    assert_eq!(state.ticket.as_ref().unwrap().first_response_at, None);
                    assert_eq!(state.last_comment.as_ref().unwrap().is_internal, internal);
                })
                .then_effects(|effects| assertions::assert_effects_count(effects, 1))
                .run();
        }
    }

    #[test]
    fn first_response_is_not_overwritten() {
        let operator = principal(Role::Operator);
        let earlier = test_clock().now() - Duration::hours(1);
        let ticket = Ticket {
            first_response_at: Some(earlier),
            ..open_ticket(&operator)
        };

        ReducerTest::new(TicketReducer)
            .with_env(env())
            .given_state(TicketState::loaded(ticket))
            .when_action(TicketAction::AddComment {
                grant: grant(&operator, Action::CommentOnTicket { internal: false }),
                context: RequestContext::default(),
                content: "Second reply".to_string(),
                is_internal: false,
            })
            .then_state(move |state| {
                assert_eq!(state.ticket.as_ref().unwrap().first_response_at, Some(earlier));
            })
            .run();
    }

    #[test]
    fn assign_overwrites_both_fields() {
        let operator = principal(Role::Operator);
        let assignee = UserId::new();
        let ticket = Ticket {
            assigned_team_id: Some(crate::types::TeamId::from_uuid(uuid::Uuid::new_v4())),
            ..open_ticket(&operator)
        };

        ReducerTest::new(TicketReducer)
            .with_env(env())
            .given_state(TicketState::loaded(ticket))
            .when_action(TicketAction::Assign {
                grant: grant(&operator, Action::AssignTicket),
                context: RequestContext::default(),
                assignee_id: Some(assignee),
                assigned_team_id: None,
            })
            .then_state(move |state| {
                let ticket = state.ticket.as_ref().unwrap();
                assert_eq!(ticket.assignee_id, Some(assignee));
                assert_eq!(ticket.assigned_team_id, None);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn update_without_effective_change_is_silent() {
        let operator = principal(Role::Operator);
        let ticket = open_ticket(&operator);
        let updated_at = ticket.updated_at;
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(updated_at + Duration::minutes(5)));

        ReducerTest::new(TicketReducer)
            .with_env(env_with_clock(clock))
            .given_state(TicketState::loaded(ticket))
            .when_action(TicketAction::Update {
                grant: grant(&operator, Action::EditTicket),
                context: RequestContext::default(),
                changes: TicketChanges {
                    title: Some("VPN down".to_string()),
                    priority: Some(TicketPriority::Medium),
                    tags: Some(Vec::new()),
                    ..TicketChanges::default()
                },
            })
            .then_state(move |state| {
                assert_eq!(state.ticket.as_ref().unwrap().updated_at, updated_at);
                assert!(state.last_error.is_none());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn update_diff_lists_only_changed_fields() {
        let operator = principal(Role::Operator);
        let ticket = open_ticket(&operator);
        let tag = Tag {
            id: TagId::from_uuid(uuid::Uuid::new_v4()),
            name: "vpn".to_string(),
            created_at: test_clock().now(),
        };

        let (effective, old, new) = TicketReducer::effective_changes(&ticket, TicketChanges {
            title: Some("VPN down".to_string()),
            priority: Some(TicketPriority::Urgent),
            tags: Some(vec![tag]),
            ..TicketChanges::default()
        });

        assert_eq!(effective.title, None);
        assert_eq!(effective.priority, Some(TicketPriority::Urgent));
        assert_eq!(old, json!({ "priority": "MEDIUM", "tags": [] }));
        assert_eq!(new, json!({ "priority": "URGENT", "tags": ["vpn"] }));
    }

    #[test]
    fn update_applies_changes() {
        let operator = principal(Role::Operator);

        ReducerTest::new(TicketReducer)
            .with_env(env())
            .given_state(TicketState::loaded(open_ticket(&operator)))
            .when_action(TicketAction::Update {
                grant: grant(&operator, Action::EditTicket),
                context: RequestContext::default(),
                changes: TicketChanges {
                    description: Some("Fails on wifi only".to_string()),
                    ..TicketChanges::default()
                },
            })
            .then_state(|state| {
                let ticket = state.ticket.as_ref().unwrap();
                assert_eq!(ticket.description, "Fails on wifi only");
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }
}
