//! Permission evaluator.
//!
//! [`evaluate`] is a pure function of role, ownership and action.
//! [`authorize`] turns an allow decision into a [`Grant`], the only value the
//! engines accept as proof that a command was permitted. A `Grant` cannot be
//! built outside this module, so an engine command cannot skip the check.

use crate::error::HelpdeskError;
use crate::types::{ArticleStatus, TicketStatus};
use helpdesk_auth::{Principal, Role, UserId};
use std::fmt;

/// How the caller relates to the entity being acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// Caller is the ticket's requester
    Owner,
    /// Caller is someone else
    NotOwner,
    /// No owning entity (creation, administration)
    NotApplicable,
}

impl Relationship {
    /// Relationship of `caller` to an entity owned by `owner`.
    #[must_use]
    pub fn between(caller: UserId, owner: UserId) -> Self {
        if caller == owner { Self::Owner } else { Self::NotOwner }
    }
}

/// Something a caller wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Raise a ticket
    CreateTicket,
    /// Read a ticket
    ViewTicket,
    /// Edit ticket fields
    EditTicket,
    /// Overwrite assignee/team
    AssignTicket,
    /// Move a ticket between statuses
    TransitionTicket {
        /// Current status
        from: TicketStatus,
        /// Requested status
        to: TicketStatus,
    },
    /// Post a comment
    CommentOnTicket {
        /// Staff-only note
        internal: bool,
    },
    /// See staff-only notes
    ViewInternalComments,
    /// Read an article in the given status
    ViewArticle {
        /// Article's current status
        status: ArticleStatus,
    },
    /// Create or edit articles
    AuthorArticle,
    /// Publish, unpublish or archive articles
    PublishArticle,
    /// Administer users
    ManageUsers,
    /// Administer teams
    ManageTeams,
    /// Administer categories
    ManageCategories,
    /// Administer SLA policies
    ManageSlaSettings,
    /// Read the audit log
    ReadAuditLog,
    /// List teams, categories, tags, SLA policies
    ListReferenceData,
    /// Find-or-create a tag by name
    CreateTag,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTicket => f.write_str("create tickets"),
            Self::ViewTicket => f.write_str("view this ticket"),
            Self::EditTicket => f.write_str("edit tickets"),
            Self::AssignTicket => f.write_str("assign tickets"),
            Self::TransitionTicket { from, to } => write!(f, "move a ticket from {from} to {to}"),
            Self::CommentOnTicket { internal: true } => f.write_str("post internal comments"),
            Self::CommentOnTicket { internal: false } => f.write_str("comment on this ticket"),
            Self::ViewInternalComments => f.write_str("view internal comments"),
            Self::ViewArticle { .. } => f.write_str("view this article"),
            Self::AuthorArticle => f.write_str("author articles"),
            Self::PublishArticle => f.write_str("change article publication"),
            Self::ManageUsers => f.write_str("manage users"),
            Self::ManageTeams => f.write_str("manage teams"),
            Self::ManageCategories => f.write_str("manage categories"),
            Self::ManageSlaSettings => f.write_str("manage SLA settings"),
            Self::ReadAuditLog => f.write_str("read the audit log"),
            Self::ListReferenceData => f.write_str("list reference data"),
            Self::CreateTag => f.write_str("create tags"),
        }
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Permitted
    Allow,
    /// Refused; the caller may know the entity exists
    Deny,
    /// Refused; answer as if the entity did not exist
    Conceal,
}

/// Transitions a requester may make on their own ticket.
const REQUESTER_TRANSITIONS: [(TicketStatus, TicketStatus); 2] = [
    (TicketStatus::WaitingCustomer, TicketStatus::InProgress),
    (TicketStatus::Resolved, TicketStatus::Closed),
];

/// Decide whether `role`, related to the entity by `relationship`, may perform `action`.
#[must_use]
pub fn evaluate(role: Role, relationship: Relationship, action: &Action) -> Decision {
    let allow = |permitted: bool| if permitted { Decision::Allow } else { Decision::Deny };
    let owner = relationship == Relationship::Owner;

    match *action {
        Action::CreateTicket | Action::ListReferenceData | Action::CreateTag => Decision::Allow,

        Action::ManageUsers
        | Action::ManageTeams
        | Action::ManageCategories
        | Action::ManageSlaSettings
        | Action::ReadAuditLog => allow(role == Role::Admin),

        Action::EditTicket
        | Action::AssignTicket
        | Action::ViewInternalComments
        | Action::AuthorArticle
        | Action::PublishArticle => allow(role.is_staff()),

        Action::ViewTicket => allow(role.is_staff() || owner),

        Action::CommentOnTicket { internal } => {
            allow(role.is_staff() || (owner && !internal))
        },

        Action::TransitionTicket { from, to } => {
            allow(role.is_staff() || (owner && REQUESTER_TRANSITIONS.contains(&(from, to))))
        },

        Action::ViewArticle { status } => {
            if role.is_staff() || status == ArticleStatus::Published {
                Decision::Allow
            } else {
                Decision::Conceal
            }
        },
    }
}

/// Proof that a principal was allowed to perform one action.
///
/// Only [`authorize`] produces grants. Engines check [`Grant::covers`]
/// against the action they are about to perform.
#[derive(Debug)]
pub struct Grant {
    principal: Principal,
    action: Action,
}

impl Grant {
    /// Whether this grant permits `action`.
    #[must_use]
    pub fn covers(&self, action: &Action) -> bool {
        self.action == *action
    }

    /// The principal the grant was issued to.
    #[must_use]
    pub const fn actor(&self) -> &Principal {
        &self.principal
    }

    /// The action the grant was issued for.
    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.action
    }
}

/// A refused [`authorize`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denied {
    role: Role,
    action: Action,
    concealed: bool,
}

impl Denied {
    /// Convert into the error the caller sees for entity `entity` `id`.
    ///
    /// Concealed denials answer `NotFound`, everything else `PermissionDenied`.
    #[must_use]
    pub fn into_error(self, entity: &'static str, id: impl ToString) -> HelpdeskError {
        if self.concealed {
            HelpdeskError::not_found(entity, id)
        } else {
            self.into()
        }
    }
}

impl From<Denied> for HelpdeskError {
    fn from(denied: Denied) -> Self {
        Self::PermissionDenied(format!("{} may not {}", denied.role, denied.action))
    }
}

/// Evaluate and, on allow, issue a [`Grant`].
///
/// # Errors
///
/// Returns [`Denied`] when [`evaluate`] does not allow the action.
pub fn authorize(
    principal: &Principal,
    relationship: Relationship,
    action: Action,
) -> Result<Grant, Denied> {
    match evaluate(principal.role, relationship, &action) {
        Decision::Allow => Ok(Grant {
            principal: principal.clone(),
            action,
        }),
        decision => {
            tracing::debug!(
                user_id = %principal.id,
                role = %principal.role,
                action = %action,
                "Permission denied"
            );
            Err(Denied {
                role: principal.role,
                action,
                concealed: decision == Decision::Conceal,
            })
        },
    }
}
