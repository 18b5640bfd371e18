//! Ticket commands and events.

use crate::audit::RequestContext;
use crate::error::HelpdeskError;
use crate::permissions::Grant;
use crate::types::{
    CategoryId, Comment, Tag, TeamId, Ticket, TicketNumber, TicketPriority, TicketStatus, UserId,
};
use chrono::{DateTime, Utc};

/// Fields of a ticket about to be raised. Tags are already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    /// Reserved number
    pub ticket_number: TicketNumber,
    /// Short summary
    pub title: String,
    /// Full description
    pub description: String,
    /// Priority
    pub priority: TicketPriority,
    /// Optional category, already checked to exist
    pub category_id: Option<CategoryId>,
    /// Resolved tags
    pub tags: Vec<Tag>,
}

/// A partial ticket edit. `None` leaves a field unchanged.
///
/// `assignee_id` and `assigned_team_id` are doubly optional: `Some(None)`
/// clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketChanges {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New priority
    pub priority: Option<TicketPriority>,
    /// New category (`Some(None)` clears)
    pub category_id: Option<Option<CategoryId>>,
    /// New assignee (`Some(None)` clears)
    pub assignee_id: Option<Option<UserId>>,
    /// New team (`Some(None)` clears)
    pub assigned_team_id: Option<Option<TeamId>>,
    /// Replacement tag set, already resolved
    pub tags: Option<Vec<Tag>>,
}

/// Actions for the ticket reducer.
///
/// Commands carry the [`Grant`] issued by the permission evaluator and the
/// request context copied into audit entries. Events are applied to state
/// and never carry grants.
#[derive(Debug)]
pub enum TicketAction {
    // Commands
    /// Raise a ticket
    Create {
        /// Permission proof
        grant: Grant,
        /// Request origin
        context: RequestContext,
        /// Ticket fields
        ticket: NewTicket,
    },

    /// Move the ticket to another status
    Transition {
        /// Permission proof
        grant: Grant,
        /// Request origin
        context: RequestContext,
        /// Target status
        to: TicketStatus,
    },

    /// Overwrite assignee and team; `None` clears
    Assign {
        /// Permission proof
        grant: Grant,
        /// Request origin
        context: RequestContext,
        /// New assignee
        assignee_id: Option<UserId>,
        /// New team
        assigned_team_id: Option<TeamId>,
    },

    /// Post a comment
    AddComment {
        /// Permission proof
        grant: Grant,
        /// Request origin
        context: RequestContext,
        /// Body
        content: String,
        /// Staff-only note
        is_internal: bool,
    },

    /// Patch ticket fields
    Update {
        /// Permission proof
        grant: Grant,
        /// Request origin
        context: RequestContext,
        /// Requested changes
        changes: TicketChanges,
    },

    // Events
    /// A ticket was raised
    Created {
        /// The new ticket
        ticket: Box<Ticket>,
    },

    /// Status changed
    StatusChanged {
        /// Previous status
        from: TicketStatus,
        /// New status
        to: TicketStatus,
        /// When
        at: DateTime<Utc>,
    },

    /// Assignee and team overwritten
    Assigned {
        /// New assignee
        assignee_id: Option<UserId>,
        /// New team
        assigned_team_id: Option<TeamId>,
        /// When
        at: DateTime<Utc>,
    },

    /// A comment was posted
    CommentAdded {
        /// The comment
        comment: Comment,
        /// Whether it counts as the first staff response
        first_response: bool,
    },

    /// Fields were edited
    Updated {
        /// Effective changes only
        changes: TicketChanges,
        /// When
        at: DateTime<Utc>,
    },

    /// A command was rejected
    ValidationFailed {
        /// Why
        error: HelpdeskError,
    },
}
