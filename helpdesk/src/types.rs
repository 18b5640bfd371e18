//! Domain types for the helpdesk.
//!
//! Identifiers, status enums and the records the engines work on. Records are
//! plain data; every rule about how they change lives in the engines.

use crate::error::HelpdeskError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub use helpdesk_auth::{Role, UserId};

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create from a `Uuid`
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a ticket
    TicketId
);
id_type!(
    /// Unique identifier for a ticket comment
    CommentId
);
id_type!(
    /// Unique identifier for a knowledge article
    ArticleId
);
id_type!(
    /// Unique identifier for a tag
    TagId
);
id_type!(
    /// Unique identifier for a category
    CategoryId
);
id_type!(
    /// Unique identifier for a team
    TeamId
);
id_type!(
    /// Unique identifier for an audit entry
    AuditEntryId
);
id_type!(
    /// Unique identifier for an SLA policy
    SlaPolicyId
);

/// Human-facing ticket number, rendered `TKT-00001`.
///
/// Allocated from a monotonic sequence; never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TicketNumber(u64);

impl TicketNumber {
    /// Wrap a sequence value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The sequence value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TKT-{:05}", self.0)
    }
}

impl FromStr for TicketNumber {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("TKT-")
            .and_then(|digits| digits.parse().ok())
            .map(Self)
            .ok_or_else(|| HelpdeskError::validation(format!("invalid ticket number: {s}")))
    }
}

impl From<TicketNumber> for String {
    fn from(number: TicketNumber) -> Self {
        number.to_string()
    }
}

impl TryFrom<String> for TicketNumber {
    type Error = HelpdeskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Status enums
// ============================================================================

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire name
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = HelpdeskError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => {
                        let valid: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        Err(HelpdeskError::validation(format!(
                            "invalid {}: {other} (expected one of {})",
                            $label,
                            valid.join(", ")
                        )))
                    },
                }
            }
        }
    };
}

wire_enum!(
    /// Ticket lifecycle status
    TicketStatus, "status" {
        /// Newly raised
        Open => "OPEN",
        /// Being worked on
        InProgress => "IN_PROGRESS",
        /// Blocked on the requester; SLA clock may pause
        WaitingCustomer => "WAITING_CUSTOMER",
        /// Fix delivered
        Resolved => "RESOLVED",
        /// Done
        Closed => "CLOSED",
        /// Abandoned
        Canceled => "CANCELED",
    }
);

wire_enum!(
    /// Ticket priority; selects the SLA policy
    TicketPriority, "priority" {
        /// Low
        Low => "LOW",
        /// Medium
        Medium => "MEDIUM",
        /// High
        High => "HIGH",
        /// Urgent
        Urgent => "URGENT",
    }
);

wire_enum!(
    /// Knowledge article publication status
    ArticleStatus, "article status" {
        /// Editable, hidden from requesters
        Draft => "DRAFT",
        /// Visible to everyone
        Published => "PUBLISHED",
        /// Retired; terminal
        Archived => "ARCHIVED",
    }
);

wire_enum!(
    /// What a category may classify
    CategoryKind, "category type" {
        /// Tickets only
        Ticket => "TICKET",
        /// Articles only
        Article => "ARTICLE",
        /// Tickets and articles
        Both => "BOTH",
    }
);

// ============================================================================
// Records
// ============================================================================

/// A support ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Identity
    pub id: TicketId,
    /// Human-facing number (`TKT-00001`)
    pub ticket_number: TicketNumber,
    /// Short summary
    pub title: String,
    /// Full description
    pub description: String,
    /// Lifecycle status
    pub status: TicketStatus,
    /// Priority
    pub priority: TicketPriority,
    /// Optional category
    pub category_id: Option<CategoryId>,
    /// Who raised the ticket; never changes
    pub requester_id: UserId,
    /// Assigned operator
    pub assignee_id: Option<UserId>,
    /// Assigned team
    pub assigned_team_id: Option<TeamId>,
    /// First public staff reply; stamped once
    pub first_response_at: Option<DateTime<Utc>>,
    /// First entry into RESOLVED; stamped once
    pub resolved_at: Option<DateTime<Utc>>,
    /// First entry into CLOSED; stamped once
    pub closed_at: Option<DateTime<Utc>>,
    /// Start of the current waiting interval; set only while WAITING_CUSTOMER
    pub waiting_customer_started_at: Option<DateTime<Utc>>,
    /// Completed waiting time in whole seconds
    pub total_waiting_customer_duration: i64,
    /// Attached tags
    pub tags: Vec<Tag>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// A comment on a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Identity
    pub id: CommentId,
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Author
    pub author_id: UserId,
    /// Body
    pub content: String,
    /// Staff-only note
    pub is_internal: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// A knowledge-base article.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeArticle {
    /// Identity
    pub id: ArticleId,
    /// Title
    pub title: String,
    /// Body
    pub content: String,
    /// Publication status
    pub status: ArticleStatus,
    /// Author; never changes
    pub author_id: UserId,
    /// Optional category
    pub category_id: Option<CategoryId>,
    /// Qualifying reads so far
    pub view_count: i64,
    /// Publication time
    pub published_at: Option<DateTime<Utc>>,
    /// Attached tags
    pub tags: Vec<Tag>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// A label shared by tickets and articles, unique by exact name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Identity
    pub id: TagId,
    /// Case-sensitive unique name
    pub name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// A ticket/article category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Identity
    pub id: CategoryId,
    /// Display name
    pub name: String,
    /// What it may classify
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    /// Optional description
    pub description: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// A support team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Identity
    pub id: TeamId,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// A helpdesk account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity
    pub id: UserId,
    /// Login email, unique
    pub email: String,
    /// Display name
    pub name: String,
    /// Role
    pub role: Role,
    /// Optional team membership
    pub team_id: Option<TeamId>,
    /// argon2 PHC hash; never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// SLA targets for one priority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaPolicy {
    /// Identity
    pub id: SlaPolicyId,
    /// Priority this policy applies to, unique
    pub priority: TicketPriority,
    /// Minutes allowed until the first public staff reply
    pub first_response_target_minutes: i64,
    /// Minutes allowed until resolution
    pub resolution_target_minutes: i64,
    /// Whether WAITING_CUSTOMER time stops the resolution clock
    pub pause_on_waiting_customer: bool,
    /// Business timezone label
    pub timezone: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// Reject an empty or whitespace-only text field.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), HelpdeskError> {
    if value.trim().is_empty() {
        Err(HelpdeskError::validation(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

/// Deserialize a field where an explicit `null` differs from an absent one.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`: absent stays
/// `None`, `null` becomes `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
