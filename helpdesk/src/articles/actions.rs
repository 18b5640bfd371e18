//! Article commands and events.

use crate::audit::RequestContext;
use crate::error::HelpdeskError;
use crate::permissions::Grant;
use crate::types::{CategoryId, KnowledgeArticle, Tag};
use chrono::{DateTime, Utc};

/// Fields of a new draft. Tags are already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    /// Title
    pub title: String,
    /// Body
    pub content: String,
    /// Optional category, already checked to exist
    pub category_id: Option<CategoryId>,
    /// Resolved tags
    pub tags: Vec<Tag>,
}

/// A partial article edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleChanges {
    /// New title
    pub title: Option<String>,
    /// New body
    pub content: Option<String>,
    /// New category (`Some(None)` clears)
    pub category_id: Option<Option<CategoryId>>,
    /// Replacement tag set, already resolved
    pub tags: Option<Vec<Tag>>,
}

/// Actions for the article reducer.
#[derive(Debug)]
pub enum ArticleAction {
    // Commands
    /// Draft a new article
    Create {
        /// Permission proof
        grant: Grant,
        /// Request origin
        context: RequestContext,
        /// Article fields
        article: NewArticle,
    },

    /// Edit a draft or published article
    Update {
        /// Permission proof
        grant: Grant,
        /// Request origin
        context: RequestContext,
        /// Requested changes
        changes: ArticleChanges,
    },

    /// Make the article visible to everyone
    Publish {
        /// Permission proof
        grant: Grant,
        /// Request origin
        context: RequestContext,
    },

    /// Return a published article to draft
    Unpublish {
        /// Permission proof
        grant: Grant,
        /// Request origin
        context: RequestContext,
    },

    /// Retire the article for good
    Archive {
        /// Permission proof
        grant: Grant,
        /// Request origin
        context: RequestContext,
    },

    // Events
    /// A draft was created
    Created {
        /// The new article
        article: Box<KnowledgeArticle>,
    },

    /// Fields were edited
    Updated {
        /// Effective changes only
        changes: ArticleChanges,
        /// When
        at: DateTime<Utc>,
    },

    /// Published
    Published {
        /// Value of `published_at` after publishing
        published_at: Option<DateTime<Utc>>,
        /// When
        at: DateTime<Utc>,
    },

    /// Back to draft
    Unpublished {
        /// When
        at: DateTime<Utc>,
    },

    /// Archived
    Archived {
        /// When
        at: DateTime<Utc>,
    },

    /// A command was rejected
    ValidationFailed {
        /// Why
        error: HelpdeskError,
    },
}
