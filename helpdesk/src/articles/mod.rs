//! Knowledge-base publication engine.
//!
//! Articles start as `DRAFT`, become visible to requesters when `PUBLISHED`,
//! may go back to draft, and end in `ARCHIVED`. Archived articles cannot be
//! edited or republished.

pub mod actions;
pub mod reducer;
pub mod service;

pub use actions::{ArticleAction, ArticleChanges, NewArticle};
pub use reducer::{
    view_qualifies, ArticleEnvironment, ArticleReducer, ArticleState, PublishedAtPolicy,
};
pub use service::{ArticleEngine, CreateArticle, UpdateArticle};
