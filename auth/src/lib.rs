//! # Helpdesk Authentication
//!
//! Identity primitives for the helpdesk service.
//!
//! ## Features
//!
//! - **Roles**: `requester`, `operator`, `admin`
//! - **Password login**: argon2 hashes, verified against a [`CredentialStore`]
//! - **Opaque bearer tokens**: 256-bit random values with a fixed lifetime,
//!   held in a [`SessionStore`]
//!
//! Authorization decisions are not made here. This crate only answers "who is
//! calling"; the helpdesk permission evaluator decides what they may do.
//!
//! ## Example
//!
//! ```rust,ignore
//! use helpdesk_auth::*;
//!
//! let auth = Authenticator::new(credentials, InMemorySessionStore::new(), clock, ttl);
//!
//! let (principal, issued) = auth.login("agent@example.com", "s3cret").await?;
//! let same = auth.verify_token(&issued.token).await?;
//! assert_eq!(principal, same);
//! ```

pub mod authenticator;
pub mod error;
pub mod password;
pub mod providers;
pub mod state;
pub mod stores;

// Re-export main types for convenience
pub use authenticator::{Authenticator, IssuedToken};
pub use error::{AuthError, Result};
pub use providers::{CredentialStore, Credentials, SessionStore};
pub use state::{Principal, Role, Session, UserId};
pub use stores::InMemorySessionStore;
