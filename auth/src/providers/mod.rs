//! Provider traits for authentication.
//!
//! Implementations live outside this module: the helpdesk record store
//! provides credentials, [`crate::stores`] provides session storage.

pub mod credentials;
pub mod session;

pub use credentials::{CredentialStore, Credentials};
pub use session::SessionStore;
