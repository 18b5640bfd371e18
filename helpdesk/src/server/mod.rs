//! HTTP server: state, router and readiness.

pub mod health;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::{AppState, HelpdeskAuthenticator};
