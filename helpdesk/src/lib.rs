//! # Helpdesk
//!
//! Helpdesk and knowledge-base backend: ticket lifecycle with SLA accounting,
//! role-gated access, article publication, and an append-only audit trail.
//!
//! # Architecture
//!
//! ```text
//!  HTTP (api)  ──►  Engine service  ──►  Permission evaluator  ──►  Grant
//!                        │                                           │
//!                        ▼                                           ▼
//!                  Record store  ◄── persist ──  Reducer (state, action, env)
//!                                                     │
//!                                                     ▼
//!                                              Effects: audit append
//! ```
//!
//! Each engine is a pure reducer over one loaded record. The service around
//! it loads the record, asks the permission evaluator for a [`Grant`], runs
//! the reducer, persists the result and then executes the returned effects.
//! Commands cannot be built without a grant, so no mutation skips the check.
//!
//! # Modules
//!
//! - [`tickets`]: status machine, SLA bookkeeping, comments, assignment
//! - [`articles`]: draft/publish/unpublish/archive, view counting
//! - [`permissions`]: role and ownership rules
//! - [`audit`]: audit entries and the recorder that appends them
//! - [`query`]: filters, paging, role scoping
//! - [`sla`]: deadlines and breach evaluation
//! - [`admin`]: users, teams, categories, tags, SLA policies
//! - [`store`]: persistence contracts, in-memory and `PostgreSQL` stores
//! - [`api`] and [`server`]: the axum HTTP surface
//!
//! [`Grant`]: permissions::Grant

pub mod admin;
pub mod api;
pub mod articles;
pub mod audit;
pub mod config;
pub mod error;
pub mod metrics;
pub mod permissions;
pub mod query;
pub mod server;
pub mod sla;
pub mod store;
pub mod tags;
pub mod tickets;
pub mod types;

pub use config::Config;
pub use error::{HelpdeskError, Result};
