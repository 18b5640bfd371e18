//! Axum integration for the helpdesk service.
//!
//! The engines stay free of HTTP concerns. This crate is the thin shell that
//! turns requests into engine calls and engine results into responses.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract data** from the request (JSON, bearer token, paging)
//! 3. **Call the engine** with the authenticated principal
//! 4. **Map result** to an HTTP response, errors through [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use helpdesk_web::{AppError, BearerToken};
//! use axum::{Router, routing::post, Json};
//!
//! async fn create_ticket(
//!     State(state): State<AppState>,
//!     token: BearerToken,
//!     Json(request): Json<CreateTicketRequest>,
//! ) -> Result<Json<Ticket>, AppError> {
//!     let principal = state.auth.verify_token(&token.0).await?;
//!     let ticket = state.tickets.create(&principal, request.into()).await?;
//!     Ok(Json(ticket))
//! }
//!
//! let app = Router::new()
//!     .route("/api/tickets", post(create_ticket))
//!     .with_state(app_state);
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use error::ErrorKind;
pub use extractors::{BearerToken, ClientIp, Pagination, UserAgent};
pub use middleware::{with_request_tracing, REQUEST_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
