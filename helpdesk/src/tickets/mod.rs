//! Ticket lifecycle engine.
//!
//! Tickets move through `OPEN`, `IN_PROGRESS`, `WAITING_CUSTOMER`,
//! `RESOLVED`, `CLOSED` and `CANCELED`. Staff may make any transition;
//! requesters may only answer a `WAITING_CUSTOMER` ticket (back to
//! `IN_PROGRESS`) or close a `RESOLVED` one, and only on their own tickets.
//!
//! Every transition does the SLA bookkeeping: waiting-on-customer time is
//! accumulated in whole seconds, and `resolved_at`/`closed_at` are stamped
//! the first time those states are entered.

pub mod actions;
pub mod reducer;
pub mod service;

pub use actions::{NewTicket, TicketAction, TicketChanges};
pub use reducer::{apply_transition, TicketEnvironment, TicketReducer, TicketState};
pub use service::{CreateTicket, TicketEngine, UpdateTicket};
