//! SLA evaluation.
//!
//! Compares a ticket's stamps against its priority's policy. Waiting on the
//! customer pushes the resolution deadline back when the policy pauses,
//! including a waiting interval that is still running.

use crate::types::{SlaPolicy, SlaPolicyId, Ticket, TicketPriority, TicketStatus};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Where a ticket stands against its SLA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlaStatus {
    /// Policy evaluated against
    pub policy_id: SlaPolicyId,
    /// Ticket priority
    pub priority: TicketPriority,
    /// First public staff reply is due by
    pub first_response_due_at: DateTime<Utc>,
    /// When the first reply happened
    pub first_response_at: Option<DateTime<Utc>>,
    /// Reply late, or still missing past the deadline
    pub first_response_breached: bool,
    /// Resolution is due by
    pub resolution_due_at: DateTime<Utc>,
    /// When the ticket was resolved
    pub resolved_at: Option<DateTime<Utc>>,
    /// Resolved late, or still unresolved past the deadline
    pub resolution_breached: bool,
    /// Resolution clock currently stopped
    pub paused: bool,
    /// Waiting time counted so far, in seconds
    pub waiting_seconds: i64,
}

/// Waiting time in whole seconds, including a running interval.
#[must_use]
pub fn waiting_seconds(ticket: &Ticket, now: DateTime<Utc>) -> i64 {
    let running = ticket
        .waiting_customer_started_at
        .map_or(0, |started| (now - started).num_seconds().max(0));
    ticket.total_waiting_customer_duration + running
}

/// Evaluate `ticket` against `policy` at `now`.
#[must_use]
pub fn evaluate(ticket: &Ticket, policy: &SlaPolicy, now: DateTime<Utc>) -> SlaStatus {
    let waiting = waiting_seconds(ticket, now);
    let paused_for = if policy.pause_on_waiting_customer { waiting } else { 0 };

    let first_response_due_at =
        ticket.created_at + Duration::minutes(policy.first_response_target_minutes);
    let resolution_due_at = ticket.created_at
        + Duration::minutes(policy.resolution_target_minutes)
        + Duration::seconds(paused_for);

    SlaStatus {
        policy_id: policy.id,
        priority: ticket.priority,
        first_response_due_at,
        first_response_at: ticket.first_response_at,
        first_response_breached: ticket.first_response_at.unwrap_or(now) > first_response_due_at,
        resolution_due_at,
        resolved_at: ticket.resolved_at,
        resolution_breached: ticket.resolved_at.unwrap_or(now) > resolution_due_at,
        paused: policy.pause_on_waiting_customer && ticket.status == TicketStatus::WaitingCustomer,
        waiting_seconds: waiting,
    }
}
