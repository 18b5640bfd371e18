//! Domain counters.
//!
//! Recorded through the global `metrics` recorder; without an installed
//! recorder every call is a no-op.

use crate::audit::AuditAction;
use crate::types::{ArticleStatus, TicketPriority, TicketStatus};
use metrics::{counter, describe_counter};

/// Register descriptions for the helpdesk counters.
pub fn describe() {
    describe_counter!(
        "helpdesk_tickets_created_total",
        "Tickets raised, labelled by priority"
    );
    describe_counter!(
        "helpdesk_ticket_transitions_total",
        "Ticket status changes, labelled by source and target status"
    );
    describe_counter!(
        "helpdesk_article_transitions_total",
        "Article publication changes, labelled by target status"
    );
    describe_counter!(
        "helpdesk_audit_failures_total",
        "Audit entries that could not be appended, labelled by action"
    );
}

/// A ticket was raised.
pub fn record_ticket_created(priority: TicketPriority) {
    counter!("helpdesk_tickets_created_total", "priority" => priority.as_str()).increment(1);
}

/// A ticket changed status.
pub fn record_ticket_transition(from: TicketStatus, to: TicketStatus) {
    counter!(
        "helpdesk_ticket_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// An article changed publication status.
pub fn record_article_transition(to: ArticleStatus) {
    counter!("helpdesk_article_transitions_total", "to" => to.as_str()).increment(1);
}

/// An audit append failed.
pub fn record_audit_failure(action: AuditAction) {
    counter!("helpdesk_audit_failures_total", "action" => action.as_str()).increment(1);
}
