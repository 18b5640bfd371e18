//! Ticket lifecycle through the engine: numbering, status changes, SLA
//! bookkeeping, comments and the audit trail.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{context, Desk};
use helpdesk::audit::{AuditAction, EntityType};
use helpdesk::error::HelpdeskError;
use helpdesk::query::{AuditFilter, PageRequest, TicketFilter};
use helpdesk::tickets::{CreateTicket, UpdateTicket};
use helpdesk::types::{TicketPriority, TicketStatus};
use helpdesk_auth::Role;
use helpdesk_core::environment::Clock;

#[tokio::test]
async fn ticket_numbers_are_sequential_and_formatted() {
    let desk = Desk::new();
    let requester = desk.user("sato@example.com", Role::Requester).await;

    let first = desk.ticket(&requester, "VPN drops").await;
    let second = desk.ticket(&requester, "Mailbox full").await;
    let third = desk.ticket(&requester, "Printer offline").await;

    assert_eq!(first.ticket_number.to_string(), "TKT-00001");
    assert_eq!(second.ticket_number.to_string(), "TKT-00002");
    assert_eq!(third.ticket_number.to_string(), "TKT-00003");
    assert_eq!(first.status, TicketStatus::Open);
    assert_eq!(first.requester_id, requester.id);
}

#[tokio::test]
async fn rejected_creation_does_not_consume_a_number() {
    let desk = Desk::new();
    let requester = desk.user("sato@example.com", Role::Requester).await;

    let rejected = desk
        .state
        .tickets
        .create(&requester, context(), CreateTicket {
            title: "   ".to_string(),
            description: "nothing".to_string(),
            priority: TicketPriority::Low,
            category_id: None,
            tags: Vec::new(),
        })
        .await;
    assert!(matches!(rejected, Err(HelpdeskError::Validation(_))));

    let ticket = desk.ticket(&requester, "Real problem").await;
    assert_eq!(ticket.ticket_number.to_string(), "TKT-00001");
}

#[tokio::test]
async fn same_tag_name_on_two_tickets_is_one_tag() {
    let desk = Desk::new();
    let requester = desk.user("sato@example.com", Role::Requester).await;
    let operator = desk.user("agent@example.com", Role::Operator).await;

    let raise = |title: &str| CreateTicket {
        title: title.to_string(),
        description: "Tunnel keeps resetting".to_string(),
        priority: TicketPriority::Medium,
        category_id: None,
        tags: vec!["vpn".to_string()],
    };
    let first = desk.state.tickets.create(&requester, context(), raise("VPN drops")).await.unwrap();
    let second = desk.state.tickets.create(&operator, context(), raise("VPN slow")).await.unwrap();

    assert_eq!(first.tags.len(), 1);
    assert_eq!(second.tags.len(), 1);
    assert_eq!(first.tags[0].id, second.tags[0].id);
    assert_eq!(second.tags[0].name, "vpn");

    let tags = desk.state.admin.list_tags(&operator).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].id, first.tags[0].id);
}

#[tokio::test]
async fn waiting_time_is_accumulated_across_intervals() {
    let desk = Desk::new();
    let requester = desk.user("sato@example.com", Role::Requester).await;
    let operator = desk.user("agent@example.com", Role::Operator).await;
    let ticket = desk.ticket(&requester, "VPN drops").await;
    let tickets = &desk.state.tickets;

    tickets.transition(&operator, context(), ticket.id, TicketStatus::InProgress).await.unwrap();
    let waiting = tickets
        .transition(&operator, context(), ticket.id, TicketStatus::WaitingCustomer)
        .await
        .unwrap();
    assert_eq!(waiting.waiting_customer_started_at, Some(desk.clock.now()));

    desk.clock.advance_secs(100);
    let resumed = tickets
        .transition(&requester, context(), ticket.id, TicketStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(resumed.total_waiting_customer_duration, 100);
    assert_eq!(resumed.waiting_customer_started_at, None);

    tickets.transition(&operator, context(), ticket.id, TicketStatus::WaitingCustomer).await.unwrap();
    desk.clock.advance_secs(50);
    let resolved = tickets
        .transition(&operator, context(), ticket.id, TicketStatus::Resolved)
        .await
        .unwrap();
    assert_eq!(resolved.total_waiting_customer_duration, 150);
    assert_eq!(resolved.resolved_at, Some(desk.clock.now()));
}

#[tokio::test]
async fn resolution_and_close_stamps_are_set_once() {
    let desk = Desk::new();
    let requester = desk.user("sato@example.com", Role::Requester).await;
    let operator = desk.user("agent@example.com", Role::Operator).await;
    let ticket = desk.ticket(&requester, "VPN drops").await;
    let tickets = &desk.state.tickets;

    let resolved = tickets.transition(&operator, context(), ticket.id, TicketStatus::Resolved).await.unwrap();
    let first_resolution = resolved.resolved_at;
    assert!(first_resolution.is_some());

    desk.clock.advance_secs(600);
    tickets.transition(&operator, context(), ticket.id, TicketStatus::InProgress).await.unwrap();
    let again = tickets.transition(&operator, context(), ticket.id, TicketStatus::Resolved).await.unwrap();
    assert_eq!(again.resolved_at, first_resolution);

    desk.clock.advance_secs(60);
    let closed = tickets.transition(&requester, context(), ticket.id, TicketStatus::Closed).await.unwrap();
    assert_eq!(closed.closed_at, Some(desk.clock.now()));
    assert_eq!(closed.status, TicketStatus::Closed);
}

#[tokio::test]
async fn requesters_only_make_their_own_moves() {
    let desk = Desk::new();
    let requester = desk.user("sato@example.com", Role::Requester).await;
    let stranger = desk.user("tanaka@example.com", Role::Requester).await;
    let operator = desk.user("agent@example.com", Role::Operator).await;
    let ticket = desk.ticket(&requester, "VPN drops").await;
    let tickets = &desk.state.tickets;

    let denied = tickets.transition(&requester, context(), ticket.id, TicketStatus::InProgress).await;
    assert!(matches!(denied, Err(HelpdeskError::PermissionDenied(_))));

    tickets.transition(&operator, context(), ticket.id, TicketStatus::WaitingCustomer).await.unwrap();
    let denied = tickets.transition(&stranger, context(), ticket.id, TicketStatus::InProgress).await;
    assert!(matches!(denied, Err(HelpdeskError::PermissionDenied(_))));

    let resumed = tickets.transition(&requester, context(), ticket.id, TicketStatus::InProgress).await;
    assert_eq!(resumed.map(|t| t.status), Ok(TicketStatus::InProgress));

    let peek = tickets.get(&stranger, ticket.id).await;
    assert!(matches!(peek, Err(HelpdeskError::PermissionDenied(_))));

    let edit = tickets
        .update(&requester, context(), ticket.id, UpdateTicket {
            priority: Some(TicketPriority::Urgent),
            ..UpdateTicket::default()
        })
        .await;
    assert!(matches!(edit, Err(HelpdeskError::PermissionDenied(_))));
}

#[tokio::test]
async fn requester_listing_is_scoped_to_their_tickets() {
    let desk = Desk::new();
    let sato = desk.user("sato@example.com", Role::Requester).await;
    let tanaka = desk.user("tanaka@example.com", Role::Requester).await;
    let operator = desk.user("agent@example.com", Role::Operator).await;

    desk.ticket(&sato, "VPN drops").await;
    desk.clock.advance_secs(1);
    desk.ticket(&tanaka, "Mailbox full").await;
    desk.clock.advance_secs(1);
    desk.ticket(&sato, "Printer offline").await;

    let filter = TicketFilter {
        requester_id: Some(tanaka.id),
        ..TicketFilter::default()
    };
    let own = desk.state.tickets.list(&sato, filter, PageRequest::default()).await.unwrap();
    assert_eq!(own.total, 2);
    assert!(own.items.iter().all(|t| t.requester_id == sato.id));
    assert_eq!(own.items[0].title, "Printer offline");

    let all = desk
        .state
        .tickets
        .list(&operator, TicketFilter::default(), PageRequest::new(Some(1), Some(1)).unwrap())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.items.len(), 1);
    assert_eq!(all.items[0].title, "Mailbox full");
}

#[tokio::test]
async fn first_public_staff_reply_stamps_first_response() {
    let desk = Desk::new();
    let requester = desk.user("sato@example.com", Role::Requester).await;
    let operator = desk.user("agent@example.com", Role::Operator).await;
    let ticket = desk.ticket(&requester, "VPN drops").await;
    let tickets = &desk.state.tickets;

    desk.clock.advance_secs(60);
    tickets
        .add_comment(&requester, context(), ticket.id, "Any news?".to_string(), false)
        .await
        .unwrap();
    tickets
        .add_comment(&operator, context(), ticket.id, "Looks like the gateway".to_string(), true)
        .await
        .unwrap();
    assert_eq!(tickets.get(&operator, ticket.id).await.unwrap().first_response_at, None);

    desk.clock.advance_secs(60);
    let replied_at = desk.clock.now();
    tickets
        .add_comment(&operator, context(), ticket.id, "Restarting the gateway".to_string(), false)
        .await
        .unwrap();
    desk.clock.advance_secs(60);
    tickets
        .add_comment(&operator, context(), ticket.id, "Done".to_string(), false)
        .await
        .unwrap();

    let ticket = tickets.get(&operator, ticket.id).await.unwrap();
    assert_eq!(ticket.first_response_at, Some(replied_at));
}

#[tokio::test]
async fn internal_notes_stay_with_staff() {
    let desk = Desk::new();
    let requester = desk.user("sato@example.com", Role::Requester).await;
    let operator = desk.user("agent@example.com", Role::Operator).await;
    let ticket = desk.ticket(&requester, "VPN drops").await;
    let tickets = &desk.state.tickets;

    let denied = tickets
        .add_comment(&requester, context(), ticket.id, "psst".to_string(), true)
        .await;
    assert!(matches!(denied, Err(HelpdeskError::PermissionDenied(_))));

    tickets
        .add_comment(&operator, context(), ticket.id, "Escalate to network".to_string(), true)
        .await
        .unwrap();
    desk.clock.advance_secs(1);
    tickets
        .add_comment(&operator, context(), ticket.id, "We are on it".to_string(), false)
        .await
        .unwrap();

    let visible = tickets.list_comments(&requester, ticket.id).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].content, "We are on it");

    let everything = tickets.list_comments(&operator, ticket.id).await.unwrap();
    assert_eq!(everything.len(), 2);
    assert_eq!(everything[0].content, "Escalate to network");
}

#[tokio::test]
async fn sla_deadline_moves_with_waiting_time() {
    let desk = Desk::new();
    desk.sla_policy(TicketPriority::High, 60, 240, true).await;
    let requester = desk.user("sato@example.com", Role::Requester).await;
    let operator = desk.user("agent@example.com", Role::Operator).await;
    let ticket = desk.ticket(&requester, "VPN drops").await;
    let tickets = &desk.state.tickets;

    tickets.transition(&operator, context(), ticket.id, TicketStatus::WaitingCustomer).await.unwrap();
    desk.clock.advance_secs(300);

    let status = tickets.sla(&requester, ticket.id).await.unwrap();
    assert!(status.paused);
    assert_eq!(status.waiting_seconds, 300);
    assert_eq!(
        status.resolution_due_at,
        ticket.created_at + chrono::Duration::minutes(240) + chrono::Duration::seconds(300)
    );

    let missing = tickets
        .create(&requester, context(), CreateTicket {
            title: "Keyboard".to_string(),
            description: "Sticky keys".to_string(),
            priority: TicketPriority::Low,
            category_id: None,
            tags: Vec::new(),
        })
        .await
        .unwrap();
    let no_policy = tickets.sla(&requester, missing.id).await;
    assert!(matches!(no_policy, Err(HelpdeskError::NotFound { .. })));
}

#[tokio::test]
async fn mutations_leave_an_audit_trail() {
    let desk = Desk::new();
    let admin = desk.user("admin@example.com", Role::Admin).await;
    let requester = desk.user("sato@example.com", Role::Requester).await;
    let operator = desk.user("agent@example.com", Role::Operator).await;
    let ticket = desk.ticket(&requester, "VPN drops").await;
    let tickets = &desk.state.tickets;

    desk.clock.advance_secs(1);
    tickets.transition(&operator, context(), ticket.id, TicketStatus::InProgress).await.unwrap();
    desk.clock.advance_secs(1);
    tickets
        .update(&operator, context(), ticket.id, UpdateTicket {
            priority: Some(TicketPriority::Urgent),
            ..UpdateTicket::default()
        })
        .await
        .unwrap();
    desk.clock.advance_secs(1);
    // Nothing changes, so nothing is recorded.
    tickets
        .update(&operator, context(), ticket.id, UpdateTicket {
            priority: Some(TicketPriority::Urgent),
            ..UpdateTicket::default()
        })
        .await
        .unwrap();

    let filter = AuditFilter {
        entity_type: Some(EntityType::Ticket),
        entity_id: Some(*ticket.id.as_uuid()),
        action: None,
    };
    let log = desk
        .state
        .admin
        .audit_logs(&admin, filter, PageRequest::audit(None, None).unwrap())
        .await
        .unwrap();

    let actions: Vec<AuditAction> = log.items.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![
        AuditAction::TicketUpdated,
        AuditAction::StatusChanged,
        AuditAction::TicketCreated,
    ]);
    assert_eq!(log.items[1].actor_id, operator.id);
    assert_eq!(log.items[1].metadata["old_status"], "OPEN");
    assert_eq!(log.items[1].metadata["new_status"], "IN_PROGRESS");
    assert_eq!(log.items[2].ip_address.as_deref(), Some("203.0.113.7"));

    let denied = desk
        .state
        .admin
        .audit_logs(&operator, AuditFilter::default(), PageRequest::default())
        .await;
    assert!(matches!(denied, Err(HelpdeskError::PermissionDenied(_))));
}
