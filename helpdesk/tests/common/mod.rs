//! Shared fixtures for the integration tests.
//!
//! Each test builds its own [`Desk`]: a fresh in-memory store, a clock that
//! only moves when told to, and the engines wired the way the server wires
//! them.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use chrono::Duration;
use helpdesk::articles::PublishedAtPolicy;
use helpdesk::audit::RequestContext;
use helpdesk::server::AppState;
use helpdesk::store::{InMemoryStore, RecordStore};
use helpdesk::tickets::CreateTicket;
use helpdesk::types::{SlaPolicy, SlaPolicyId, Ticket, TicketPriority, User};
use helpdesk_auth::password::hash_password;
use helpdesk_auth::{Principal, Role, UserId};
use helpdesk_core::environment::Clock;
use helpdesk_testing::{MockClock, SequentialIdGenerator};
use std::sync::Arc;
use uuid::Uuid;

/// Password of every account created through [`Desk::account`].
pub const PASSWORD: &str = "correct horse battery staple";

/// A fully wired helpdesk over an in-memory store.
pub struct Desk {
    pub store: Arc<dyn RecordStore>,
    pub clock: MockClock,
    pub state: AppState,
}

impl Desk {
    pub fn new() -> Self {
        Self::with_policy(PublishedAtPolicy::FirstPublishOnly)
    }

    pub fn with_policy(policy: PublishedAtPolicy) -> Self {
        helpdesk_testing::helpers::init_test_tracing();

        let store: Arc<dyn RecordStore> = Arc::new(InMemoryStore::new());
        let clock = MockClock::default();
        let state = AppState::new(
            Arc::clone(&store),
            Arc::new(clock.clone()),
            Arc::new(SequentialIdGenerator::new()),
            Duration::minutes(30),
            policy,
        );

        Self { store, clock, state }
    }

    /// Insert a user with a placeholder hash; enough for engine-level tests.
    pub async fn user(&self, email: &str, role: Role) -> Principal {
        self.insert(email, role, "not-a-real-hash".to_string()).await
    }

    /// Insert a user that can log in with [`PASSWORD`].
    pub async fn account(&self, email: &str, role: Role) -> Principal {
        let hash = hash_password(PASSWORD).expect("hashing succeeds");
        self.insert(email, role, hash).await
    }

    async fn insert(&self, email: &str, role: Role, password_hash: String) -> Principal {
        let now = self.clock.now();
        let user = User {
            id: UserId(Uuid::new_v4()),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            role,
            team_id: None,
            password_hash,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&user).await.expect("user inserted");

        Principal {
            id: user.id,
            email: user.email,
            role,
        }
    }

    /// Install an SLA policy for `priority`.
    pub async fn sla_policy(&self, priority: TicketPriority, first: i64, resolution: i64, pause: bool) {
        let now = self.clock.now();
        let policy = SlaPolicy {
            id: SlaPolicyId::from_uuid(Uuid::new_v4()),
            priority,
            first_response_target_minutes: first,
            resolution_target_minutes: resolution,
            pause_on_waiting_customer: pause,
            timezone: "Asia/Tokyo".to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_sla_policy(&policy).await.expect("policy inserted");
    }

    /// Raise a ticket with sensible defaults.
    pub async fn ticket(&self, requester: &Principal, title: &str) -> Ticket {
        self.state
            .tickets
            .create(requester, context(), CreateTicket {
                title: title.to_string(),
                description: "Steps to reproduce attached".to_string(),
                priority: TicketPriority::High,
                category_id: None,
                tags: Vec::new(),
            })
            .await
            .expect("ticket created")
    }
}

/// Request metadata as the HTTP layer would record it.
pub fn context() -> RequestContext {
    RequestContext {
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: Some("integration-tests".to_string()),
    }
}
