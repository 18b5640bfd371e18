//! # Helpdesk Testing
//!
//! Testing utilities for the helpdesk engines.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits (clocks, ids)
//! - A Given/When/Then harness for reducers
//! - Property-based testing strategies
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use helpdesk_testing::{MockClock, test_clock};
//!
//! #[tokio::test]
//! async fn waiting_time_is_accounted() {
//!     let clock = MockClock::starting_at(test_clock().now());
//!     let engine = TicketEngine::new(store, Arc::new(clock.clone()));
//!
//!     engine.transition(&operator, id, TicketStatus::WaitingCustomer).await?;
//!     clock.advance_secs(100);
//!     let ticket = engine.transition(&operator, id, TicketStatus::InProgress).await?;
//!
//!     assert_eq!(ticket.total_waiting_customer_duration, 100);
//! }
//! ```

use chrono::{DateTime, Utc};
use helpdesk_core::environment::{Clock, IdGenerator};


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use uuid::Uuid;

    /// Clock stuck at one instant
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock frozen at 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }

    /// Clock that only moves when told to
    ///
    /// Clones share the same instant, so a test can hand one clone to an
    /// engine and keep another to advance time between operations.
    ///
    /// ```
    /// use helpdesk_testing::mocks::{MockClock, test_clock};
    /// use helpdesk_core::environment::Clock;
    ///
    /// let clock = MockClock::starting_at(test_clock().now());
    /// let start = clock.now();
    /// clock.advance_secs(100);
    /// assert_eq!((clock.now() - start).num_seconds(), 100);
    /// ```
    #[derive(Debug, Clone)]
    pub struct MockClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl MockClock {
        /// Create a clock frozen at `time`
        #[must_use]
        pub fn starting_at(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward (or backward, for negative durations)
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Move the clock forward by whole seconds
        pub fn advance_secs(&self, secs: i64) {
            self.advance(chrono::Duration::seconds(secs));
        }

        /// Jump to an absolute instant
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Default for MockClock {
        fn default() -> Self {
            Self::starting_at(test_clock().now())
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Predictable ids: `00000000-0000-0000-0000-000000000001`, `...02`, ...
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Start counting from one
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(0),
            }
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> Uuid {
            Uuid::from_u128(u128::from(self.next.fetch_add(1, Ordering::SeqCst)) + 1)
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    /// Install a `tracing` subscriber that writes to the test harness output
    ///
    /// Safe to call from every test; only the first call installs anything.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Sequence of `(waiting, active)` second pairs
    ///
    /// Each pair describes a stretch spent waiting on the customer followed
    /// by a stretch of active work, suitable for replaying against a clock.
    pub fn waiting_schedule() -> impl Strategy<Value = Vec<(u16, u16)>> {
        prop::collection::vec((0u16..3_600, 0u16..3_600), 0..8)
    }

    /// Tag name lists with deliberate duplicates
    pub fn tag_names() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(prop::sample::select(vec!["vpn", "VPN", "billing", "login", "mail"]), 0..10)
            .prop_map(|names| names.into_iter().map(str::to_owned).collect())
    }
}

pub use mocks::{FixedClock, MockClock, SequentialIdGenerator, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_new_year_2025() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn mock_clock_clones_share_time() {
        let clock = MockClock::default();
        let handle = clock.clone();
        let start = clock.now();

        handle.advance_secs(42);

        assert_eq!((clock.now() - start).num_seconds(), 42);
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(ids.next_id(), uuid::Uuid::from_u128(1));
        assert_eq!(ids.next_id(), uuid::Uuid::from_u128(2));
    }
}
