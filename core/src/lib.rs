//! # Helpdesk Core
//!
//! The seams every helpdesk engine is built on.
//!
//! Ticket and article rules are reducers. A reducer receives the aggregate
//! the engine loaded, one action, and an environment. It validates the
//! action, mutates the aggregate in place and returns [`effect::Effect`]
//! values describing the follow-up work (appending audit entries). The
//! engine persists the aggregate and only then runs the effects.
//!
//! Nothing in a reducer reads the wall clock or draws random ids; both come
//! from the [`environment`] traits so tests can pin them.

pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// The reducer trait.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Pure state transition: `(state, action, env) -> effects`.
    ///
    /// ```ignore
    /// impl Reducer for TicketReducer {
    ///     type State = TicketState;
    ///     type Action = TicketAction;
    ///     type Environment = TicketEnvironment;
    ///
    ///     fn reduce(&self, state: &mut TicketState, action: TicketAction, env: &TicketEnvironment)
    ///         -> SmallVec<[Effect<TicketAction>; 4]>
    ///     {
    ///         SmallVec::new()
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// Aggregate being worked on
        type State;

        /// Commands and the events they produce
        type Action;

        /// Injected clock, ids and sinks
        type Environment;

        /// Apply `action` to `state` and describe the follow-up work.
        ///
        /// A rejected command leaves the aggregate untouched and returns no
        /// effects. Reducers rarely return more than a couple of effects, so
        /// they stay inline in the `SmallVec`.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Descriptions of follow-up work.
pub mod effect {
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;

    /// Work returned by a reducer, executed later by the runtime.
    ///
    /// A `Future` may resolve to an action that is fed back to the caller.
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Children run concurrently
        Parallel(Vec<Effect<Action>>),

        /// Children run one after another
        Sequential(Vec<Effect<Action>>),

        /// Async work, optionally producing a follow-up action
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> Effect<Action> {
        /// Box an async block as [`Effect::Future`].
        #[must_use]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Self::Future(Box::pin(fut))
        }

        /// `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Self::None)
        }
    }

    impl<Action> fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::None => f.write_str("Effect::None"),
                Self::Parallel(children) => f.debug_tuple("Effect::Parallel").field(children).finish(),
                Self::Sequential(children) => f.debug_tuple("Effect::Sequential").field(children).finish(),
                Self::Future(_) => f.write_str("Effect::Future(<future>)"),
            }
        }
    }
}

/// Clock and id generation behind traits.
pub mod environment {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    /// Source of "now" for every stored timestamp.
    pub trait Clock: Send + Sync {
        /// Current instant
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Source of record identifiers.
    pub trait IdGenerator: Send + Sync {
        /// A fresh identifier, never returned before
        fn next_id(&self) -> Uuid;
    }

    /// Random v4 UUIDs.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct UuidGenerator;

    impl IdGenerator for UuidGenerator {
        fn next_id(&self) -> Uuid {
            Uuid::new_v4()
        }
    }
}
