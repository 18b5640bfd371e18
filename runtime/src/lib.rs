//! # Helpdesk Runtime
//!
//! Runs the effects reducers return and aggregates component health.
//!
//! An engine persists the aggregate first and then awaits
//! [`execute_effects`], so by the time a mutating request answers, its audit
//! entry has been appended (or the failure has been logged).

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use helpdesk_core::effect::Effect;

pub mod health;
pub mod metrics;

pub use health::{HealthCheck, HealthReport, HealthStatus};

/// Run `effects` in order and collect the actions they feed back.
pub async fn execute_effects<A, I>(effects: I) -> Vec<A>
where
    A: Send + 'static,
    I: IntoIterator<Item = Effect<A>>,
{
    let mut feedback = Vec::new();
    for effect in effects {
        feedback.append(&mut execute_effect(effect).await);
    }
    feedback
}

/// Run one effect tree.
///
/// `Parallel` children are joined, `Sequential` children awaited in turn.
/// Feedback keeps the children's order either way.
pub fn execute_effect<A>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>>
where
    A: Send + 'static,
{
    async move {
        match effect {
            Effect::None => Vec::new(),
            Effect::Future(work) => {
                metrics::EffectMetrics::record_execution("future");
                work.await.into_iter().collect()
            },
            Effect::Parallel(children) => {
                metrics::EffectMetrics::record_execution("parallel");
                tracing::trace!(children = children.len(), "running effects concurrently");
                join_all(children.into_iter().map(execute_effect))
                    .await
                    .into_iter()
                    .flatten()
                    .collect()
            },
            Effect::Sequential(children) => {
                metrics::EffectMetrics::record_execution("sequential");
                tracing::trace!(children = children.len(), "running effects in sequence");
                let mut feedback = Vec::new();
                for child in children {
                    feedback.append(&mut execute_effect(child).await);
                }
                feedback
            },
        }
    }
    .boxed()
}
