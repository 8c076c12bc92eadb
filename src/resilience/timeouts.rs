//! Timeout enforcement.
//!
//! # Responsibilities
//! - Hold the immutable timeout configuration of one policy
//! - Run operations under it, producing exactly one terminal outcome
//!
//! # Design Decisions
//! - Configuration is validated by the builder, never at call time
//! - The strategy is a closed enum dispatched once per call; composition and
//!   classification are shared by both executors
//! - A policy is cheap to clone and safe to share across concurrent calls

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::validation::ValidationError;
use crate::observability::metrics;
use crate::resilience::abandoned::AbandonedOperation;
use crate::resilience::context::Context;
use crate::resilience::duration::{DurationSource, Timeout};
use crate::resilience::error::{Cancelled, IntoCancelled, TimeoutError};
use crate::resilience::notify::{TimeoutCallback, TimeoutNotifier};
use crate::resilience::operation::Operation;
use crate::resilience::{optimistic, pessimistic};

/// How a timeout is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// The operation observes the cancellation token itself.
    #[default]
    Optimistic,
    /// The operation runs on its own task and is abandoned on timeout.
    Pessimistic,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Optimistic => "optimistic",
            Strategy::Pessimistic => "pessimistic",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct PolicyInner<T, E> {
    duration: DurationSource,
    strategy: Strategy,
    notifier: TimeoutNotifier<T, E>,
}

/// A timeout policy for operations producing `Result<T, E>`.
pub struct TimeoutPolicy<T, E> {
    inner: Arc<PolicyInner<T, E>>,
}

impl<T, E> Clone for TimeoutPolicy<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for TimeoutPolicy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutPolicy")
            .field("duration", &self.inner.duration)
            .field("strategy", &self.inner.strategy)
            .field("notifier", &self.inner.notifier)
            .finish()
    }
}

impl<T, E> TimeoutPolicy<T, E>
where
    T: Send + 'static,
    E: IntoCancelled + Send + 'static,
{
    /// Policy with a fixed timeout and no callback.
    pub fn new(timeout: impl Into<Timeout>, strategy: Strategy) -> Result<Self, ValidationError> {
        Self::builder(timeout).strategy(strategy).build()
    }

    /// Start building a policy with a fixed timeout.
    pub fn builder(timeout: impl Into<Timeout>) -> TimeoutPolicyBuilder<T, E> {
        TimeoutPolicyBuilder::new(DurationSource::Fixed(timeout.into()))
    }

    /// Start building a policy whose timeout is computed for every call.
    pub fn builder_with_provider<F, D>(provider: F) -> TimeoutPolicyBuilder<T, E>
    where
        F: Fn() -> D + Send + Sync + 'static,
        D: Into<Timeout>,
    {
        TimeoutPolicyBuilder::new(DurationSource::provider(move |_: &Context| provider()))
    }

    /// Like [`builder_with_provider`](Self::builder_with_provider), with the
    /// call's context passed to the provider.
    pub fn builder_with_context_provider<F, D>(provider: F) -> TimeoutPolicyBuilder<T, E>
    where
        F: Fn(&Context) -> D + Send + Sync + 'static,
        D: Into<Timeout>,
    {
        TimeoutPolicyBuilder::new(DurationSource::provider(provider))
    }

    pub fn strategy(&self) -> Strategy {
        self.inner.strategy
    }

    /// Run `op` with a fresh context and no caller cancellation.
    pub async fn execute<Args, Op>(&self, op: Op) -> Result<T, TimeoutError<E>>
    where
        Op: Operation<Args, T, E>,
    {
        self.execute_with(op, &Context::new(), None).await
    }

    /// Run `op` with the given context and optional caller cancellation.
    pub async fn execute_with<Args, Op>(
        &self,
        op: Op,
        ctx: &Context,
        caller: Option<&CancellationToken>,
    ) -> Result<T, TimeoutError<E>>
    where
        Op: Operation<Args, T, E>,
    {
        let inner = &*self.inner;
        let timeout = inner.duration.resolve(ctx);
        let started = Instant::now();

        tracing::debug!(
            operation_key = ctx.log_key(),
            correlation_id = %ctx.correlation_id(),
            strategy = inner.strategy.as_str(),
            timeout = %timeout,
            "Executing under timeout"
        );

        let result = if caller.is_some_and(|c| c.is_cancelled()) {
            tracing::info!(operation_key = ctx.log_key(), "Caller cancelled before start");
            Err(TimeoutError::Cancelled(Cancelled::new()))
        } else {
            match inner.strategy {
                Strategy::Optimistic => {
                    optimistic::execute(op, ctx, caller, timeout, &inner.notifier).await
                }
                Strategy::Pessimistic => {
                    pessimistic::execute(op, ctx, caller, timeout, &inner.notifier).await
                }
            }
        };

        let outcome = match &result {
            Ok(_) => "completed",
            Err(e) => e.kind(),
        };
        metrics::record_execution(inner.strategy.as_str(), outcome, started.elapsed());
        tracing::debug!(
            operation_key = ctx.log_key(),
            outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Execution finished"
        );

        result
    }
}

/// Builder for [`TimeoutPolicy`].
pub struct TimeoutPolicyBuilder<T, E> {
    duration: DurationSource,
    strategy: Strategy,
    callback: Option<TimeoutCallback<T, E>>,
}

impl<T, E> TimeoutPolicyBuilder<T, E>
where
    T: Send + 'static,
    E: IntoCancelled + Send + 'static,
{
    fn new(duration: DurationSource) -> Self {
        Self {
            duration,
            strategy: Strategy::default(),
            callback: None,
        }
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn optimistic(self) -> Self {
        self.strategy(Strategy::Optimistic)
    }

    pub fn pessimistic(self) -> Self {
        self.strategy(Strategy::Pessimistic)
    }

    /// Callback run once when a call times out, before the caller sees the
    /// rejection. The handle is only present under [`Strategy::Pessimistic`].
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context, Duration, Option<AbandonedOperation<T, E>>) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(
            move |ctx: &Context,
                  timeout: Duration,
                  abandoned: Option<AbandonedOperation<T, E>>,
                  _: &Cancelled| f(ctx, timeout, abandoned),
        ));
        self
    }

    /// Like [`on_timeout`](Self::on_timeout), also receiving the
    /// cancellation that ended the wait.
    pub fn on_timeout_with_cause<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context, Duration, Option<AbandonedOperation<T, E>>, &Cancelled)
            + Send
            + Sync
            + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<TimeoutPolicy<T, E>, ValidationError> {
        if let DurationSource::Fixed(timeout) = &self.duration {
            timeout.validate()?;
        }

        Ok(TimeoutPolicy {
            inner: Arc::new(PolicyInner {
                duration: self.duration,
                strategy: self.strategy,
                notifier: TimeoutNotifier::new(self.callback),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::error::BoxError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_rejects_zero_timeout() {
        let err = TimeoutPolicy::<(), BoxError>::builder(Duration::ZERO).build().unwrap_err();
        assert!(matches!(err, ValidationError::ZeroTimeout));
    }

    #[test]
    fn test_accepts_max_and_infinite() {
        assert!(TimeoutPolicy::<(), BoxError>::new(Duration::MAX, Strategy::Pessimistic).is_ok());
        assert!(TimeoutPolicy::<(), BoxError>::new(Timeout::Infinite, Strategy::Optimistic).is_ok());
        let with_callback = TimeoutPolicy::<(), BoxError>::builder(Timeout::Infinite)
            .pessimistic()
            .on_timeout(|_: &Context, _: Duration, _: Option<AbandonedOperation<(), BoxError>>| {})
            .build();
        assert!(with_callback.is_ok());
    }

    #[test]
    fn test_provider_builds_without_calling_it() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let policy = TimeoutPolicy::<(), BoxError>::builder_with_provider(move || {
            c.fetch_add(1, Ordering::SeqCst);
            Duration::from_secs(1)
        })
        .build();
        assert!(policy.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_strategy_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            strategy: Strategy,
        }
        let w: Wrapper = toml::from_str("strategy = \"pessimistic\"").unwrap();
        assert_eq!(w.strategy, Strategy::Pessimistic);
        assert_eq!(Strategy::default(), Strategy::Optimistic);
    }

    #[tokio::test]
    async fn test_execute_fixed_result() {
        let policy = TimeoutPolicy::<u32, BoxError>::new(Duration::from_secs(1), Strategy::Optimistic)
            .unwrap();
        let value = policy.execute(|| async { Ok::<u32, BoxError>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }
}
