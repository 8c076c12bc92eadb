//! Optimistic (cooperative) execution.
//!
//! The operation runs inline on the caller's task and receives the composed
//! token. Nothing is preempted: an operation that never looks at the token
//! holds the caller for as long as it runs, whatever the timeout.

use tokio_util::sync::CancellationToken;

use crate::resilience::classify::{classify_error, Classified};
use crate::resilience::context::Context;
use crate::resilience::duration::Timeout;
use crate::resilience::error::{IntoCancelled, TimeoutError};
use crate::resilience::notify::TimeoutNotifier;
use crate::resilience::operation::Operation;
use crate::resilience::signal::ComposedSignal;

pub(crate) async fn execute<Args, Op, T, E>(
    op: Op,
    ctx: &Context,
    caller: Option<&CancellationToken>,
    timeout: Timeout,
    notifier: &TimeoutNotifier<T, E>,
) -> Result<T, TimeoutError<E>>
where
    Op: Operation<Args, T, E>,
    E: IntoCancelled,
{
    let signal = ComposedSignal::compose(caller, timeout);

    let err = match op.call(ctx.clone(), signal.token()).await {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    match classify_error(signal.source(), err) {
        Classified::Fault(e) => Err(TimeoutError::Operation(e)),
        Classified::Cancelled(cancelled) => {
            tracing::info!(operation_key = ctx.log_key(), "Operation cancelled by caller");
            Err(TimeoutError::Cancelled(cancelled))
        }
        Classified::TimedOut { cause, .. } => Err(notifier.reject(ctx, timeout, None, cause).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::error::Cancelled;
    use std::time::Duration;

    fn ms(n: u64) -> Timeout {
        Timeout::Finite(Duration::from_millis(n))
    }

    async fn cooperative_sleep(token: CancellationToken, d: Duration) -> Result<u32, Cancelled> {
        tokio::select! {
            _ = token.cancelled() => Err(Cancelled::new()),
            _ = tokio::time::sleep(d) => Ok(1),
        }
    }

    #[tokio::test]
    async fn test_completes_before_timeout() {
        let notifier = TimeoutNotifier::new(None);
        let result = execute(
            |token: CancellationToken| cooperative_sleep(token, Duration::from_millis(10)),
            &Context::new(),
            None,
            ms(1_000),
            &notifier,
        )
        .await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cooperative_timeout() {
        let notifier = TimeoutNotifier::new(None);
        let result = execute(
            |token: CancellationToken| cooperative_sleep(token, Duration::from_secs(3)),
            &Context::new(),
            None,
            ms(50),
            &notifier,
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.rejected().unwrap().timeout(), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_ignoring_the_token_outlives_the_timeout() {
        let notifier = TimeoutNotifier::new(None);
        let started = std::time::Instant::now();
        let result = execute(
            || async {
                tokio::time::sleep(Duration::from_millis(150)).await;
                Ok::<_, Cancelled>(5)
            },
            &Context::new(),
            None,
            ms(20),
            &notifier,
        )
        .await;
        assert_eq!(result.unwrap(), 5);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_unrelated_cancellation_is_a_fault() {
        let notifier = TimeoutNotifier::new(None);
        let result = execute(
            || async { Err::<u32, _>(Cancelled::with_reason("gave up")) },
            &Context::new(),
            None,
            ms(1_000),
            &notifier,
        )
        .await;
        assert!(result.unwrap_err().is_operation());
    }
}
