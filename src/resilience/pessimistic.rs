//! Pessimistic (enforcing) execution.
//!
//! # State Transitions
//! ```text
//! NotStarted → Running:          operation spawned on its own task
//! Running → CompletedNormally:   task finished with Ok
//! Running → Faulted:             task finished with Err (classified)
//! Running → TimedOut:            timer fired first; task handed to the callback
//! Running → CallerCancelled:     caller fired first; task detached
//! ```
//!
//! # Design Decisions
//! - The caller waits on the race, never on the operation itself
//! - A result that is ready when the signal is observed wins over the signal
//! - A panic inside the operation is resumed on the caller with its payload

use tokio_util::sync::CancellationToken;

use crate::observability::metrics;
use crate::resilience::abandoned::AbandonedOperation;
use crate::resilience::classify::{classify_error, classify_signal, Classified, Fired};
use crate::resilience::context::Context;
use crate::resilience::duration::Timeout;
use crate::resilience::error::{Cancelled, IntoCancelled, TimeoutError};
use crate::resilience::notify::TimeoutNotifier;
use crate::resilience::operation::Operation;
use crate::resilience::signal::{CancelSource, ComposedSignal};

enum Race<R> {
    Finished(R),
    Signalled(CancelSource),
}

pub(crate) async fn execute<Args, Op, T, E>(
    op: Op,
    ctx: &Context,
    caller: Option<&CancellationToken>,
    timeout: Timeout,
    notifier: &TimeoutNotifier<T, E>,
) -> Result<T, TimeoutError<E>>
where
    Op: Operation<Args, T, E>,
    T: Send + 'static,
    E: IntoCancelled + Send + 'static,
{
    let signal = ComposedSignal::compose(caller, timeout);
    let mut task = tokio::spawn(op.call(ctx.clone(), signal.token()));

    let race = tokio::select! {
        biased;
        joined = &mut task => Race::Finished(joined),
        source = signal.fired() => Race::Signalled(source),
    };

    let joined = match race {
        Race::Finished(joined) => joined,
        // Finished between the two polls of the race: still a completion.
        Race::Signalled(_) if task.is_finished() => task.await,
        Race::Signalled(source) => {
            return match classify_signal(source) {
                Fired::Timer(cause) => {
                    let abandoned = AbandonedOperation::new(task, ctx.log_key());
                    metrics::record_abandoned();
                    Err(notifier.reject(ctx, timeout, Some(abandoned), cause).into())
                }
                Fired::Caller(cancelled) => {
                    tracing::info!(
                        operation_key = ctx.log_key(),
                        "Operation cancelled by caller; detaching task"
                    );
                    drop(task);
                    Err(TimeoutError::Cancelled(cancelled))
                }
            };
        }
    };

    let err = match joined {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => e,
        Err(join_err) if join_err.is_panic() => std::panic::resume_unwind(join_err.into_panic()),
        Err(_) => {
            tracing::warn!(operation_key = ctx.log_key(), "Operation task was aborted");
            return Err(TimeoutError::Cancelled(Cancelled::with_reason(
                "operation task was aborted",
            )));
        }
    };

    match classify_error(signal.source(), err) {
        Classified::Fault(e) => Err(TimeoutError::Operation(e)),
        Classified::Cancelled(cancelled) => Err(TimeoutError::Cancelled(cancelled)),
        Classified::TimedOut { cause, error } => {
            // Stopped on the timer's cancel before the race saw it; the
            // handle carries the outcome that is already known.
            let abandoned = AbandonedOperation::finished(Err(error), ctx.log_key());
            Err(notifier.reject(ctx, timeout, Some(abandoned), cause).into())
        }
    }
}
