//! Failure classification.
//!
//! Timeouts and caller cancellation both arrive as a cancelled token; the
//! recorded [`CancelSource`] is what tells them apart.
//!
//! ```text
//! operation error + source
//!     → Timer  + cancellation → TimedOut (becomes TimeoutRejected)
//!     → Caller + cancellation → Cancelled (the operation's own value)
//!     → anything else         → Fault (verbatim)
//! ```

use crate::resilience::error::{Cancelled, IntoCancelled};
use crate::resilience::signal::CancelSource;

/// Result of classifying one failure.
#[derive(Debug)]
pub(crate) enum Classified<E> {
    /// The timer fired and the operation stopped because of it. The error
    /// is kept so a pessimistic handle can still report it.
    TimedOut { cause: Cancelled, error: E },
    Cancelled(Cancelled),
    Fault(E),
}

/// Classify an error returned by the operation.
///
/// Errors are never wrapped: multi-cause aggregates and cancellations the
/// policy did not cause pass through as faults.
pub(crate) fn classify_error<E: IntoCancelled>(source: Option<CancelSource>, err: E) -> Classified<E> {
    match source {
        None => Classified::Fault(err),
        Some(CancelSource::Timer) => match err.cancellation() {
            Some(cause) => Classified::TimedOut { cause, error: err },
            None => Classified::Fault(err),
        },
        Some(CancelSource::Caller) => match err.into_cancelled() {
            Ok(cancelled) => Classified::Cancelled(cancelled),
            Err(err) => Classified::Fault(err),
        },
    }
}

/// Why the composed signal fired while the operation was still running.
#[derive(Debug)]
pub(crate) enum Fired {
    Timer(Cancelled),
    Caller(Cancelled),
}

pub(crate) fn classify_signal(source: CancelSource) -> Fired {
    match source {
        CancelSource::Timer => Fired::Timer(Cancelled::with_reason("timeout elapsed")),
        CancelSource::Caller => Fired::Caller(Cancelled::new()),
    }
}
