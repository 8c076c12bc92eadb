//! Timeout notification.
//!
//! # Responsibilities
//! - Invoke the user's timeout callback once per timed-out call
//! - Build the `TimeoutRejected` returned to the caller
//!
//! # Design Decisions
//! - The callback runs before the caller sees the rejection
//! - A panicking callback is caught and reported on the rejection; the
//!   rejection is still returned

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::resilience::abandoned::AbandonedOperation;
use crate::resilience::context::Context;
use crate::resilience::duration::Timeout;
use crate::resilience::error::{Cancelled, TimeoutRejected};

pub(crate) type TimeoutCallback<T, E> =
    Arc<dyn Fn(&Context, Duration, Option<AbandonedOperation<T, E>>, &Cancelled) + Send + Sync>;

pub(crate) struct TimeoutNotifier<T, E> {
    callback: Option<TimeoutCallback<T, E>>,
}

impl<T, E> TimeoutNotifier<T, E> {
    pub(crate) fn new(callback: Option<TimeoutCallback<T, E>>) -> Self {
        Self { callback }
    }

    /// Notify the callback and build the rejection for the caller.
    pub(crate) fn reject(
        &self,
        ctx: &Context,
        timeout: Timeout,
        abandoned: Option<AbandonedOperation<T, E>>,
        cause: Cancelled,
    ) -> TimeoutRejected {
        let duration = timeout.reported();

        tracing::warn!(
            operation_key = ctx.log_key(),
            correlation_id = %ctx.correlation_id(),
            timeout_ms = timeout.log_millis(),
            abandoned = abandoned.is_some(),
            "Operation timed out"
        );

        let rejected = TimeoutRejected::new(duration, cause.clone());
        let Some(callback) = &self.callback else {
            return rejected;
        };

        match catch_unwind(AssertUnwindSafe(|| callback(ctx, duration, abandoned, &cause))) {
            Ok(()) => rejected,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    operation_key = ctx.log_key(),
                    error = %message,
                    "Timeout callback panicked"
                );
                rejected.with_notification_failure(message)
            }
        }
    }
}

impl<T, E> fmt::Debug for TimeoutNotifier<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutNotifier")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "timeout callback panicked".to_string()
    }
}
