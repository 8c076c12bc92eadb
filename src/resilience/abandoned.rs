//! Handles to operations left running after a timeout.
//!
//! # Responsibilities
//! - Own the task of an operation the caller stopped waiting for
//! - Report its eventual outcome, once, to whoever holds the handle
//!
//! # Design Decisions
//! - Consuming methods make "exactly once" a property of ownership
//! - Dropping the handle detaches the task; it still runs to completion
//!   and its output is discarded

use std::any::Any;
use std::fmt;
use tokio::task::JoinHandle;

/// How an abandoned operation finished.
pub enum AbandonedOutcome<T, E> {
    /// Returned `Ok`.
    Completed(T),
    /// Returned `Err`.
    Faulted(E),
    /// Panicked; carries the panic payload.
    Panicked(Box<dyn Any + Send + 'static>),
    /// Aborted before finishing.
    Aborted,
}

impl<T, E> AbandonedOutcome<T, E> {
    pub fn is_completed(&self) -> bool {
        matches!(self, AbandonedOutcome::Completed(_))
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, AbandonedOutcome::Faulted(_))
    }

    pub fn into_result(self) -> Option<Result<T, E>> {
        match self {
            AbandonedOutcome::Completed(v) => Some(Ok(v)),
            AbandonedOutcome::Faulted(e) => Some(Err(e)),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AbandonedOutcome::Completed(_) => "completed",
            AbandonedOutcome::Faulted(_) => "faulted",
            AbandonedOutcome::Panicked(_) => "panicked",
            AbandonedOutcome::Aborted => "aborted",
        }
    }
}

impl<T, E> fmt::Debug for AbandonedOutcome<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AbandonedOutcome::{}", self.label())
    }
}

/// An operation that timed out under the pessimistic strategy and is still
/// running on its own task.
pub struct AbandonedOperation<T, E> {
    task: JoinHandle<Result<T, E>>,
    operation_key: String,
}

impl<T, E> AbandonedOperation<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(task: JoinHandle<Result<T, E>>, operation_key: &str) -> Self {
        Self {
            task,
            operation_key: operation_key.to_string(),
        }
    }

    /// Handle for an operation whose outcome was known when it timed out.
    pub(crate) fn finished(result: Result<T, E>, operation_key: &str) -> Self {
        Self::new(tokio::spawn(std::future::ready(result)), operation_key)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Request the task to stop at its next suspension point.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the operation to finish.
    pub async fn outcome(self) -> AbandonedOutcome<T, E> {
        let outcome = match self.task.await {
            Ok(Ok(value)) => AbandonedOutcome::Completed(value),
            Ok(Err(e)) => AbandonedOutcome::Faulted(e),
            Err(e) if e.is_panic() => AbandonedOutcome::Panicked(e.into_panic()),
            Err(_) => AbandonedOutcome::Aborted,
        };

        if outcome.is_completed() {
            tracing::debug!(operation_key = %self.operation_key, "Abandoned operation completed");
        } else {
            tracing::warn!(
                operation_key = %self.operation_key,
                outcome = outcome.label(),
                "Abandoned operation did not complete"
            );
        }
        outcome
    }

    /// Run `f` with the outcome once the operation finishes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_completion<F>(self, f: F)
    where
        F: FnOnce(AbandonedOutcome<T, E>) + Send + 'static,
    {
        tokio::spawn(async move {
            f(self.outcome().await);
        });
    }
}

impl<T, E> fmt::Debug for AbandonedOperation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbandonedOperation")
            .field("operation_key", &self.operation_key)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
