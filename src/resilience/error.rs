//! Error types produced by a timeout policy.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed error for operations that do not use a typed error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Ordinary cancellation of an operation.
///
/// Operations that observe their cancellation token return this (or an
/// error convertible to it, see [`IntoCancelled`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", .reason.as_deref().unwrap_or("operation was cancelled"))]
pub struct Cancelled {
    reason: Option<Cow<'static, str>>,
}

impl Cancelled {
    pub fn new() -> Self {
        Self { reason: None }
    }

    pub fn with_reason(reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// The effective timeout elapsed before the operation completed.
#[derive(Debug, Error)]
#[error("operation timed out after {timeout:?}")]
pub struct TimeoutRejected {
    timeout: Duration,
    #[source]
    cause: Cancelled,
    notification_failure: Option<String>,
}

impl TimeoutRejected {
    pub fn new(timeout: Duration, cause: Cancelled) -> Self {
        Self {
            timeout,
            cause,
            notification_failure: None,
        }
    }

    pub(crate) fn with_notification_failure(mut self, failure: String) -> Self {
        self.notification_failure = Some(failure);
        self
    }

    /// The resolved timeout for the call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The cancellation that ended the wait.
    pub fn cause(&self) -> &Cancelled {
        &self.cause
    }

    /// Panic message from the timeout callback, if it panicked.
    pub fn notification_failure(&self) -> Option<&str> {
        self.notification_failure.as_deref()
    }
}

/// Several independent failures reported together.
///
/// Passed through a policy untouched, however many causes it holds.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AggregateError {
    message: String,
    causes: Vec<BoxError>,
}

impl AggregateError {
    pub fn new(message: impl Into<String>, causes: Vec<BoxError>) -> Self {
        Self {
            message: message.into(),
            causes,
        }
    }

    /// Causes in the order they were reported.
    pub fn causes(&self) -> &[BoxError] {
        &self.causes
    }

    pub fn into_causes(self) -> Vec<BoxError> {
        self.causes
    }
}

/// Recognises operation errors that represent cancellation.
pub trait IntoCancelled: Sized {
    /// The cancellation carried by this error, leaving the error intact.
    fn cancellation(&self) -> Option<Cancelled>;

    fn is_cancellation(&self) -> bool {
        self.cancellation().is_some()
    }

    /// Take the cancellation out of the error, or give the error back.
    fn into_cancelled(self) -> Result<Cancelled, Self>;
}

impl IntoCancelled for Cancelled {
    fn cancellation(&self) -> Option<Cancelled> {
        Some(self.clone())
    }

    fn into_cancelled(self) -> Result<Cancelled, Self> {
        Ok(self)
    }
}

impl IntoCancelled for BoxError {
    fn cancellation(&self) -> Option<Cancelled> {
        self.downcast_ref::<Cancelled>().cloned()
    }

    fn into_cancelled(self) -> Result<Cancelled, Self> {
        self.downcast::<Cancelled>().map(|c| *c)
    }
}

impl IntoCancelled for AggregateError {
    fn cancellation(&self) -> Option<Cancelled> {
        None
    }

    fn into_cancelled(self) -> Result<Cancelled, Self> {
        Err(self)
    }
}

impl IntoCancelled for std::io::Error {
    fn cancellation(&self) -> Option<Cancelled> {
        self.get_ref()
            .and_then(|inner| inner.downcast_ref::<Cancelled>())
            .cloned()
    }

    fn into_cancelled(self) -> Result<Cancelled, Self> {
        if !self.is_cancellation() {
            return Err(self);
        }
        let kind = self.kind();
        match self.into_inner() {
            Some(inner) => inner
                .downcast::<Cancelled>()
                .map(|c| *c)
                .map_err(|other| std::io::Error::new(kind, other)),
            None => Err(std::io::Error::from(kind)),
        }
    }
}

/// Terminal failure of one execution.
#[derive(Debug)]
pub enum TimeoutError<E> {
    /// The timeout elapsed first.
    Rejected(TimeoutRejected),
    /// The caller cancelled the call.
    Cancelled(Cancelled),
    /// The operation failed on its own.
    Operation(E),
}

impl<E> TimeoutError<E> {
    pub fn is_rejected(&self) -> bool {
        matches!(self, TimeoutError::Rejected(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TimeoutError::Cancelled(_))
    }

    pub fn is_operation(&self) -> bool {
        matches!(self, TimeoutError::Operation(_))
    }

    pub fn rejected(&self) -> Option<&TimeoutRejected> {
        match self {
            TimeoutError::Rejected(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_operation(self) -> Option<E> {
        match self {
            TimeoutError::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TimeoutError::Rejected(_) => "timed_out",
            TimeoutError::Cancelled(_) => "cancelled",
            TimeoutError::Operation(_) => "faulted",
        }
    }
}

impl<E> From<TimeoutRejected> for TimeoutError<E> {
    fn from(e: TimeoutRejected) -> Self {
        TimeoutError::Rejected(e)
    }
}

impl<E: fmt::Display> fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutError::Rejected(e) => write!(f, "{}", e),
            TimeoutError::Cancelled(e) => write!(f, "{}", e),
            TimeoutError::Operation(e) => write!(f, "{}", e),
        }
    }
}

impl<E> std::error::Error for TimeoutError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TimeoutError::Rejected(e) => std::error::Error::source(e),
            TimeoutError::Cancelled(_) => None,
            TimeoutError::Operation(e) => std::error::Error::source(e),
        }
    }
}
