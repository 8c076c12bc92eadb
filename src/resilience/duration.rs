//! Effective timeout resolution.
//!
//! # Responsibilities
//! - Represent a configured timeout, including the infinite sentinel
//! - Resolve the timeout for one call from a fixed value or a provider
//!
//! # Design Decisions
//! - A provider runs exactly once per call, before any timer exists
//! - A provider that panics unwinds out of the call untouched
//! - Provider output is not validated: zero means "time out at once"

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::validation::ValidationError;
use crate::resilience::context::Context;

/// A timeout: a positive duration, or no limit at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    Finite(Duration),
    Infinite,
}

impl Timeout {
    /// Signed millisecond value that means "no timeout".
    pub const INFINITE_MILLIS: i64 = -1;

    /// Build a validated finite timeout.
    pub fn new(duration: Duration) -> Result<Self, ValidationError> {
        let timeout = Timeout::Finite(duration);
        timeout.validate()?;
        Ok(timeout)
    }

    /// Build from signed milliseconds; `-1` is the infinite sentinel.
    pub fn from_millis_signed(millis: i64) -> Result<Self, ValidationError> {
        if millis == Self::INFINITE_MILLIS {
            return Ok(Timeout::Infinite);
        }
        if millis <= 0 {
            return Err(ValidationError::NonPositiveTimeout { value: millis, unit: "ms" });
        }
        Ok(Timeout::Finite(Duration::from_millis(millis as u64)))
    }

    /// Build from signed seconds. Every value `<= 0` is rejected.
    pub fn from_secs_signed(secs: i64) -> Result<Self, ValidationError> {
        if secs <= 0 {
            return Err(ValidationError::NonPositiveTimeout { value: secs, unit: "s" });
        }
        Ok(Timeout::Finite(Duration::from_secs(secs as u64)))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Timeout::Finite(d) if d.is_zero() => Err(ValidationError::ZeroTimeout),
            _ => Ok(()),
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Timeout::Infinite)
    }

    /// The finite duration, or `None` when infinite.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Timeout::Finite(d) => Some(*d),
            Timeout::Infinite => None,
        }
    }

    /// Duration reported to callers; `Duration::MAX` stands in for infinite.
    pub fn reported(&self) -> Duration {
        self.as_duration().unwrap_or(Duration::MAX)
    }

    /// Milliseconds for log fields, saturating; `u64::MAX` when infinite.
    pub fn log_millis(&self) -> u64 {
        self.as_duration()
            .map(|d| d.as_millis().min(u64::MAX as u128) as u64)
            .unwrap_or(u64::MAX)
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::Finite(d)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeout::Finite(d) => write!(f, "{:?}", d),
            Timeout::Infinite => write!(f, "infinite"),
        }
    }
}

type Provider = Arc<dyn Fn(&Context) -> Timeout + Send + Sync>;

/// Where the timeout of a call comes from.
#[derive(Clone)]
pub(crate) enum DurationSource {
    Fixed(Timeout),
    Provider(Provider),
}

impl DurationSource {
    pub(crate) fn provider<F, D>(f: F) -> Self
    where
        F: Fn(&Context) -> D + Send + Sync + 'static,
        D: Into<Timeout>,
    {
        DurationSource::Provider(Arc::new(move |ctx: &Context| -> Timeout { f(ctx).into() }))
    }

    /// Resolve the effective timeout for one call.
    pub(crate) fn resolve(&self, ctx: &Context) -> Timeout {
        match self {
            DurationSource::Fixed(timeout) => *timeout,
            DurationSource::Provider(provider) => {
                let timeout = provider(ctx);
                tracing::trace!(
                    operation_key = ctx.log_key(),
                    timeout = %timeout,
                    "Timeout resolved from provider"
                );
                timeout
            }
        }
    }
}

impl fmt::Debug for DurationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationSource::Fixed(t) => f.debug_tuple("Fixed").field(t).finish(),
            DurationSource::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_signed_millis() {
        assert!(Timeout::from_millis_signed(0).is_err());
        assert!(Timeout::from_millis_signed(-10).is_err());
        assert_eq!(Timeout::from_millis_signed(-1).unwrap(), Timeout::Infinite);
        assert_eq!(
            Timeout::from_millis_signed(250).unwrap(),
            Timeout::Finite(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_signed_secs() {
        assert!(Timeout::from_secs_signed(0).is_err());
        assert!(Timeout::from_secs_signed(-1).is_err());
        assert_eq!(
            Timeout::from_secs_signed(i64::MAX).unwrap(),
            Timeout::Finite(Duration::from_secs(i64::MAX as u64))
        );
    }

    #[test]
    fn test_log_millis_saturates() {
        assert_eq!(Timeout::Finite(Duration::from_millis(250)).log_millis(), 250);
        assert_eq!(Timeout::Finite(Duration::MAX).log_millis(), u64::MAX);
        assert_eq!(Timeout::Infinite.log_millis(), u64::MAX);
    }

    #[test]
    fn test_zero_and_max() {
        assert!(Timeout::new(Duration::ZERO).is_err());
        assert!(Timeout::new(Duration::MAX).is_ok());
        assert!(Timeout::Infinite.validate().is_ok());
    }

    #[test]
    fn test_fixed_resolves_verbatim() {
        let ctx = Context::new();
        let source = DurationSource::Fixed(Timeout::Infinite);
        assert_eq!(source.resolve(&ctx), Timeout::Infinite);

        let source = DurationSource::Fixed(Timeout::Finite(Duration::from_millis(7)));
        assert_eq!(source.resolve(&ctx), Timeout::Finite(Duration::from_millis(7)));
    }

    #[test]
    fn test_provider_runs_once_per_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let source = DurationSource::provider(move |ctx: &Context| {
            c.fetch_add(1, Ordering::SeqCst);
            ctx.get_duration("timeout").unwrap_or(Duration::from_secs(1))
        });

        let ctx = Context::with_key("SomeOperationKey");
        ctx.insert("timeout", Duration::from_millis(50));
        assert_eq!(source.resolve(&ctx), Timeout::Finite(Duration::from_millis(50)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
