//! Cancellation composition.
//!
//! # Responsibilities
//! - Merge the caller's token with an internal timer into one token
//! - Record which of the two fired first
//! - Release the timer on every exit path
//!
//! # Design Decisions
//! - The merged token is a child of the caller's token, so a caller cancel
//!   reaches the operation synchronously
//! - Only the timer task records `Timer`, and only while the merged token is
//!   still live; a caller cancel is read from the caller's own token
//! - The first source read is fixed in a `OnceLock`, so every reader agrees
//! - Infinite timeouts spawn nothing

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::resilience::duration::Timeout;

/// Which source fired the composed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelSource {
    Caller,
    Timer,
}

/// Caller cancellation merged with a timeout timer.
#[derive(Debug)]
pub struct ComposedSignal {
    token: CancellationToken,
    caller: Option<CancellationToken>,
    source: Arc<OnceLock<CancelSource>>,
    timer: Option<JoinHandle<()>>,
}

impl ComposedSignal {
    /// Compose the caller's token (if any) with a timer for `timeout`.
    ///
    /// Must be called from within a Tokio runtime when `timeout` is finite.
    pub fn compose(caller: Option<&CancellationToken>, timeout: Timeout) -> Self {
        let token = caller.map(CancellationToken::child_token).unwrap_or_default();
        let source = Arc::new(OnceLock::new());

        let timer = match timeout.as_duration() {
            Some(duration) if !token.is_cancelled() => {
                Some(tokio::spawn(watch(duration, token.clone(), source.clone())))
            }
            _ => None,
        };

        Self {
            token,
            caller: caller.cloned(),
            source,
            timer,
        }
    }

    /// Token handed to the operation.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when either source fires.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Wait for the signal and report which source fired it.
    pub async fn fired(&self) -> CancelSource {
        self.token.cancelled().await;
        // The timer records itself before cancelling; anything else cascaded
        // from the caller.
        *self.source.get_or_init(|| CancelSource::Caller)
    }

    /// The source that fired first, if any has fired.
    pub fn source(&self) -> Option<CancelSource> {
        if let Some(source) = self.source.get() {
            return Some(*source);
        }
        if self.caller.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(*self.source.get_or_init(|| CancelSource::Caller));
        }
        None
    }

    #[cfg(test)]
    fn timer_handle(&self) -> Option<tokio::task::AbortHandle> {
        self.timer.as_ref().map(|t| t.abort_handle())
    }
}

impl Drop for ComposedSignal {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

async fn watch(duration: Duration, merged: CancellationToken, source: Arc<OnceLock<CancelSource>>) {
    tokio::select! {
        biased;
        _ = merged.cancelled() => {}
        _ = tokio::time::sleep(duration) => {
            if !merged.is_cancelled() && source.set(CancelSource::Timer).is_ok() {
                merged.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Timeout {
        Timeout::Finite(Duration::from_millis(n))
    }

    #[tokio::test]
    async fn test_timer_fires() {
        let signal = ComposedSignal::compose(None, ms(20));
        assert!(!signal.is_cancelled());
        assert_eq!(signal.source(), None);

        signal.cancelled().await;
        assert_eq!(signal.source(), Some(CancelSource::Timer));
    }

    #[tokio::test]
    async fn test_caller_fires_first() {
        let caller = CancellationToken::new();
        let signal = ComposedSignal::compose(Some(&caller), ms(10_000));
        let token = signal.token();

        caller.cancel();
        token.cancelled().await;
        assert_eq!(signal.source(), Some(CancelSource::Caller));
    }

    #[tokio::test]
    async fn test_caller_already_cancelled() {
        let caller = CancellationToken::new();
        caller.cancel();
        let signal = ComposedSignal::compose(Some(&caller), ms(10_000));

        assert!(signal.is_cancelled());
        assert_eq!(signal.source(), Some(CancelSource::Caller));
        assert!(signal.timer_handle().is_none());
    }

    #[tokio::test]
    async fn test_infinite_passes_caller_through() {
        let caller = CancellationToken::new();
        let signal = ComposedSignal::compose(Some(&caller), Timeout::Infinite);
        assert!(signal.timer_handle().is_none());
        assert_eq!(signal.source(), None);

        caller.cancel();
        assert!(signal.is_cancelled());
        assert_eq!(signal.source(), Some(CancelSource::Caller));
    }

    #[tokio::test]
    async fn test_infinite_without_caller_never_fires() {
        let signal = ComposedSignal::compose(None, Timeout::Infinite);
        let waited = tokio::time::timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(waited.is_err());
        assert_eq!(signal.source(), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_caller_cancel_reaches_token_without_yielding() {
        let caller = CancellationToken::new();
        let signal = ComposedSignal::compose(Some(&caller), ms(10_000));
        let token = signal.token();

        caller.cancel();
        assert!(token.is_cancelled());
        assert_eq!(signal.source(), Some(CancelSource::Caller));
    }

    #[tokio::test]
    async fn test_fired_reports_timer() {
        let caller = CancellationToken::new();
        let signal = ComposedSignal::compose(Some(&caller), ms(20));
        assert_eq!(signal.fired().await, CancelSource::Timer);
        assert!(!caller.is_cancelled());
    }

    #[tokio::test]
    async fn test_timer_does_not_override_caller() {
        let caller = CancellationToken::new();
        let signal = ComposedSignal::compose(Some(&caller), ms(20));

        caller.cancel();
        assert_eq!(signal.fired().await, CancelSource::Caller);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(signal.source(), Some(CancelSource::Caller));
    }

    #[tokio::test]
    async fn test_drop_releases_timer() {
        let signal = ComposedSignal::compose(None, ms(60_000));
        let timer = signal.timer_handle().unwrap();
        assert!(!timer.is_finished());

        drop(signal);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(timer.is_finished());
    }
}
