//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use timeout_policy::resilience::{BoxError, Cancelled};
use tokio_util::sync::CancellationToken;

/// Sleep for `d`, returning a boxed [`Cancelled`] as soon as `token` fires.
pub async fn cooperative_sleep(d: Duration, token: CancellationToken) -> Result<(), BoxError> {
    tokio::select! {
        _ = tokio::time::sleep(d) => Ok(()),
        _ = token.cancelled() => Err(BoxError::from(Cancelled::new())),
    }
}

/// Flag set by an operation once it starts running.
#[derive(Clone, Default)]
pub struct Executed(Arc<AtomicBool>);

#[allow(dead_code)]
impl Executed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Assert `actual` is within `tolerance` of `expected`.
#[allow(dead_code)]
pub fn assert_close(actual: Duration, expected: Duration, tolerance: Duration) {
    let diff = if actual > expected { actual - expected } else { expected - actual };
    assert!(
        diff <= tolerance,
        "expected {:?} (±{:?}), got {:?}",
        expected,
        tolerance,
        actual
    );
}
