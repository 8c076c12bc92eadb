//! Operations a policy can run.
//!
//! An operation is a closure returning a future of `Result<T, E>`. It may
//! take no arguments, the [`Context`], the cancellation token, or both, in
//! that order:
//!
//! ```text
//! || async { .. }
//! |ctx: Context| async move { .. }
//! |token: CancellationToken| async move { .. }
//! |ctx: Context, token: CancellationToken| async move { .. }
//! ```
//!
//! Closures with arguments need their parameter types written out so the
//! right arity is picked.

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::resilience::context::Context;

/// A one-shot operation run under a timeout policy.
///
/// `Args` only tells the arities apart; callers never name it.
pub trait Operation<Args, T, E>: Send + 'static {
    type Future: Future<Output = Result<T, E>> + Send + 'static;

    fn call(self, ctx: Context, token: CancellationToken) -> Self::Future;
}

impl<F, Fut, T, E> Operation<(), T, E> for F
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    type Future = Fut;

    fn call(self, _ctx: Context, _token: CancellationToken) -> Fut {
        self()
    }
}

impl<F, Fut, T, E> Operation<(Context,), T, E> for F
where
    F: FnOnce(Context) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    type Future = Fut;

    fn call(self, ctx: Context, _token: CancellationToken) -> Fut {
        self(ctx)
    }
}

impl<F, Fut, T, E> Operation<(CancellationToken,), T, E> for F
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    type Future = Fut;

    fn call(self, _ctx: Context, token: CancellationToken) -> Fut {
        self(token)
    }
}

impl<F, Fut, T, E> Operation<(Context, CancellationToken), T, E> for F
where
    F: FnOnce(Context, CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    type Future = Fut;

    fn call(self, ctx: Context, token: CancellationToken) -> Fut {
        self(ctx, token)
    }
}
