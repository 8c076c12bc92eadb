//! Resilience subsystem: timeout enforcement.
//!
//! # Data Flow
//! ```text
//! execute_with(op, ctx, caller_token):
//!     → duration.rs (resolve effective timeout, provider runs once)
//!     → signal.rs (merge caller token with timer, record first source)
//!     → optimistic.rs | pessimistic.rs (strategy-selected executor)
//!     → classify.rs (timer → TimeoutRejected, caller → Cancelled, else verbatim)
//!     → notify.rs (callback once on timeout, before returning)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; a finite timeout always arms a timer
//! - Timeout errors are distinct from caller cancellation and from
//!   operation failures
//! - Timers are per call and released on every exit path
//! - Abandoned operations stay observable through their handle

pub mod abandoned;
pub mod classify;
pub mod context;
pub mod duration;
pub mod error;
pub mod notify;
pub mod operation;
pub mod optimistic;
pub mod pessimistic;
pub mod signal;
pub mod timeouts;

pub use abandoned::{AbandonedOperation, AbandonedOutcome};
pub use context::{Context, ContextValue};
pub use duration::Timeout;
pub use error::{AggregateError, BoxError, Cancelled, IntoCancelled, TimeoutError, TimeoutRejected};
pub use operation::Operation;
pub use signal::{CancelSource, ComposedSignal};
pub use timeouts::{Strategy, TimeoutPolicy, TimeoutPolicyBuilder};
