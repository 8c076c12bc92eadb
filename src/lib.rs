//! Timeout policy library.
//!
//! Runs async operations under a time limit, with two enforcement
//! strategies:
//!
//! - **Optimistic**: the operation receives a cancellation token and is
//!   expected to observe it.
//! - **Pessimistic**: the operation runs on its own task; on timeout the
//!   caller stops waiting and gets a handle to the abandoned task.
//!
//! Timeouts, caller cancellation and operation failures stay distinct in
//! [`TimeoutError`].

// Core
pub mod resilience;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::PolicyConfig;
pub use resilience::{
    AbandonedOperation, AbandonedOutcome, Cancelled, Context, Strategy, Timeout, TimeoutError,
    TimeoutPolicy, TimeoutRejected,
};
