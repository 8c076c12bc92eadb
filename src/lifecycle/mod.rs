//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT (Ctrl-C) → cancel the caller token of in-flight executions
//! ```
//!
//! # Design Decisions
//! - Interruption reaches operations as caller cancellation, never as a
//!   timeout, so the two stay distinguishable in results and metrics

pub mod signals;
