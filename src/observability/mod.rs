//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Policy executions produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Prometheus text exposition (when a recorder is installed)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing a subscriber or recorder is left to
//!   the binary
//! - Metric updates without a recorder are no-ops
//! - Every event carries the operation key when one is set

pub mod logging;
pub mod metrics;
