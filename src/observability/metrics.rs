//! Metrics collection and exposition.
//!
//! # Metrics
//! - `timeout_policy_executions_total` (counter): executions by strategy, outcome
//! - `timeout_policy_execution_seconds` (histogram): wall time by strategy
//! - `timeout_policy_abandoned_total` (counter): pessimistic operations left running
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no recorder means no cost
//! - Outcome labels are a closed set: completed, timed_out, cancelled, faulted

use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const EXECUTIONS_TOTAL: &str = "timeout_policy_executions_total";
pub const EXECUTION_SECONDS: &str = "timeout_policy_execution_seconds";
pub const ABANDONED_TOTAL: &str = "timeout_policy_abandoned_total";

/// Record one finished execution.
pub fn record_execution(strategy: &'static str, outcome: &'static str, elapsed: Duration) {
    ::metrics::counter!(EXECUTIONS_TOTAL, "strategy" => strategy, "outcome" => outcome).increment(1);
    ::metrics::histogram!(EXECUTION_SECONDS, "strategy" => strategy).record(elapsed.as_secs_f64());
}

/// Record an operation abandoned on timeout.
pub fn record_abandoned() {
    ::metrics::counter!(ABANDONED_TOTAL).increment(1);
}

/// Install a process-wide Prometheus recorder and return its render handle.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}
