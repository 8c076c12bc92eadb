//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0 unless infinite)
//! - Validate the log level directive
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PolicyConfig → Result<(), Vec<ValidationError>>
//! - The policy builder reports through the same error type, so a bad value
//!   reads the same whether it came from code or from a file

use thiserror::Error;

use crate::config::schema::{PolicyConfig, TimeoutSetting};

/// A single invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A finite timeout of zero.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    /// A signed timeout that is zero or negative (and not the infinite sentinel).
    #[error("timeout must be positive, got {value}{unit}")]
    NonPositiveTimeout { value: i64, unit: &'static str },

    /// A string timeout other than "infinite".
    #[error("unknown timeout '{0}' (expected milliseconds or \"infinite\")")]
    UnknownTimeout(String),

    /// A log level that is not one of trace/debug/info/warn/error.
    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &PolicyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = validate_timeout(&config.timeout_ms) {
        errors.push(e);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_timeout(setting: &TimeoutSetting) -> Result<(), ValidationError> {
    setting.to_timeout().map(|_| ())
}
