//! Configuration schema definitions.
//!
//! This module defines the configuration structure for a timeout policy as
//! read from a TOML file. All types derive Serde traits.

use serde::{Deserialize, Serialize};

use crate::config::validation::ValidationError;
use crate::resilience::duration::Timeout;
use crate::resilience::error::IntoCancelled;
use crate::resilience::timeouts::{Strategy, TimeoutPolicy, TimeoutPolicyBuilder};

/// Root configuration for a timeout policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Timeout in milliseconds, `-1`, or the string "infinite".
    pub timeout_ms: TimeoutSetting,

    /// Enforcement strategy ("optimistic" or "pessimistic").
    pub strategy: Strategy,

    /// Operation key attached to contexts created from this config.
    pub operation_key: Option<String>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: TimeoutSetting::Millis(30_000),
            strategy: Strategy::Optimistic,
            operation_key: None,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl PolicyConfig {
    /// The configured timeout, validated.
    pub fn timeout(&self) -> Result<Timeout, ValidationError> {
        self.timeout_ms.to_timeout()
    }

    /// A policy builder preloaded with this configuration.
    pub fn to_builder<T, E>(&self) -> Result<TimeoutPolicyBuilder<T, E>, ValidationError>
    where
        T: Send + 'static,
        E: IntoCancelled + Send + 'static,
    {
        Ok(TimeoutPolicy::builder(self.timeout()?).strategy(self.strategy))
    }
}

/// Timeout as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TimeoutSetting {
    Millis(i64),
    Keyword(String),
}

impl TimeoutSetting {
    pub fn to_timeout(&self) -> Result<Timeout, ValidationError> {
        match self {
            TimeoutSetting::Millis(ms) => Timeout::from_millis_signed(*ms),
            TimeoutSetting::Keyword(k) if k.eq_ignore_ascii_case("infinite") => Ok(Timeout::Infinite),
            TimeoutSetting::Keyword(k) => Err(ValidationError::UnknownTimeout(k.clone())),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Install the Prometheus recorder.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_full_config() {
        let config: PolicyConfig = toml::from_str(
            r#"
            timeout_ms = 250
            strategy = "pessimistic"
            operation_key = "fetch-quote"

            [observability]
            log_level = "debug"
            metrics_enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(config.timeout().unwrap(), Timeout::Finite(Duration::from_millis(250)));
        assert_eq!(config.strategy, Strategy::Pessimistic);
        assert_eq!(config.operation_key.as_deref(), Some("fetch-quote"));
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn test_infinite_forms() {
        let config: PolicyConfig = toml::from_str("timeout_ms = \"infinite\"").unwrap();
        assert_eq!(config.timeout().unwrap(), Timeout::Infinite);

        let config: PolicyConfig = toml::from_str("timeout_ms = -1").unwrap();
        assert_eq!(config.timeout().unwrap(), Timeout::Infinite);
    }

    #[test]
    fn test_defaults() {
        let config: PolicyConfig = toml::from_str("").unwrap();
        assert_eq!(config.timeout().unwrap(), Timeout::Finite(Duration::from_secs(30)));
        assert_eq!(config.strategy, Strategy::Optimistic);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_unknown_keyword() {
        let setting = TimeoutSetting::Keyword("forever".to_string());
        assert_eq!(
            setting.to_timeout().unwrap_err(),
            ValidationError::UnknownTimeout("forever".to_string())
        );
    }
}
