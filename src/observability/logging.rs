//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for binaries
//! - Honour `RUST_LOG`, falling back to a configured level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - The library never installs a subscriber on its own

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(level: &str) -> String {
    format!("timeout_policy={level},timeout_probe={level}")
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(level).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("warn"), "timeout_policy=warn,timeout_probe=warn");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging("debug");
        init_logging("info");
    }
}
