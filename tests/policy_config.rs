//! Policies built from configuration files.

use std::io::Write;
use std::time::Duration;

use timeout_policy::config::{load_config, ConfigError, ValidationError};
use timeout_policy::resilience::{BoxError, Strategy, Timeout};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test(flavor = "multi_thread")]
async fn test_policy_from_file_enforces_timeout() {
    let file = write_config(
        r#"
        timeout_ms = 40
        strategy = "pessimistic"
        operation_key = "slow-report"
        "#,
    );

    let config = load_config(file.path()).unwrap();
    let policy = config.to_builder::<(), BoxError>().unwrap().build().unwrap();
    assert_eq!(policy.strategy(), Strategy::Pessimistic);

    let err = policy
        .execute(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(())
        })
        .await
        .unwrap_err();
    assert_eq!(err.rejected().unwrap().timeout(), Duration::from_millis(40));
}

#[test]
fn test_infinite_keyword() {
    let file = write_config("timeout_ms = \"INFINITE\"\n");
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.timeout().unwrap(), Timeout::Infinite);
}

#[test]
fn test_negative_timeout_rejected() {
    let file = write_config("timeout_ms = -20\n");
    match load_config(file.path()).unwrap_err() {
        ConfigError::Validation(errors) => {
            assert_eq!(
                errors,
                vec![ValidationError::NonPositiveTimeout { value: -20, unit: "ms" }]
            );
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_unknown_strategy_is_a_parse_error() {
    let file = write_config("strategy = \"hopeful\"\n");
    assert!(matches!(load_config(file.path()).unwrap_err(), ConfigError::Parse(_)));
}
