//! Configuration loading tests.
//!
//! Environment variables are process-wide, so these run serially.

use std::io::Write;

use serial_test::serial;
use sqlhooks::config::{HooksConfig, CONFIG_ENV_VAR};
use sqlhooks::hooks::{LogLevel, Operation};

fn write_yaml(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
#[serial]
fn test_load_defaults_without_sources() {
    std::env::remove_var(CONFIG_ENV_VAR);

    let config = HooksConfig::load(None).unwrap();

    assert!(config.log.enabled);
    assert!(config.trace.enabled);
    assert_eq!(config.log.level, LogLevel::Info);
}

#[test]
#[serial]
fn test_load_explicit_file() {
    std::env::remove_var(CONFIG_ENV_VAR);
    let file = write_yaml(
        r#"
log:
  level: warn
  exclude:
    - "connection:ping"
trace:
  log_arguments: true
"#,
    );

    let config = HooksConfig::load(file.path().to_str()).unwrap();

    assert_eq!(config.log.level, LogLevel::Warn);
    assert_eq!(config.log.exclude, vec![Operation::ConnPing]);
    assert!(config.trace.log_arguments);
    assert_eq!(config.build_hooks().len(), 2);
}

#[test]
#[serial]
fn test_env_file_overrides_explicit_file() {
    let explicit = write_yaml("log:\n  level: warn\n");
    let from_env = write_yaml("log:\n  level: debug\n  enabled: false\n");
    std::env::set_var(CONFIG_ENV_VAR, from_env.path());

    let config = HooksConfig::load(explicit.path().to_str());
    std::env::remove_var(CONFIG_ENV_VAR);
    let config = config.unwrap();

    assert_eq!(config.log.level, LogLevel::Debug);
    assert!(!config.log.enabled);
    assert_eq!(config.build_hooks().len(), 1);
}

#[test]
#[serial]
fn test_prefixed_env_var_overrides_files() {
    std::env::remove_var(CONFIG_ENV_VAR);
    let file = write_yaml("log:\n  level: warn\n");
    std::env::set_var("SQLHOOKS__LOG__LEVEL", "error");
    std::env::set_var("SQLHOOKS__TRACE__ENABLED", "false");

    let config = HooksConfig::load(file.path().to_str());
    std::env::remove_var("SQLHOOKS__LOG__LEVEL");
    std::env::remove_var("SQLHOOKS__TRACE__ENABLED");
    let config = config.unwrap();

    assert_eq!(config.log.level, LogLevel::Error);
    assert!(!config.trace.enabled);
}

#[test]
#[serial]
fn test_missing_explicit_file_fails() {
    std::env::remove_var(CONFIG_ENV_VAR);

    let result = HooksConfig::load(Some("/nonexistent/sqlhooks.yaml"));

    assert!(result.is_err());
}
