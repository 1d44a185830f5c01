//! Tests for configuration loading, defaults and validation
//!
//! Uses serial_test for the tests that touch PCS_CONFIG so they don't race.

use pcs_common::config::{
    resolve_config_path, ServiceConfig, SourceMode, CONFIG_ENV_VAR, MAX_CACHE_EXPIRATION_MINUTES,
};
use pcs_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_defaults_match_documented_values() {
    let config = ServiceConfig::default();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.cache.expiration_minutes, 30);
    assert_eq!(config.cache.maximum_size, 100);
    assert_eq!(config.percentage_source.mode, SourceMode::Mock);
    assert_eq!(config.percentage_source.mock.default_percentage, 15.0);
    assert_eq!(config.percentage_source.mock.failure_rate, 0.3);
    assert_eq!(config.percentage_source.retry.max_attempts, 3);
    assert_eq!(config.percentage_source.circuit_breaker.failure_threshold, 5);
    assert_eq!(config.audit.queue_capacity, 100);
    assert_eq!(config.audit.shutdown_grace_secs, 60);
    assert_eq!(config.logging.level, "info");
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = ServiceConfig::from_toml_str(
        r#"
        [cache]
        expiration_minutes = 5

        [percentage_source.mock]
        failure_rate = 0.0
        "#,
    )
    .unwrap();

    assert_eq!(config.cache.expiration_minutes, 5);
    assert_eq!(config.cache.maximum_size, 100);
    assert_eq!(config.percentage_source.mock.failure_rate, 0.0);
    assert_eq!(config.percentage_source.mock.default_percentage, 15.0);
    assert_eq!(config.server.port, 8080);
}

#[test]
fn test_http_mode_parses() {
    let config = ServiceConfig::from_toml_str(
        r#"
        [percentage_source]
        mode = "http"
        url = "http://localhost:9000/percentage"
        timeout_ms = 750
        "#,
    )
    .unwrap();

    assert_eq!(config.percentage_source.mode, SourceMode::Http);
    assert_eq!(config.percentage_source.timeout_ms, 750);
    assert!(config.validate().is_ok());
}

#[test]
fn test_malformed_toml_is_config_error() {
    let result = ServiceConfig::from_toml_str("[cache\nexpiration_minutes = ");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_validate_rejects_out_of_range_values() {
    let mut config = ServiceConfig::default();
    config.cache.expiration_minutes = 0;
    assert!(matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("expiration_minutes")));

    let mut config = ServiceConfig::default();
    config.percentage_source.mock.default_percentage = 100.5;
    assert!(config.validate().is_err());

    let mut config = ServiceConfig::default();
    config.percentage_source.mock.failure_rate = 1.5;
    assert!(config.validate().is_err());

    let mut config = ServiceConfig::default();
    config.percentage_source.mode = SourceMode::Http;
    assert!(matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("url")));

    let mut config = ServiceConfig::default();
    config.percentage_source.retry.max_attempts = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_bounds_cache_expiration() {
    let mut config = ServiceConfig::default();
    config.cache.expiration_minutes = MAX_CACHE_EXPIRATION_MINUTES;
    assert!(config.validate().is_ok());

    config.cache.expiration_minutes = u64::MAX;
    assert!(matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("expiration_minutes")));
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = ServiceConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config, ServiceConfig::default());
}

#[test]
fn test_load_reads_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pcs-calc.toml");
    std::fs::write(&path, "[server]\nport = 9191\n").unwrap();

    let config = ServiceConfig::load(Some(&path)).unwrap();
    assert_eq!(config.server.port, 9191);
}

#[test]
fn test_effective_workers_is_bounded() {
    let mut config = ServiceConfig::default();
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);

    assert_eq!(config.audit.effective_workers(), cpus);

    config.audit.workers = 10_000;
    assert_eq!(config.audit.effective_workers(), cpus * 2);

    config.audit.workers = 1;
    assert_eq!(config.audit.effective_workers(), 1);
}

#[test]
#[serial]
fn test_cli_path_takes_priority_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");
    let resolved = resolve_config_path(Some(Path::new("/tmp/from-cli.toml")));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-cli.toml")));
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");
    let resolved = resolve_config_path(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));
}
