// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;
use serial_test::serial;
use std::io::Write;

fn clear_env() {
    for key in [
        "BRAIN_ENTITY_DB_PATH",
        "BRAIN_JOB_DB_PATH",
        "BRAIN_CONVERSATION_DB_PATH",
        "BRAIN_AI_GATEWAY_ENDPOINT",
        "BRAIN_AI_API_KEY",
        "BRAIN_WORKER_POOL_SIZE",
        "BRAIN_DAEMON_HEALTH_INTERVAL_MS",
        "BRAIN_DAEMON_STOP_TIMEOUT_MS",
        "BRAIN_PROGRESS_POLL_INTERVAL_MS",
        "BRAIN_SUMMARIZATION_MESSAGE_THRESHOLD",
        "BRAIN_SUMMARIZATION_MINUTES_THRESHOLD",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_when_no_file_or_env() {
    clear_env();
    let config = KernelConfig::load(None).unwrap();
    assert_eq!(config, KernelConfig::default());
}

#[test]
#[serial]
fn file_overrides_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "worker_pool_size = 7").unwrap();
    writeln!(f, "ai_gateway_endpoint = \"https://example.test\"").unwrap();
    drop(f);

    let config = KernelConfig::load(Some(&path)).unwrap();
    assert_eq!(config.worker_pool_size, 7);
    assert_eq!(config.ai_gateway_endpoint, "https://example.test");
    // unspecified fields keep their defaults
    assert_eq!(config.daemon_health_interval_ms, KernelConfig::default().daemon_health_interval_ms);
}

#[test]
#[serial]
fn env_overrides_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.toml");
    std::fs::write(&path, "worker_pool_size = 7\n").unwrap();
    std::env::set_var("BRAIN_WORKER_POOL_SIZE", "12");

    let config = KernelConfig::load(Some(&path)).unwrap();
    assert_eq!(config.worker_pool_size, 12);

    clear_env();
}

#[test]
#[serial]
fn malformed_toml_is_a_single_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.toml");
    std::fs::write(&path, "worker_pool_size = \"four\"\n").unwrap();

    let err = KernelConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::ParseFailed { .. }));
}

#[test]
#[serial]
fn malformed_env_value_names_the_key() {
    clear_env();
    std::env::set_var("BRAIN_WORKER_POOL_SIZE", "four");

    let err = KernelConfig::load(None).unwrap_err();
    match err {
        ConfigError::InvalidValue { key, .. } => assert_eq!(key, "BRAIN_WORKER_POOL_SIZE"),
        other => panic!("expected InvalidValue, got {other:?}"),
    }

    clear_env();
}

#[test]
#[serial]
fn missing_file_is_read_failed() {
    clear_env();
    let err = KernelConfig::load(Some(Path::new("/nonexistent/brain.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed { .. }));
}
