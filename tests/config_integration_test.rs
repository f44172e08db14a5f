//! Integration tests for configuration loading and validation
//!
//! Tests that touch environment variables hold `ENV_MUTEX` so they never
//! observe each other's overrides.

use pulse::config::{load_config, ExportMode, OutputEncoding, StoreBackend};
use pulse::domain::{PulseError, SampleKind};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::NamedTempFile;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    for var in [
        "PULSE_APPLICATION_LOG_LEVEL",
        "PULSE_EXPORT_MODE",
        "PULSE_EXPORT_KINDS",
        "PULSE_EXPORT_BATCH_SIZE",
        "PULSE_STORE_PATH",
        "PULSE_TEST_DB_DIR",
    ] {
        std::env::remove_var(var);
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[application]
log_level = "debug"
dry_run = true

[store]
backend = "sqlite"
path = "health.db"
authorized_kinds = ["heart_rate", "step_count"]

[export]
kinds = ["heart_rate", "step_count"]
mode = "incremental"
output_dir = "exports"
encoding = "utf8"
segment_by_source = true
source_ids = ["com.example.watch"]
batch_size = 2000
parallel_sources = 2
progress_interval = 50
max_retries = 5
retry_backoff_ms = [10, 20]

[state]
enabled = false
path = "state.json"

[verification]
enable_verification = true

[logging]
local_enabled = true
local_path = "logs"
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert!(config.is_dry_run());
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(
        config.export.kinds,
        vec![SampleKind::HeartRate, SampleKind::StepCount]
    );
    assert_eq!(config.export.mode, ExportMode::Incremental);
    assert_eq!(config.export.encoding, OutputEncoding::Utf8);
    assert_eq!(config.export.source_ids, vec!["com.example.watch"]);
    assert_eq!(config.export.batch_size, 2000);
    assert_eq!(config.export.retry_backoff_ms, vec![10, 20]);
    assert!(!config.state.enabled);
    assert!(config.verification.enable_verification);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("[store]\nbackend = \"memory\"\n");
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.export.kinds, vec![SampleKind::HeartRate]);
    assert_eq!(config.export.mode, ExportMode::Full);
    assert_eq!(config.export.encoding, OutputEncoding::Utf16);
    assert!(config.export.segment_by_source);
    assert_eq!(config.export.batch_size, 1000);
    assert_eq!(config.export.progress_interval, 100);
    assert!(config.state.enabled);
    assert!(!config.verification.enable_verification);
    assert!(!config.logging.local_enabled);
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("PULSE_TEST_DB_DIR", "/data/health");

    let file = write_config("[store]\npath = \"${PULSE_TEST_DB_DIR}/samples.db\"\n");
    let config = load_config(file.path()).unwrap();
    assert_eq!(
        config.store.path,
        Some(PathBuf::from("/data/health/samples.db"))
    );

    cleanup_env_vars();
}

#[test]
fn test_missing_env_var_is_configuration_error() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("[store]\npath = \"${PULSE_TEST_DB_DIR}/samples.db\"\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, PulseError::Configuration(_)));
    assert!(err.to_string().contains("PULSE_TEST_DB_DIR"));
}

#[test]
fn test_env_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("PULSE_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("PULSE_EXPORT_MODE", "incremental");
    std::env::set_var("PULSE_EXPORT_KINDS", "step_count");
    std::env::set_var("PULSE_EXPORT_BATCH_SIZE", "5000");
    std::env::set_var("PULSE_STORE_PATH", "other.db");

    let file = write_config("[store]\npath = \"health.db\"\n");
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.export.mode, ExportMode::Incremental);
    assert_eq!(config.export.kinds, vec![SampleKind::StepCount]);
    assert_eq!(config.export.batch_size, 5000);
    assert_eq!(config.store.path, Some(PathBuf::from("other.db")));

    cleanup_env_vars();
}

#[test]
fn test_invalid_env_override_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("PULSE_EXPORT_MODE", "sometimes");

    let file = write_config("[store]\npath = \"health.db\"\n");
    let result = load_config(file.path());
    assert!(matches!(result, Err(PulseError::Configuration(_))));

    cleanup_env_vars();
}

#[test]
fn test_validation_errors() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let cases = [
        ("[store]\nbackend = \"sqlite\"\n", "store.path"),
        (
            "[store]\nbackend = \"memory\"\n[export]\nparallel_sources = 0\n",
            "parallel_sources",
        ),
        (
            "[store]\nbackend = \"memory\"\n[export]\nsource_ids = [\"not a bundle id\"]\n",
            "source_ids",
        ),
        (
            "[store]\nbackend = \"memory\"\n[logging]\nlocal_rotation = \"weekly\"\n",
            "local_rotation",
        ),
    ];

    for (content, expected) in cases {
        let file = write_config(content);
        let err = load_config(file.path()).unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "expected '{expected}' in '{err}'"
        );
    }
}

#[test]
fn test_unknown_kind_fails_to_parse() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("[store]\nbackend = \"memory\"\n[export]\nkinds = [\"blood_pressure\"]\n");
    assert!(load_config(file.path()).is_err());
}
