//! Integration tests for logging functionality
//!
//! The global subscriber can only be installed once per process, so exactly
//! one test here installs it.

use medbundle::config::{parse_config, LoggingConfig};
use medbundle::domain::PatientId;
use medbundle::logging::{init_logging, init_logging_from_config};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert_eq!(config.local_path, "/var/log/medbundle");
    assert_eq!(config.local_max_files, 7);
}

#[test]
fn test_invalid_level_is_rejected_before_setup() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("never");
    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        ..LoggingConfig::default()
    };

    let err = init_logging("verbose", &config).err().unwrap();
    assert!(err.to_string().contains("verbose"));
    assert!(!log_path.exists());
}

#[test]
fn test_file_logging_follows_loaded_config() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");
    let config = parse_config(&format!(
        r#"
source = "fixture"

[application]
log_level = "debug"

[fixture]
path = "data.json"

[logging]
local_enabled = true
local_path = "{}"
local_rotation = "hourly"
local_max_files = 2
"#,
        log_path.display()
    ))
    .unwrap();

    let guard = init_logging_from_config(None, &config).unwrap();
    assert!(log_path.is_dir());

    // Macros expand to tracing events and must compile with domain types
    let patient_id = PatientId::new(42).unwrap();
    medbundle::log_assembly_start!(patient_id);
    medbundle::log_assembly_complete!(patient_id, 17, Duration::from_millis(3));
    medbundle::log_export_progress!(1, 3);

    // Only enabled because the configured level is debug
    tracing::debug!(target: "medbundle::export", "debug marker");

    // Dropping the guard flushes the non-blocking writer
    drop(guard);

    let contents: String = std::fs::read_dir(&log_path)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("medbundle.log")
        })
        .map(|path| std::fs::read_to_string(path).unwrap())
        .collect();

    let line = contents
        .lines()
        .find(|line| line.contains("Logging initialized"))
        .expect("initialization event in log file");
    let json: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(json["level"], "INFO");

    let debug_line = contents
        .lines()
        .find(|line| line.contains("debug marker"))
        .expect("debug event in log file");
    let json: serde_json::Value = serde_json::from_str(debug_line).unwrap();
    assert_eq!(json["level"], "DEBUG");
}
