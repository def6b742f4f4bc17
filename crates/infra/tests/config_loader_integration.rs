//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use chrono::Weekday;
use slotwise_domain::Config;
use slotwise_infra::config;
use slotwise_infra::queue::CompilationQueueConfig;
use tempfile::Builder;

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
        [database]
        path = "/tmp/slotwise-integration.db"
        pool_size = 6

        [scheduling]
        unit_minutes = 15
        week_start = "Mon"

        [worker]
        concurrency = 3
        job_timeout_secs = 20
        queue_capacity = 128

        [logging]
        level = "slotwise=debug"
        json = true
    "#;

    let mut temp_file = Builder::new().suffix(".toml").tempfile().expect("Failed to create temp file");
    temp_file.write_all(toml_content.as_bytes()).expect("Failed to write to temp file");

    let config = config::load_from_file(Some(temp_file.path().to_path_buf()))
        .expect("Failed to load config from TOML file");

    assert_eq!(config.database.path, "/tmp/slotwise-integration.db");
    assert_eq!(config.database.pool_size, 6);
    assert_eq!(config.scheduling.unit_minutes, 15);
    assert_eq!(config.scheduling.week_start, Weekday::Mon);
    assert_eq!(config.logging.level, "slotwise=debug");
    assert!(config.logging.json);
    assert!(config.validate().is_ok());

    let queue = CompilationQueueConfig::from(&config.worker);
    assert_eq!(queue.concurrency, 3);
    assert_eq!(queue.capacity, 128);
    assert_eq!(queue.job_timeout, std::time::Duration::from_secs(20));
}

#[test]
fn test_load_config_from_json_file_with_defaults() {
    let json_content = r#"{ "database": { "path": "json.db", "pool_size": 2 } }"#;

    let mut temp_file = Builder::new().suffix(".json").tempfile().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let config = config::load_from_file(Some(temp_file.path().to_path_buf()))
        .expect("Failed to load config from JSON file");

    assert_eq!(config.database.path, "json.db");
    assert_eq!(config.scheduling, Config::default().scheduling);
    assert_eq!(config.worker, Config::default().worker);
    assert_eq!(config.logging, Config::default().logging);
}

#[test]
fn test_loaded_config_with_bad_unit_fails_validation() {
    let mut temp_file = Builder::new().suffix(".toml").tempfile().expect("Failed to create temp file");
    temp_file
        .write_all(b"[scheduling]\nunit_minutes = 7\nweek_start = \"Sun\"\n")
        .expect("Failed to write to temp file");

    let config = config::load_from_file(Some(temp_file.path().to_path_buf())).expect("file parses");
    assert!(config.validate().is_err(), "7 does not divide a day");
}
