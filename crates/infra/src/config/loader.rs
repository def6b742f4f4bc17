//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment when one exists
//! 2. Uses environment variables when `SLOTWISE_DB_PATH` is set
//! 3. Otherwise probes multiple paths for a config file
//! 4. Supports JSON and TOML formats
//! 5. Validates the result before returning it
//!
//! ## Environment Variables
//! - `SLOTWISE_DB_PATH`: Database file path (selects env loading)
//! - `SLOTWISE_DB_POOL_SIZE`: Connection pool size
//! - `SLOTWISE_UNIT_MINUTES`: Timeslot unit in minutes
//! - `SLOTWISE_WEEK_START`: First weekday of week-of-month rows (`sun`, `mon`,
//!   ...)
//! - `SLOTWISE_WORKER_CONCURRENCY`: Compilation worker count
//! - `SLOTWISE_JOB_TIMEOUT_SECS`: Per-compilation timeout in seconds
//! - `SLOTWISE_QUEUE_CAPACITY`: Bounded compilation queue size
//! - `SLOTWISE_LOG_LEVEL`: Default tracing filter
//! - `SLOTWISE_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! Unset optional variables keep their defaults.
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.{json,toml}` then `./slotwise.{json,toml}`
//! 2. The same names in the parent and grandparent directory
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Weekday;
use slotwise_domain::{Config, Result, SlotwiseError};

const FILE_NAMES: [&str; 4] = ["config.json", "config.toml", "slotwise.json", "slotwise.toml"];
const SEARCH_DIRS: [&str; 3] = [".", "..", "../.."];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `SlotwiseError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails [`Config::validate`]
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let config = if std::env::var_os("SLOTWISE_DB_PATH").is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        config
    } else {
        tracing::debug!("SLOTWISE_DB_PATH not set, trying config file");
        load_from_file(None)?
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `SLOTWISE_DB_PATH` is required; every other variable falls back to its
/// default.
///
/// # Errors
/// Returns `SlotwiseError::Config` if the path is missing or a value cannot
/// be parsed.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("SLOTWISE_DB_PATH")?;
    if let Some(pool_size) = env_parse("SLOTWISE_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }

    if let Some(unit) = env_parse("SLOTWISE_UNIT_MINUTES")? {
        config.scheduling.unit_minutes = unit;
    }
    if let Some(week_start) = env_parse::<Weekday>("SLOTWISE_WEEK_START")? {
        config.scheduling.week_start = week_start;
    }

    if let Some(concurrency) = env_parse("SLOTWISE_WORKER_CONCURRENCY")? {
        config.worker.concurrency = concurrency;
    }
    if let Some(timeout) = env_parse("SLOTWISE_JOB_TIMEOUT_SECS")? {
        config.worker.job_timeout_secs = timeout;
    }
    if let Some(capacity) = env_parse("SLOTWISE_QUEUE_CAPACITY")? {
        config.worker.queue_capacity = capacity;
    }

    if let Ok(level) = std::env::var("SLOTWISE_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("SLOTWISE_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations (see
/// [`probe_config_paths`]). Sections missing from the file keep their
/// defaults.
///
/// # Errors
/// Returns `SlotwiseError::Config` if no file is found, it cannot be read, or
/// its format is invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SlotwiseError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SlotwiseError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SlotwiseError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SlotwiseError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SlotwiseError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SlotwiseError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations, if any.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| SEARCH_DIRS.iter().map(move |dir| root.join(dir)))
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| SlotwiseError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable; `Ok(None)` when unset.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SlotwiseError::Config(format!("Invalid value for {key} ('{raw}'): {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::{Builder, NamedTempFile};

    use super::*;

    pub(crate) static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const VARS: [&str; 9] = [
        "SLOTWISE_DB_PATH",
        "SLOTWISE_DB_POOL_SIZE",
        "SLOTWISE_UNIT_MINUTES",
        "SLOTWISE_WEEK_START",
        "SLOTWISE_WORKER_CONCURRENCY",
        "SLOTWISE_JOB_TIMEOUT_SECS",
        "SLOTWISE_QUEUE_CAPACITY",
        "SLOTWISE_LOG_LEVEL",
        "SLOTWISE_LOG_JSON",
    ];

    fn clear_vars() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn temp_config(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        std::env::set_var("SLOTWISE_TEST_BOOL_ON", "ON");
        std::env::set_var("SLOTWISE_TEST_BOOL_NO", "no");
        assert!(env_bool("SLOTWISE_TEST_BOOL_ON", false));
        assert!(!env_bool("SLOTWISE_TEST_BOOL_NO", true));

        std::env::remove_var("SLOTWISE_TEST_BOOL_MISSING");
        assert!(env_bool("SLOTWISE_TEST_BOOL_MISSING", true));

        std::env::remove_var("SLOTWISE_TEST_BOOL_ON");
        std::env::remove_var("SLOTWISE_TEST_BOOL_NO");
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        clear_vars();

        std::env::set_var("SLOTWISE_DB_PATH", "/tmp/slotwise-test.db");
        std::env::set_var("SLOTWISE_DB_POOL_SIZE", "3");
        std::env::set_var("SLOTWISE_UNIT_MINUTES", "15");
        std::env::set_var("SLOTWISE_WEEK_START", "mon");
        std::env::set_var("SLOTWISE_WORKER_CONCURRENCY", "6");
        std::env::set_var("SLOTWISE_JOB_TIMEOUT_SECS", "12");
        std::env::set_var("SLOTWISE_QUEUE_CAPACITY", "64");
        std::env::set_var("SLOTWISE_LOG_LEVEL", "debug");
        std::env::set_var("SLOTWISE_LOG_JSON", "true");

        let config = load_from_env();
        clear_vars();
        let config = config.unwrap();

        assert_eq!(config.database.path, "/tmp/slotwise-test.db");
        assert_eq!(config.database.pool_size, 3);
        assert_eq!(config.scheduling.unit_minutes, 15);
        assert_eq!(config.scheduling.week_start, Weekday::Mon);
        assert_eq!(config.worker.concurrency, 6);
        assert_eq!(config.worker.job_timeout_secs, 12);
        assert_eq!(config.worker.queue_capacity, 64);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_from_env_defaults_optional_vars() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        clear_vars();

        std::env::set_var("SLOTWISE_DB_PATH", "only-path.db");
        let config = load_from_env();
        clear_vars();

        let config = config.unwrap();
        assert_eq!(config.database.path, "only-path.db");
        assert_eq!(config.scheduling, Config::default().scheduling);
        assert_eq!(config.worker, Config::default().worker);
    }

    #[test]
    fn test_load_from_env_errors() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        clear_vars();

        assert!(matches!(load_from_env(), Err(SlotwiseError::Config(msg)) if msg.contains("SLOTWISE_DB_PATH")));

        std::env::set_var("SLOTWISE_DB_PATH", "x.db");
        std::env::set_var("SLOTWISE_UNIT_MINUTES", "half-hour");
        let result = load_from_env();
        clear_vars();
        assert!(matches!(result, Err(SlotwiseError::Config(msg)) if msg.contains("SLOTWISE_UNIT_MINUTES")));
    }

    #[test]
    fn test_load_from_env_rejects_bad_weekday() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        clear_vars();

        std::env::set_var("SLOTWISE_DB_PATH", "x.db");
        std::env::set_var("SLOTWISE_WEEK_START", "someday");
        let result = load_from_env();
        clear_vars();
        assert!(matches!(result, Err(SlotwiseError::Config(_))));
    }

    #[test]
    fn test_load_from_file_toml_and_json() {
        let toml_file = temp_config(
            ".toml",
            r#"
            [database]
            path = "from-toml.db"
            pool_size = 2

            [scheduling]
            unit_minutes = 20
            week_start = "Mon"
            "#,
        );
        let config = load_from_file(Some(toml_file.path().to_path_buf())).unwrap();
        assert_eq!(config.database.path, "from-toml.db");
        assert_eq!(config.scheduling.unit_minutes, 20);
        assert_eq!(config.worker, Config::default().worker);

        let json_file = temp_config(".json", r#"{ "worker": { "concurrency": 2, "job_timeout_secs": 5, "queue_capacity": 8 } }"#);
        let config = load_from_file(Some(json_file.path().to_path_buf())).unwrap();
        assert_eq!(config.worker.concurrency, 2);
        assert_eq!(config.database, Config::default().database);
    }

    #[test]
    fn test_load_from_file_errors() {
        let missing = load_from_file(Some(PathBuf::from("/definitely/not/here/slotwise.toml")));
        assert!(matches!(missing, Err(SlotwiseError::Config(msg)) if msg.contains("not found")));

        let yaml = temp_config(".yaml", "database: {}");
        let unsupported = load_from_file(Some(yaml.path().to_path_buf()));
        assert!(matches!(unsupported, Err(SlotwiseError::Config(msg)) if msg.contains("Unsupported")));

        let broken = temp_config(".json", "{ not json");
        assert!(matches!(
            load_from_file(Some(broken.path().to_path_buf())),
            Err(SlotwiseError::Config(msg)) if msg.contains("Invalid JSON")
        ));
    }

    #[test]
    fn test_load_validates_env_config() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        clear_vars();

        std::env::set_var("SLOTWISE_DB_PATH", "x.db");
        std::env::set_var("SLOTWISE_UNIT_MINUTES", "7");
        let result = load();
        clear_vars();
        assert!(matches!(result, Err(SlotwiseError::Config(msg)) if msg.contains("unit_minutes")));
    }
}
