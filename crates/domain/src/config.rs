//! Configuration management

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_PATH, DEFAULT_DB_POOL_SIZE, DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_LOG_LEVEL,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_UNIT_MINUTES, DEFAULT_WORKER_CONCURRENCY, MINUTES_PER_DAY,
};
use crate::{Result, SlotwiseError};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Scheduling granularity and calendar layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Length of one timeslot unit in minutes.
    pub unit_minutes: u32,
    /// First day of each week-of-month row.
    pub week_start: Weekday,
}

/// Background compilation worker configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub job_timeout_secs: u64,
    pub queue_capacity: usize,
}

/// Logging output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub json: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DB_PATH.to_string(), pool_size: DEFAULT_DB_POOL_SIZE }
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self { unit_minutes: DEFAULT_UNIT_MINUTES, week_start: Weekday::Sun }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_WORKER_CONCURRENCY,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), json: false }
    }
}

impl Config {
    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    /// Returns `SlotwiseError::Config` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        let unit = self.scheduling.unit_minutes;
        if unit == 0 || MINUTES_PER_DAY % unit != 0 {
            return Err(SlotwiseError::Config(format!(
                "scheduling.unit_minutes must divide {MINUTES_PER_DAY}, got {unit}"
            )));
        }
        if self.database.path.trim().is_empty() {
            return Err(SlotwiseError::Config("database.path must not be empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(SlotwiseError::Config("database.pool_size must be positive".into()));
        }
        if self.worker.concurrency == 0 {
            return Err(SlotwiseError::Config("worker.concurrency must be positive".into()));
        }
        if self.worker.queue_capacity == 0 {
            return Err(SlotwiseError::Config("worker.queue_capacity must be positive".into()));
        }
        if self.worker.job_timeout_secs == 0 {
            return Err(SlotwiseError::Config("worker.job_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}
