//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Scheduling
pub const DEFAULT_UNIT_MINUTES: u32 = 30;
pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const DEFAULT_TIME_ZONE: &str = "UTC";

// Database
pub const DEFAULT_DB_PATH: &str = "slotwise.db";
pub const DEFAULT_DB_POOL_SIZE: u32 = 8;

// Compilation worker
pub const DEFAULT_WORKER_CONCURRENCY: usize = 4;
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
