#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use slotwise_domain::{NewEvent, PublicationStatus};
use slotwise_infra::database::{DbManager, SqliteScheduleStore};
use tempfile::TempDir;

/// Temporary migrated database that keeps its directory alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new temporary database with the schema applied.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("slotwise-test.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn store(&self) -> SqliteScheduleStore {
        SqliteScheduleStore::new(Arc::clone(&self.manager))
    }

    /// Execute a batch of SQL statements against the database.
    pub fn execute_batch(&self, sql: &str) {
        let conn = self
            .manager
            .get_connection()
            .expect("connection should be available for execute_batch");
        conn.execute_batch(sql).expect("SQL batch execution should succeed");
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).single().expect("valid UTC instant")
}

/// Thirty-minute UTC event for host 42 at venue 5.
pub fn new_event(container_id: i64, start: DateTime<Utc>, week: u32) -> NewEvent {
    NewEvent {
        container_id,
        host_user_id: 42,
        type_id: 1,
        venue_id: Some(5),
        datetime_of_start: start,
        datetime_of_end: start + Duration::minutes(30),
        week_of_month: week,
        time_zone: "UTC".to_string(),
        status: PublicationStatus::Editing,
    }
}
