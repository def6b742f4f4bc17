//! Database implementations

pub mod manager;
pub mod sqlite_store;

pub use manager::{DbManager, SqliteConnection};
pub use sqlite_store::SqliteScheduleStore;
