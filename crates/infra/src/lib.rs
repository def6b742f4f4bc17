//! # Slotwise Infrastructure
//!
//! Adapters for the ports defined in `slotwise-core`.
//!
//! This crate contains:
//! - SQLite persistence (`r2d2` pool, `rusqlite`)
//! - An in-memory store for tests and single-process runs
//! - The background compilation queue
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `slotwise-core`
//! - Contains all "impure" code (I/O, threads, environment)

pub mod config;
pub mod database;
pub mod errors;
pub mod memory_store;
pub mod observability;
pub mod queue;

pub use database::{DbManager, SqliteConnection, SqliteScheduleStore};
pub use errors::InfraError;
pub use memory_store::InMemoryScheduleStore;
pub use observability::init_tracing;
pub use queue::{
    CompilationQueue, CompilationQueueConfig, QueueError, QueueResult, QueueStats, RecompileJob,
};
