//! # Slotwise Domain
//!
//! Business domain types for the Slotwise scheduling engine.
//!
//! This crate contains:
//! - Availability expressions, compiled timeslots, event containers and
//!   events
//! - Heatmap request and result types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Slotwise crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
