//! # Slotwise Core
//!
//! Pure scheduling logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The availability compiler (cron patterns to unit timeslots)
//! - The timeslot aggregator behind coverage heatmaps
//! - Week-aligned event transforms (copy, move, publish)
//! - Port interfaces (traits) and the services that drive them
//!
//! ## Architecture Principles
//! - Only depends on `slotwise-common` and `slotwise-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod availability;
pub mod calendar;
pub mod errors;
pub mod heatmap;
pub mod ports;
pub mod zone;

// Re-export specific items to avoid ambiguity
pub use availability::{AvailabilityCompiler, AvailabilityService};
pub use calendar::{
    CopyOutcome, CopyReport, EventCalendarService, EventCalendarTransform, SkipReason,
    SkippedEvent,
};
pub use errors::IntoDomainError;
pub use heatmap::{HeatmapService, TimeslotAggregator};
pub use ports::{PersistenceStore, TaskQueue};
