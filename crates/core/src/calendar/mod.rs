//! Week-aligned bulk transforms of scheduled events

pub mod service;
pub mod transform;

pub use service::{CopyReport, EventCalendarService};
pub use transform::{CopyOutcome, EventCalendarTransform, SkipReason, SkippedEvent};
