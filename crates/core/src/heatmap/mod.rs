//! Coverage heatmaps built from compiled timeslots

pub mod aggregator;
pub mod service;

pub use aggregator::{TargetCell, TimeslotAggregator};
pub use service::HeatmapService;
