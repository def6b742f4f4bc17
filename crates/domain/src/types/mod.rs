//! Domain types and models
//!
//! - [`availability`]: host availability expressions and compiled timeslots
//! - [`event`]: monthly event containers, events and bulk-transform inputs
//! - [`heatmap`]: coverage heatmap requests and cells

pub mod availability;
pub mod event;
pub mod heatmap;

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

pub use availability::{AvailabilityExpression, AvailabilityTimeslot};
pub use event::{CollisionPolicy, Event, EventContainer, NewEvent, WeekRef};
pub use heatmap::{Aggregation, AggregationKind, HeatmapRequest, HeatmapTimeslot, VenueBucket};

pub type ExpressionId = i64;
pub type HostId = i64;
pub type VenueId = i64;
pub type ContainerId = i64;
pub type EventId = i64;
pub type EventTypeId = i64;

/// Editing/published lifecycle shared by expressions, containers and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    #[default]
    Editing,
    Published,
}

impl_domain_status_conversions!(PublicationStatus {
    Editing => "editing",
    Published => "published",
});

impl PublicationStatus {
    pub fn is_published(self) -> bool {
        self == Self::Published
    }
}
