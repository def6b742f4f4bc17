//! Coverage heatmap requests and cells
//!
//! Heatmap cells are computed on demand and never stored.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::{HostId, VenueId};
use crate::constants::DEFAULT_TIME_ZONE;

/// How available hosts are reported per cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    /// Flat list of host ids.
    #[default]
    Terms,
    /// Host ids bucketed per venue.
    Nested,
}

/// Hosts available at one venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueBucket {
    pub venue_id: Option<VenueId>,
    pub host_ids: Vec<HostId>,
}

/// Available hosts for one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "buckets", rename_all = "snake_case")]
pub enum Aggregation {
    Terms(Vec<HostId>),
    Nested(Vec<VenueBucket>),
}

impl Aggregation {
    pub fn empty(kind: AggregationKind) -> Self {
        match kind {
            AggregationKind::Terms => Self::Terms(Vec::new()),
            AggregationKind::Nested => Self::Nested(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Terms(hosts) => hosts.is_empty(),
            Self::Nested(buckets) => buckets.is_empty(),
        }
    }

    /// Distinct hosts across all buckets, ascending.
    pub fn host_ids(&self) -> Vec<HostId> {
        let mut hosts: Vec<HostId> = match self {
            Self::Terms(hosts) => hosts.clone(),
            Self::Nested(buckets) => buckets.iter().flat_map(|b| b.host_ids.iter().copied()).collect(),
        };
        hosts.sort_unstable();
        hosts.dedup();
        hosts
    }
}

/// One heatmap cell, labelled in the request's time zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapTimeslot {
    pub year: i32,
    pub month: u32,
    pub day_of_month: u32,
    pub day_of_week: Weekday,
    pub hour: u32,
    pub minute: u32,
    pub minutes_of_timeslot: u32,
    pub datetime_of_start: DateTime<Utc>,
    pub coverage: Aggregation,
}

impl HeatmapTimeslot {
    pub fn datetime_of_end(&self) -> DateTime<Utc> {
        self.datetime_of_start + chrono::Duration::minutes(i64::from(self.minutes_of_timeslot))
    }
}

/// Parameters for a month heatmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapRequest {
    pub year: i32,
    pub month: u32,
    pub minutes_of_timeslot: u32,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    pub host_ids: Vec<HostId>,
    /// Restrict to one venue; `None` covers every venue.
    #[serde(default)]
    pub venue_id: Option<VenueId>,
    #[serde(default)]
    pub kind: AggregationKind,
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.to_string()
}
