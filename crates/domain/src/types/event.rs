//! Monthly event containers and the events scheduled in them

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{ContainerId, EventId, EventTypeId, HostId, PublicationStatus, VenueId};

/// One month's schedule page for one venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContainer {
    pub id: ContainerId,
    pub year: i32,
    pub month: u32,
    pub venue_id: VenueId,
    #[serde(default)]
    pub status: PublicationStatus,
}

impl EventContainer {
    pub fn new(id: ContainerId, year: i32, month: u32, venue_id: VenueId) -> Self {
        Self { id, year, month, venue_id, status: PublicationStatus::Editing }
    }
}

/// A scheduled event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub container_id: ContainerId,
    pub host_user_id: HostId,
    pub type_id: EventTypeId,
    pub venue_id: Option<VenueId>,
    pub datetime_of_start: DateTime<Utc>,
    pub datetime_of_end: DateTime<Utc>,
    /// Week of the container month the start falls in, read in `time_zone`.
    pub week_of_month: u32,
    pub time_zone: String,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn duration(&self) -> Duration {
        self.datetime_of_end - self.datetime_of_start
    }

    /// Half-open overlap with `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.datetime_of_start < end && start < self.datetime_of_end
    }
}

/// Input for creating an event; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub container_id: ContainerId,
    pub host_user_id: HostId,
    pub type_id: EventTypeId,
    pub venue_id: Option<VenueId>,
    pub datetime_of_start: DateTime<Utc>,
    pub datetime_of_end: DateTime<Utc>,
    pub week_of_month: u32,
    pub time_zone: String,
    #[serde(default)]
    pub status: PublicationStatus,
}

impl NewEvent {
    pub fn into_event(self, id: EventId) -> Event {
        Event {
            id,
            container_id: self.container_id,
            host_user_id: self.host_user_id,
            type_id: self.type_id,
            venue_id: self.venue_id,
            datetime_of_start: self.datetime_of_start,
            datetime_of_end: self.datetime_of_end,
            week_of_month: self.week_of_month,
            time_zone: self.time_zone,
            status: self.status,
            deleted_at: None,
        }
    }

    pub fn overlaps(&self, event: &Event) -> bool {
        event.overlaps(self.datetime_of_start, self.datetime_of_end)
    }
}

/// A week of a calendar month, numbered from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekRef {
    pub year: i32,
    pub month: u32,
    pub week: u32,
}

impl WeekRef {
    pub const fn new(year: i32, month: u32, week: u32) -> Self {
        Self { year, month, week }
    }
}

/// What happens to events already in a target week during a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Delete the target week's events, then insert the copies.
    #[default]
    Overwrite,
    /// Keep existing events; any overlap with a copy is a conflict.
    Merge,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn event(start_hour: u32, end_hour: u32) -> Event {
        NewEvent {
            container_id: 1,
            host_user_id: 2,
            type_id: 3,
            venue_id: Some(4),
            datetime_of_start: Utc.with_ymd_and_hms(2023, 7, 3, start_hour, 0, 0).unwrap(),
            datetime_of_end: Utc.with_ymd_and_hms(2023, 7, 3, end_hour, 0, 0).unwrap(),
            week_of_month: 2,
            time_zone: "UTC".into(),
            status: PublicationStatus::Editing,
        }
        .into_event(7)
    }

    #[test]
    fn test_overlap_is_half_open() {
        let a = event(9, 10);
        let b = event(10, 11);
        assert!(!a.overlaps(b.datetime_of_start, b.datetime_of_end));
        assert!(a.overlaps(a.datetime_of_start, b.datetime_of_end));
        assert_eq!(a.duration(), Duration::hours(1));
        assert!(!a.is_deleted());
        assert_eq!(a.id, 7);
    }

    #[test]
    fn test_collision_policy_default_and_serde() {
        assert_eq!(CollisionPolicy::default(), CollisionPolicy::Overwrite);
        assert_eq!(serde_json::to_string(&CollisionPolicy::Merge).unwrap(), "\"merge\"");
    }
}
