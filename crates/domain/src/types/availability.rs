//! Availability expressions and the timeslots compiled from them

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExpressionId, HostId, PublicationStatus, VenueId};
use crate::constants::DEFAULT_TIME_ZONE;

/// Recurring availability of one host, written as cron patterns
///
/// Start instants matched by `available_crons` open `minutes_of_duration`
/// worth of unit slots; instants matched by `unavailable_crons` remove the
/// slot starting there. Only instants in `[date_of_opening, date_of_closure)`
/// are considered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityExpression {
    pub id: ExpressionId,
    pub host_user_id: HostId,
    #[serde(default)]
    pub venue_ids: BTreeSet<VenueId>,
    #[serde(default)]
    pub available_crons: Vec<String>,
    #[serde(default)]
    pub unavailable_crons: Vec<String>,
    pub date_of_opening: DateTime<Utc>,
    pub date_of_closure: DateTime<Utc>,
    pub minutes_of_duration: u32,
    /// IANA zone the cron fields are read in.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default)]
    pub status: PublicationStatus,
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.to_string()
}

impl AvailabilityExpression {
    /// Expression with no patterns, no venues, UTC and `Editing` status.
    pub fn new(
        id: ExpressionId,
        host_user_id: HostId,
        date_of_opening: DateTime<Utc>,
        date_of_closure: DateTime<Utc>,
        minutes_of_duration: u32,
    ) -> Self {
        Self {
            id,
            host_user_id,
            venue_ids: BTreeSet::new(),
            available_crons: Vec::new(),
            unavailable_crons: Vec::new(),
            date_of_opening,
            date_of_closure,
            minutes_of_duration,
            time_zone: default_time_zone(),
            status: PublicationStatus::Editing,
        }
    }

    #[must_use]
    pub fn with_venues(mut self, venues: impl IntoIterator<Item = VenueId>) -> Self {
        self.venue_ids = venues.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_available(mut self, cron: impl Into<String>) -> Self {
        self.available_crons.push(cron.into());
        self
    }

    #[must_use]
    pub fn with_unavailable(mut self, cron: impl Into<String>) -> Self {
        self.unavailable_crons.push(cron.into());
        self
    }

    #[must_use]
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    /// Any mutation sends the expression back to editing.
    pub fn mark_edited(&mut self) {
        self.status = PublicationStatus::Editing;
    }

    pub fn mark_published(&mut self) {
        self.status = PublicationStatus::Published;
    }
}

/// One unit-length slot in which a host is available at a venue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailabilityTimeslot {
    pub expression_id: ExpressionId,
    pub host_user_id: HostId,
    /// `None` when the owning expression names no venues.
    pub venue_id: Option<VenueId>,
    pub datetime_of_start: DateTime<Utc>,
    pub datetime_of_end: DateTime<Utc>,
}
