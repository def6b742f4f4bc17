//! Event calendar transform
//!
//! Pure operations over already-loaded events:
//! - [`EventCalendarTransform::copy_many`] replays one week's events onto
//!   another week, matching weekdays and keeping local time of day
//! - [`EventCalendarTransform::bulk_move`] shifts events by a signed number
//!   of minutes
//! - [`EventCalendarTransform::publish`] / [`EventCalendarTransform::unpublish`]
//!   flip a container's status

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use slotwise_common::time::WeekOfMonthGrid;
use slotwise_domain::{
    Event, EventContainer, EventId, NewEvent, PublicationStatus, Result, SlotwiseError, WeekRef,
};

use crate::errors::IntoDomainError;
use crate::zone::parse_time_zone;

/// Why an event could not be copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The target week is partial and lacks the event's weekday.
    WeekdayOutsideWeek,
    /// The local start time does not exist on the target day (DST gap).
    NonexistentLocalTime,
}

/// An event left out of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEvent {
    pub event_id: EventId,
    pub weekday: Weekday,
    pub reason: SkipReason,
}

/// Result of copying one week onto another
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOutcome {
    /// New events ordered by start.
    pub created: Vec<NewEvent>,
    pub skipped: Vec<SkippedEvent>,
}

impl CopyOutcome {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.skipped.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCalendarTransform {
    grid: WeekOfMonthGrid,
}

impl EventCalendarTransform {
    pub const fn new(grid: WeekOfMonthGrid) -> Self {
        Self { grid }
    }

    pub const fn grid(&self) -> &WeekOfMonthGrid {
        &self.grid
    }

    /// Copy the live events of week `from` onto week `to` of `target`.
    ///
    /// # Errors
    /// - `InvalidState` when `target` is published
    /// - `InvalidInput` when `to` is not the target container's month
    /// - `Range` when either week lies outside its month
    pub fn copy_many(
        &self,
        events: &[Event],
        from: WeekRef,
        to: WeekRef,
        target: &EventContainer,
    ) -> Result<CopyOutcome> {
        if target.status.is_published() {
            return Err(SlotwiseError::InvalidState(format!(
                "container {} is published and cannot receive copies",
                target.id
            )));
        }
        if (target.year, target.month) != (to.year, to.month) {
            return Err(SlotwiseError::InvalidInput(format!(
                "week {}-{} is not in container {} ({}-{})",
                to.year, to.month, target.id, target.year, target.month
            )));
        }
        self.grid.check_week(from.year, from.month, from.week).map_err(IntoDomainError::into_domain)?;
        self.grid.check_week(to.year, to.month, to.week).map_err(IntoDomainError::into_domain)?;

        let mut outcome = CopyOutcome::default();
        for event in events.iter().filter(|e| !e.is_deleted() && e.week_of_month == from.week) {
            let tz = parse_time_zone(&event.time_zone)?;
            let local_start = event.datetime_of_start.with_timezone(&tz);
            let weekday = local_start.weekday();
            let skip = |reason| SkippedEvent { event_id: event.id, weekday, reason };

            let Some(day) = self
                .grid
                .day_in_week(to.year, to.month, to.week, weekday)
                .map_err(IntoDomainError::into_domain)?
            else {
                outcome.skipped.push(skip(SkipReason::WeekdayOutsideWeek));
                continue;
            };

            let Some(start) = tz.from_local_datetime(&day.and_time(local_start.time())).earliest()
            else {
                outcome.skipped.push(skip(SkipReason::NonexistentLocalTime));
                continue;
            };
            let start = start.with_timezone(&Utc);

            outcome.created.push(NewEvent {
                container_id: target.id,
                host_user_id: event.host_user_id,
                type_id: event.type_id,
                venue_id: Some(target.venue_id),
                datetime_of_start: start,
                datetime_of_end: start + event.duration(),
                week_of_month: to.week,
                time_zone: event.time_zone.clone(),
                status: PublicationStatus::Editing,
            });
        }

        outcome.created.sort_by_key(|e| (e.datetime_of_start, e.host_user_id));
        Ok(outcome)
    }

    /// Shift events by `minutes` (negative moves earlier).
    ///
    /// Duration and time zone are kept; `week_of_month` is recomputed from
    /// the new local start.
    ///
    /// # Errors
    /// `Range` when a shifted instant is not representable.
    pub fn bulk_move(&self, events: &[Event], minutes: i64) -> Result<Vec<Event>> {
        let offset = Duration::try_minutes(minutes)
            .ok_or_else(|| SlotwiseError::Range(format!("cannot move by {minutes} minutes")))?;

        events
            .iter()
            .map(|event| {
                let start = shift(event.datetime_of_start, offset)?;
                let end = shift(event.datetime_of_end, offset)?;
                let tz = parse_time_zone(&event.time_zone)?;
                Ok(Event {
                    datetime_of_start: start,
                    datetime_of_end: end,
                    week_of_month: self.week_of(start, tz),
                    ..event.clone()
                })
            })
            .collect()
    }

    /// Week of month of `instant`'s local date in `tz`.
    pub fn week_of(&self, instant: DateTime<Utc>, tz: Tz) -> u32 {
        self.grid.week_of_month(instant.with_timezone(&tz).date_naive())
    }

    /// Mark a container published.
    ///
    /// # Errors
    /// `InvalidState` when it is already published or holds no events.
    pub fn publish(&self, container: &EventContainer, event_count: usize) -> Result<EventContainer> {
        if container.status.is_published() {
            return Err(SlotwiseError::InvalidState(format!(
                "container {} is already published",
                container.id
            )));
        }
        if event_count == 0 {
            return Err(SlotwiseError::InvalidState(format!(
                "container {} has no events to publish",
                container.id
            )));
        }
        Ok(EventContainer { status: PublicationStatus::Published, ..container.clone() })
    }

    /// Return a published container to editing.
    ///
    /// # Errors
    /// `InvalidState` when it is not published.
    pub fn unpublish(&self, container: &EventContainer) -> Result<EventContainer> {
        if !container.status.is_published() {
            return Err(SlotwiseError::InvalidState(format!(
                "container {} is not published",
                container.id
            )));
        }
        Ok(EventContainer { status: PublicationStatus::Editing, ..container.clone() })
    }
}

fn shift(instant: DateTime<Utc>, offset: Duration) -> Result<DateTime<Utc>> {
    instant
        .checked_add_signed(offset)
        .ok_or_else(|| SlotwiseError::Range(format!("{instant} cannot be shifted by {offset}")))
}
