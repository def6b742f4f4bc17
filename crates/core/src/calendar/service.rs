//! Event calendar service - load, transform, persist

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use slotwise_common::time::Clock;
use slotwise_domain::{
    CollisionPolicy, ContainerId, Event, EventContainer, EventId, PublicationStatus, Result,
    SlotwiseError, WeekRef,
};
use tracing::{info, instrument};

use super::transform::{CopyOutcome, EventCalendarTransform, SkippedEvent};
use crate::ports::PersistenceStore;
use crate::zone::parse_time_zone;

/// Stored result of a week copy across one or more target weeks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReport {
    pub created: Vec<Event>,
    pub skipped: Vec<SkippedEvent>,
}

/// Applies calendar transforms to stored containers
pub struct EventCalendarService {
    store: Arc<dyn PersistenceStore>,
    transform: EventCalendarTransform,
    clock: Arc<dyn Clock>,
}

impl EventCalendarService {
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        transform: EventCalendarTransform,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, transform, clock }
    }

    /// Copy week `from_week` of `source_id` onto each of `to_weeks` of
    /// `target_id`.
    ///
    /// Every target week is validated before anything is written. Weeks are
    /// left untouched only when the source week has no live events. Under
    /// `CollisionPolicy::Overwrite` a target week afterwards holds exactly its
    /// copies, which is empty when every copy was skipped.
    ///
    /// # Errors
    /// `InvalidState`/`Range` from the transform, and `Conflict` when
    /// `CollisionPolicy::Merge` finds an overlap with an existing event.
    #[instrument(skip(self, to_weeks), fields(weeks = ?to_weeks))]
    pub async fn copy_week(
        &self,
        source_id: ContainerId,
        from_week: u32,
        target_id: ContainerId,
        to_weeks: &[u32],
        policy: CollisionPolicy,
    ) -> Result<CopyReport> {
        let source = self.store.load_container(source_id).await?;
        let target = self.store.load_container(target_id).await?;
        let events = self.store.load_events(source_id).await?;
        let from = WeekRef::new(source.year, source.month, from_week);

        let weeks: BTreeSet<u32> = to_weeks.iter().copied().collect();
        let mut plan: Vec<(u32, CopyOutcome)> = Vec::with_capacity(weeks.len());
        for week in weeks {
            let to = WeekRef::new(target.year, target.month, week);
            plan.push((week, self.transform.copy_many(&events, from, to, &target)?));
        }

        if policy == CollisionPolicy::Merge {
            self.ensure_no_overlap(target_id, &plan).await?;
        }

        let mut report = CopyReport::default();
        for (week, outcome) in plan {
            if outcome.is_empty() {
                continue;
            }
            report.skipped.extend(outcome.skipped);
            let stored = match policy {
                CollisionPolicy::Overwrite => {
                    self.store.replace_events_in_week(target_id, week, outcome.created).await?
                }
                CollisionPolicy::Merge if outcome.created.is_empty() => Vec::new(),
                CollisionPolicy::Merge => self.store.insert_events(target_id, outcome.created).await?,
            };
            report.created.extend(stored);
        }

        info!(
            created = report.created.len(),
            skipped = report.skipped.len(),
            "Copied week of events"
        );
        Ok(report)
    }

    async fn ensure_no_overlap(&self, target_id: ContainerId, plan: &[(u32, CopyOutcome)]) -> Result<()> {
        for (week, outcome) in plan {
            let existing = self.store.load_events_in_week(target_id, *week).await?;
            for copy in &outcome.created {
                if let Some(clash) = existing.iter().find(|event| copy.overlaps(event)) {
                    return Err(SlotwiseError::Conflict(format!(
                        "copy starting {} overlaps event {} in week {week}",
                        copy.datetime_of_start, clash.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Shift the given events of an editable container by `minutes`.
    ///
    /// # Errors
    /// `InvalidState` for a published container, `NotFound` for unknown or
    /// deleted ids, `Range` when an event would leave the container's month.
    #[instrument(skip(self, event_ids), fields(events = event_ids.len()))]
    pub async fn bulk_move(
        &self,
        container_id: ContainerId,
        event_ids: &[EventId],
        minutes: i64,
    ) -> Result<Vec<Event>> {
        let container = self.editable_container(container_id).await?;
        let selected = self.live_events(container_id, event_ids).await?;

        let moved = self.transform.bulk_move(&selected, minutes)?;
        for event in &moved {
            let local = event.datetime_of_start.with_timezone(&parse_time_zone(&event.time_zone)?);
            if (local.year(), local.month()) != (container.year, container.month) {
                return Err(SlotwiseError::Range(format!(
                    "event {} would move outside {}-{}",
                    event.id, container.year, container.month
                )));
            }
        }

        self.store.save_events(&moved).await?;
        Ok(moved)
    }

    /// Publish a container and its live events.
    #[instrument(skip(self))]
    pub async fn publish(&self, container_id: ContainerId) -> Result<EventContainer> {
        let container = self.store.load_container(container_id).await?;
        let live: Vec<Event> =
            self.store.load_events(container_id).await?.into_iter().filter(|e| !e.is_deleted()).collect();

        let published = self.transform.publish(&container, live.len())?;
        self.store
            .save_container_with_events(&published, &with_status(live, PublicationStatus::Published))
            .await?;

        info!("Container published");
        Ok(published)
    }

    /// Return a published container and its live events to editing.
    #[instrument(skip(self))]
    pub async fn unpublish(&self, container_id: ContainerId) -> Result<EventContainer> {
        let container = self.store.load_container(container_id).await?;
        let editing = self.transform.unpublish(&container)?;
        let live: Vec<Event> =
            self.store.load_events(container_id).await?.into_iter().filter(|e| !e.is_deleted()).collect();

        self.store
            .save_container_with_events(&editing, &with_status(live, PublicationStatus::Editing))
            .await?;
        Ok(editing)
    }

    /// Soft-delete events of an editable container. Returns how many were
    /// deleted.
    #[instrument(skip(self, event_ids), fields(events = event_ids.len()))]
    pub async fn soft_delete(&self, container_id: ContainerId, event_ids: &[EventId]) -> Result<usize> {
        self.editable_container(container_id).await?;
        let now = self.clock.now_utc();
        let deleted: Vec<Event> = self
            .live_events(container_id, event_ids)
            .await?
            .into_iter()
            .map(|event| Event { deleted_at: Some(now), ..event })
            .collect();

        self.store.save_events(&deleted).await?;
        Ok(deleted.len())
    }

    async fn editable_container(&self, container_id: ContainerId) -> Result<EventContainer> {
        let container = self.store.load_container(container_id).await?;
        if container.status.is_published() {
            return Err(SlotwiseError::InvalidState(format!(
                "container {container_id} is published; unpublish it first"
            )));
        }
        Ok(container)
    }

    /// Events with the given ids, in the order requested.
    async fn live_events(&self, container_id: ContainerId, event_ids: &[EventId]) -> Result<Vec<Event>> {
        let mut by_id: HashMap<EventId, Event> = self
            .store
            .load_events(container_id)
            .await?
            .into_iter()
            .filter(|e| !e.is_deleted())
            .map(|e| (e.id, e))
            .collect();

        let mut selected = Vec::with_capacity(event_ids.len());
        for id in event_ids {
            if selected.iter().any(|e: &Event| e.id == *id) {
                continue;
            }
            let event = by_id
                .remove(id)
                .ok_or_else(|| SlotwiseError::NotFound(format!("event {id} in container {container_id}")))?;
            selected.push(event);
        }
        Ok(selected)
    }
}

fn with_status(events: Vec<Event>, status: PublicationStatus) -> Vec<Event> {
    events.into_iter().map(|event| Event { status, ..event }).collect()
}
