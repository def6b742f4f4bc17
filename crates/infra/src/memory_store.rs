//! In-process implementation of the `PersistenceStore` port.
//!
//! Holds everything behind one `parking_lot::RwLock`, so each call observes
//! and applies a consistent snapshot. Suitable for demos, tests and
//! single-process deployments that do not need durability.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use slotwise_core::PersistenceStore;
use slotwise_domain::{
    AvailabilityExpression, AvailabilityTimeslot, ContainerId, Event, EventContainer, EventId,
    ExpressionId, HostId, NewEvent, Result as DomainResult, SlotwiseError, VenueId,
};

#[derive(Default)]
struct Tables {
    expressions: HashMap<ExpressionId, AvailabilityExpression>,
    timeslots: BTreeMap<ExpressionId, Vec<AvailabilityTimeslot>>,
    containers: HashMap<ContainerId, EventContainer>,
    events: BTreeMap<EventId, Event>,
    last_event_id: EventId,
}

impl Tables {
    fn insert_events(&mut self, container_id: ContainerId, events: Vec<NewEvent>) -> Vec<Event> {
        events
            .into_iter()
            .map(|new| {
                self.last_event_id += 1;
                let event = NewEvent { container_id, ..new }.into_event(self.last_event_id);
                self.events.insert(event.id, event.clone());
                event
            })
            .collect()
    }

    /// Overwrite existing events, or change nothing if any id is unknown.
    fn update_events(&mut self, events: &[Event]) -> DomainResult<()> {
        if let Some(missing) = events.iter().find(|e| !self.events.contains_key(&e.id)) {
            return Err(SlotwiseError::NotFound(format!("event {}", missing.id)));
        }
        for event in events {
            self.events.insert(event.id, event.clone());
        }
        Ok(())
    }

    fn events_of(&self, container_id: ContainerId) -> impl Iterator<Item = &Event> {
        self.events.values().filter(move |e| e.container_id == container_id)
    }
}

#[derive(Default)]
pub struct InMemoryScheduleStore {
    tables: RwLock<Tables>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceStore for InMemoryScheduleStore {
    async fn load_expression(&self, id: ExpressionId) -> DomainResult<AvailabilityExpression> {
        self.tables
            .read()
            .expressions
            .get(&id)
            .cloned()
            .ok_or_else(|| SlotwiseError::NotFound(format!("expression {id}")))
    }

    async fn save_expression(&self, expression: &AvailabilityExpression) -> DomainResult<()> {
        self.tables.write().expressions.insert(expression.id, expression.clone());
        Ok(())
    }

    async fn replace_timeslots(
        &self,
        expression_id: ExpressionId,
        slots: &[AvailabilityTimeslot],
    ) -> DomainResult<()> {
        let mut tables = self.tables.write();
        if slots.is_empty() {
            tables.timeslots.remove(&expression_id);
        } else {
            tables.timeslots.insert(expression_id, slots.to_vec());
        }
        Ok(())
    }

    async fn load_host_availability(
        &self,
        host_ids: &[HostId],
        venue_id: Option<VenueId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<AvailabilityTimeslot>> {
        let tables = self.tables.read();
        let mut slots: Vec<AvailabilityTimeslot> = tables
            .timeslots
            .values()
            .flatten()
            .filter(|slot| host_ids.contains(&slot.host_user_id))
            .filter(|slot| venue_id.is_none() || slot.venue_id == venue_id)
            .filter(|slot| slot.datetime_of_start >= start && slot.datetime_of_start < end)
            .cloned()
            .collect();
        slots.sort_by_key(|slot| (slot.datetime_of_start, slot.host_user_id, slot.venue_id));
        Ok(slots)
    }

    async fn load_container(&self, id: ContainerId) -> DomainResult<EventContainer> {
        self.tables
            .read()
            .containers
            .get(&id)
            .cloned()
            .ok_or_else(|| SlotwiseError::NotFound(format!("container {id}")))
    }

    async fn save_container(&self, container: &EventContainer) -> DomainResult<()> {
        self.tables.write().containers.insert(container.id, container.clone());
        Ok(())
    }

    async fn load_events(&self, container_id: ContainerId) -> DomainResult<Vec<Event>> {
        Ok(self.tables.read().events_of(container_id).cloned().collect())
    }

    async fn load_events_in_week(&self, container_id: ContainerId, week: u32) -> DomainResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .tables
            .read()
            .events_of(container_id)
            .filter(|e| e.week_of_month == week && !e.is_deleted())
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.datetime_of_start, e.id));
        Ok(events)
    }

    async fn replace_events_in_week(
        &self,
        container_id: ContainerId,
        week: u32,
        events: Vec<NewEvent>,
    ) -> DomainResult<Vec<Event>> {
        let mut tables = self.tables.write();
        if !tables.containers.contains_key(&container_id) {
            return Err(SlotwiseError::NotFound(format!("container {container_id}")));
        }
        tables.events.retain(|_, e| !(e.container_id == container_id && e.week_of_month == week));
        Ok(tables.insert_events(container_id, events))
    }

    async fn insert_events(&self, container_id: ContainerId, events: Vec<NewEvent>) -> DomainResult<Vec<Event>> {
        let mut tables = self.tables.write();
        if !tables.containers.contains_key(&container_id) {
            return Err(SlotwiseError::NotFound(format!("container {container_id}")));
        }
        Ok(tables.insert_events(container_id, events))
    }

    async fn save_events(&self, events: &[Event]) -> DomainResult<()> {
        self.tables.write().update_events(events)
    }

    async fn save_container_with_events(&self, container: &EventContainer, events: &[Event]) -> DomainResult<()> {
        let mut tables = self.tables.write();
        tables.update_events(events)?;
        tables.containers.insert(container.id, container.clone());
        Ok(())
    }
}
