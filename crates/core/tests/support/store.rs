//! In-memory `PersistenceStore` mock
//!
//! Every call takes one lock over the whole state, which makes each
//! `replace_*` trivially atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotwise_core::PersistenceStore;
use slotwise_domain::{
    AvailabilityExpression, AvailabilityTimeslot, ContainerId, Event, EventContainer, EventId,
    ExpressionId, HostId, NewEvent, Result as DomainResult, SlotwiseError, VenueId,
};

#[derive(Default)]
struct State {
    expressions: HashMap<ExpressionId, AvailabilityExpression>,
    timeslots: BTreeMap<ExpressionId, Vec<AvailabilityTimeslot>>,
    containers: HashMap<ContainerId, EventContainer>,
    events: BTreeMap<EventId, Event>,
    next_event_id: EventId,
    reject_containers: bool,
}

/// Shared in-memory store; clones see the same data.
#[derive(Default, Clone)]
pub struct MockStore {
    state: Arc<Mutex<State>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expression(self, expression: AvailabilityExpression) -> Self {
        self.state.lock().unwrap().expressions.insert(expression.id, expression);
        self
    }

    pub fn with_container(self, container: EventContainer) -> Self {
        self.state.lock().unwrap().containers.insert(container.id, container);
        self
    }

    /// Seed events, keeping their ids.
    pub fn with_events(self, events: Vec<Event>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for event in events {
                state.next_event_id = state.next_event_id.max(event.id);
                state.events.insert(event.id, event);
            }
        }
        self
    }

    /// Make every later container write fail with `Database`.
    pub fn reject_container_writes(self) -> Self {
        self.state.lock().unwrap().reject_containers = true;
        self
    }

    pub fn with_timeslots(self, slots: Vec<AvailabilityTimeslot>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for slot in slots {
                state.timeslots.entry(slot.expression_id).or_default().push(slot);
            }
        }
        self
    }

    pub fn expression(&self, id: ExpressionId) -> Option<AvailabilityExpression> {
        self.state.lock().unwrap().expressions.get(&id).cloned()
    }

    pub fn timeslots(&self, id: ExpressionId) -> Vec<AvailabilityTimeslot> {
        self.state.lock().unwrap().timeslots.get(&id).cloned().unwrap_or_default()
    }

    pub fn container(&self, id: ContainerId) -> Option<EventContainer> {
        self.state.lock().unwrap().containers.get(&id).cloned()
    }

    /// All events of a container in id order, deleted ones included.
    pub fn events(&self, container_id: ContainerId) -> Vec<Event> {
        self.state
            .lock()
            .unwrap()
            .events
            .values()
            .filter(|e| e.container_id == container_id)
            .cloned()
            .collect()
    }
}

fn not_found(what: &str, id: i64) -> SlotwiseError {
    SlotwiseError::NotFound(format!("{what} {id}"))
}

impl State {
    fn check_container_write(&self, container: &EventContainer) -> DomainResult<()> {
        if self.reject_containers {
            return Err(SlotwiseError::Database(format!("container {} write rejected", container.id)));
        }
        Ok(())
    }

    fn check_events_exist(&self, events: &[Event]) -> DomainResult<()> {
        match events.iter().find(|event| !self.events.contains_key(&event.id)) {
            Some(missing) => Err(not_found("event", missing.id)),
            None => Ok(()),
        }
    }

    fn insert(&mut self, events: Vec<NewEvent>) -> Vec<Event> {
        events
            .into_iter()
            .map(|new| {
                self.next_event_id += 1;
                let event = new.into_event(self.next_event_id);
                self.events.insert(event.id, event.clone());
                event
            })
            .collect()
    }
}

#[async_trait]
impl PersistenceStore for MockStore {
    async fn load_expression(&self, id: ExpressionId) -> DomainResult<AvailabilityExpression> {
        self.expression(id).ok_or_else(|| not_found("expression", id))
    }

    async fn save_expression(&self, expression: &AvailabilityExpression) -> DomainResult<()> {
        self.state.lock().unwrap().expressions.insert(expression.id, expression.clone());
        Ok(())
    }

    async fn replace_timeslots(
        &self,
        expression_id: ExpressionId,
        slots: &[AvailabilityTimeslot],
    ) -> DomainResult<()> {
        self.state.lock().unwrap().timeslots.insert(expression_id, slots.to_vec());
        Ok(())
    }

    async fn load_host_availability(
        &self,
        host_ids: &[HostId],
        venue_id: Option<VenueId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<AvailabilityTimeslot>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .timeslots
            .values()
            .flatten()
            .filter(|slot| host_ids.contains(&slot.host_user_id))
            .filter(|slot| venue_id.is_none() || slot.venue_id == venue_id)
            .filter(|slot| slot.datetime_of_start >= start && slot.datetime_of_start < end)
            .cloned()
            .collect())
    }

    async fn load_container(&self, id: ContainerId) -> DomainResult<EventContainer> {
        self.container(id).ok_or_else(|| not_found("container", id))
    }

    async fn save_container(&self, container: &EventContainer) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        state.check_container_write(container)?;
        state.containers.insert(container.id, container.clone());
        Ok(())
    }

    async fn load_events(&self, container_id: ContainerId) -> DomainResult<Vec<Event>> {
        Ok(self.events(container_id))
    }

    async fn load_events_in_week(&self, container_id: ContainerId, week: u32) -> DomainResult<Vec<Event>> {
        Ok(self
            .events(container_id)
            .into_iter()
            .filter(|e| e.week_of_month == week && !e.is_deleted())
            .collect())
    }

    async fn replace_events_in_week(
        &self,
        container_id: ContainerId,
        week: u32,
        events: Vec<NewEvent>,
    ) -> DomainResult<Vec<Event>> {
        let mut state = self.state.lock().unwrap();
        state
            .events
            .retain(|_, e| !(e.container_id == container_id && e.week_of_month == week));
        Ok(state.insert(events))
    }

    async fn insert_events(&self, _container_id: ContainerId, events: Vec<NewEvent>) -> DomainResult<Vec<Event>> {
        Ok(self.state.lock().unwrap().insert(events))
    }

    async fn save_events(&self, events: &[Event]) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        state.check_events_exist(events)?;
        for event in events {
            state.events.insert(event.id, event.clone());
        }
        Ok(())
    }

    async fn save_container_with_events(&self, container: &EventContainer, events: &[Event]) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        state.check_events_exist(events)?;
        state.check_container_write(container)?;
        for event in events {
            state.events.insert(event.id, event.clone());
        }
        state.containers.insert(container.id, container.clone());
        Ok(())
    }
}
