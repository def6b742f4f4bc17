//! Port interfaces implemented by infrastructure adapters

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotwise_domain::{
    AvailabilityExpression, AvailabilityTimeslot, ContainerId, Event, EventContainer,
    ExpressionId, HostId, NewEvent, Result, VenueId,
};

/// Storage for expressions, compiled timeslots, containers and events
///
/// Lookups of a single missing record return `SlotwiseError::NotFound`.
/// Every `replace_*` call and `save_container_with_events` is atomic: either
/// every row it touches is written, or nothing changed.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn load_expression(&self, id: ExpressionId) -> Result<AvailabilityExpression>;

    /// Insert or update by id.
    async fn save_expression(&self, expression: &AvailabilityExpression) -> Result<()>;

    /// Delete every timeslot owned by the expression and insert `slots`.
    async fn replace_timeslots(
        &self,
        expression_id: ExpressionId,
        slots: &[AvailabilityTimeslot],
    ) -> Result<()>;

    /// Timeslots of `host_ids` starting in `[start, end)`, optionally limited
    /// to one venue.
    async fn load_host_availability(
        &self,
        host_ids: &[HostId],
        venue_id: Option<VenueId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AvailabilityTimeslot>>;

    async fn load_container(&self, id: ContainerId) -> Result<EventContainer>;

    /// Insert or update by id.
    async fn save_container(&self, container: &EventContainer) -> Result<()>;

    /// Every event of the container, soft-deleted ones included.
    async fn load_events(&self, container_id: ContainerId) -> Result<Vec<Event>>;

    /// Events of one week that are not soft-deleted.
    async fn load_events_in_week(&self, container_id: ContainerId, week: u32) -> Result<Vec<Event>>;

    /// Delete every event of the week and insert `events`, returning the
    /// stored rows.
    async fn replace_events_in_week(
        &self,
        container_id: ContainerId,
        week: u32,
        events: Vec<NewEvent>,
    ) -> Result<Vec<Event>>;

    async fn insert_events(&self, container_id: ContainerId, events: Vec<NewEvent>) -> Result<Vec<Event>>;

    /// Update existing events by id.
    async fn save_events(&self, events: &[Event]) -> Result<()>;

    /// Update existing events and upsert their container in one atomic write.
    /// An unknown event id is `NotFound` and leaves everything unchanged.
    async fn save_container_with_events(&self, container: &EventContainer, events: &[Event]) -> Result<()>;
}

/// Deferred recompilation of availability expressions
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Schedule `AvailabilityService::recompile` for the expression.
    async fn enqueue(&self, expression_id: ExpressionId) -> Result<()>;
}
