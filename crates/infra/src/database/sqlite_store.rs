//! SQLite-backed implementation of the `PersistenceStore` port.
//!
//! Every call runs on the blocking pool with its own pooled connection.
//! Replace operations run inside one transaction, so a failure part-way
//! leaves the previous rows in place. Instants are unix seconds and range
//! predicates are half-open `[start, end)`.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use slotwise_core::PersistenceStore;
use slotwise_domain::{
    AvailabilityExpression, AvailabilityTimeslot, ContainerId, Event, EventContainer,
    ExpressionId, HostId, NewEvent, PublicationStatus, Result as DomainResult, SlotwiseError,
    VenueId,
};
use tokio::task;
use tracing::{debug, instrument};

use super::manager::{map_sql_error, DbManager};
use crate::errors::InfraError;

/// Schedule store persisting to SQLite through [`DbManager`].
pub struct SqliteScheduleStore {
    db: Arc<DbManager>,
}

impl SqliteScheduleStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Run `op` with a pooled connection on the blocking pool.
    async fn with_connection<T, F>(&self, op: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> DomainResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            op(&mut conn)
        })
        .await
        .map_err(|err| SlotwiseError::Internal(format!("database task failed: {err}")))?
    }
}

#[async_trait]
impl PersistenceStore for SqliteScheduleStore {
    async fn load_expression(&self, id: ExpressionId) -> DomainResult<AvailabilityExpression> {
        self.with_connection(move |conn| {
            conn.query_row(EXPRESSION_SELECT, params![id], read_expression_row)
                .optional()
                .map_err(map_sql_error)?
                .ok_or_else(|| SlotwiseError::NotFound(format!("expression {id}")))?
                .try_into()
        })
        .await
    }

    async fn save_expression(&self, expression: &AvailabilityExpression) -> DomainResult<()> {
        let expression = expression.clone();
        self.with_connection(move |conn| {
            let venue_ids = to_json(&expression.venue_ids)?;
            let available = to_json(&expression.available_crons)?;
            let unavailable = to_json(&expression.unavailable_crons)?;
            conn.execute(
                EXPRESSION_UPSERT,
                params![
                    expression.id,
                    expression.host_user_id,
                    venue_ids,
                    available,
                    unavailable,
                    expression.date_of_opening.timestamp(),
                    expression.date_of_closure.timestamp(),
                    expression.minutes_of_duration,
                    expression.time_zone,
                    expression.status.to_string(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, slots), fields(slots = slots.len()))]
    async fn replace_timeslots(
        &self,
        expression_id: ExpressionId,
        slots: &[AvailabilityTimeslot],
    ) -> DomainResult<()> {
        let slots = slots.to_vec();
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            tx.execute("DELETE FROM availability_timeslots WHERE expression_id = ?1", params![expression_id])
                .map_err(map_sql_error)?;
            {
                let mut insert = tx.prepare(TIMESLOT_INSERT).map_err(map_sql_error)?;
                for slot in &slots {
                    insert
                        .execute(params![
                            expression_id,
                            slot.host_user_id,
                            slot.venue_id,
                            slot.datetime_of_start.timestamp(),
                            slot.datetime_of_end.timestamp(),
                        ])
                        .map_err(map_sql_error)?;
                }
            }
            tx.commit().map_err(map_sql_error)
        })
        .await
    }

    async fn load_host_availability(
        &self,
        host_ids: &[HostId],
        venue_id: Option<VenueId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<AvailabilityTimeslot>> {
        let hosts: BTreeSet<HostId> = host_ids.iter().copied().collect();
        if hosts.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; hosts.len()].join(", ");
        let sql = format!(
            "SELECT expression_id, host_user_id, venue_id, datetime_of_start, datetime_of_end
             FROM availability_timeslots
             WHERE host_user_id IN ({placeholders})
               AND datetime_of_start >= ? AND datetime_of_start < ?
               AND (? IS NULL OR venue_id = ?)
             ORDER BY datetime_of_start, host_user_id, venue_id"
        );
        let venue = venue_id.map_or(Value::Null, Value::Integer);
        let mut values: Vec<Value> = hosts.into_iter().map(Value::Integer).collect();
        values.extend([Value::Integer(start.timestamp()), Value::Integer(end.timestamp()), venue.clone(), venue]);

        let slots: Vec<AvailabilityTimeslot> = self
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
                let rows = stmt
                    .query_map(params_from_iter(values.iter()), read_timeslot_row)
                    .map_err(map_sql_error)?;
                let slots = rows.map(|row| row.map_err(map_sql_error).and_then(TimeslotRow::into_domain)).collect();
                slots
            })
            .await?;
        debug!(slots = slots.len(), "Loaded host availability");
        Ok(slots)
    }

    async fn load_container(&self, id: ContainerId) -> DomainResult<EventContainer> {
        self.with_connection(move |conn| {
            conn.query_row(CONTAINER_SELECT, params![id], |row| {
                Ok((
                    row.get::<_, ContainerId>(0)?,
                    row.get::<_, i32>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, VenueId>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .optional()
            .map_err(map_sql_error)?
            .ok_or_else(|| SlotwiseError::NotFound(format!("container {id}")))
            .and_then(|(id, year, month, venue_id, status)| {
                Ok(EventContainer { id, year, month, venue_id, status: parse_status(&status)? })
            })
        })
        .await
    }

    async fn save_container(&self, container: &EventContainer) -> DomainResult<()> {
        let container = container.clone();
        self.with_connection(move |conn| upsert_container(conn, &container)).await
    }

    async fn load_events(&self, container_id: ContainerId) -> DomainResult<Vec<Event>> {
        self.with_connection(move |conn| {
            query_events(conn, &format!("{EVENT_SELECT} WHERE container_id = ?1 ORDER BY id"), params![container_id])
        })
        .await
    }

    async fn load_events_in_week(&self, container_id: ContainerId, week: u32) -> DomainResult<Vec<Event>> {
        self.with_connection(move |conn| {
            query_events(
                conn,
                &format!(
                    "{EVENT_SELECT} WHERE container_id = ?1 AND week_of_month = ?2 AND deleted_at IS NULL
                     ORDER BY datetime_of_start, id"
                ),
                params![container_id, week],
            )
        })
        .await
    }

    #[instrument(skip(self, events), fields(events = events.len()))]
    async fn replace_events_in_week(
        &self,
        container_id: ContainerId,
        week: u32,
        events: Vec<NewEvent>,
    ) -> DomainResult<Vec<Event>> {
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            let removed = tx
                .execute(
                    "DELETE FROM events WHERE container_id = ?1 AND week_of_month = ?2",
                    params![container_id, week],
                )
                .map_err(map_sql_error)?;
            let stored = insert_all(&tx, container_id, events)?;
            tx.commit().map_err(map_sql_error)?;
            debug!(removed, inserted = stored.len(), "Replaced events in week");
            Ok(stored)
        })
        .await
    }

    async fn insert_events(&self, container_id: ContainerId, events: Vec<NewEvent>) -> DomainResult<Vec<Event>> {
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            let stored = insert_all(&tx, container_id, events)?;
            tx.commit().map_err(map_sql_error)?;
            Ok(stored)
        })
        .await
    }

    async fn save_events(&self, events: &[Event]) -> DomainResult<()> {
        let events = events.to_vec();
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            update_all(&tx, &events)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
    }

    #[instrument(skip(self, container, events), fields(container = container.id, events = events.len()))]
    async fn save_container_with_events(&self, container: &EventContainer, events: &[Event]) -> DomainResult<()> {
        let container = container.clone();
        let events = events.to_vec();
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            update_all(&tx, &events)?;
            upsert_container(&tx, &container)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
    }
}

const EXPRESSION_SELECT: &str = "SELECT id, host_user_id, venue_ids, available_crons, unavailable_crons,
        date_of_opening, date_of_closure, minutes_of_duration, time_zone, status
    FROM availability_expressions WHERE id = ?1";

const EXPRESSION_UPSERT: &str = "INSERT INTO availability_expressions (
        id, host_user_id, venue_ids, available_crons, unavailable_crons,
        date_of_opening, date_of_closure, minutes_of_duration, time_zone, status
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(id) DO UPDATE SET
        host_user_id = excluded.host_user_id,
        venue_ids = excluded.venue_ids,
        available_crons = excluded.available_crons,
        unavailable_crons = excluded.unavailable_crons,
        date_of_opening = excluded.date_of_opening,
        date_of_closure = excluded.date_of_closure,
        minutes_of_duration = excluded.minutes_of_duration,
        time_zone = excluded.time_zone,
        status = excluded.status";

const TIMESLOT_INSERT: &str = "INSERT INTO availability_timeslots (
        expression_id, host_user_id, venue_id, datetime_of_start, datetime_of_end
    ) VALUES (?1, ?2, ?3, ?4, ?5)";

const CONTAINER_SELECT: &str =
    "SELECT id, year, month, venue_id, status FROM event_containers WHERE id = ?1";

const CONTAINER_UPSERT: &str = "INSERT INTO event_containers (id, year, month, venue_id, status)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(id) DO UPDATE SET
        year = excluded.year,
        month = excluded.month,
        venue_id = excluded.venue_id,
        status = excluded.status";

const EVENT_SELECT: &str = "SELECT id, container_id, host_user_id, type_id, venue_id,
        datetime_of_start, datetime_of_end, week_of_month, time_zone, status, deleted_at
    FROM events";

const EVENT_INSERT: &str = "INSERT INTO events (
        container_id, host_user_id, type_id, venue_id, datetime_of_start, datetime_of_end,
        week_of_month, time_zone, status
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const EVENT_UPDATE: &str = "UPDATE events SET
        host_user_id = ?2, type_id = ?3, venue_id = ?4, datetime_of_start = ?5,
        datetime_of_end = ?6, week_of_month = ?7, time_zone = ?8, status = ?9, deleted_at = ?10
    WHERE id = ?1";

struct ExpressionRow {
    id: ExpressionId,
    host_user_id: HostId,
    venue_ids: String,
    available_crons: String,
    unavailable_crons: String,
    date_of_opening: i64,
    date_of_closure: i64,
    minutes_of_duration: u32,
    time_zone: String,
    status: String,
}

fn read_expression_row(row: &Row<'_>) -> rusqlite::Result<ExpressionRow> {
    Ok(ExpressionRow {
        id: row.get(0)?,
        host_user_id: row.get(1)?,
        venue_ids: row.get(2)?,
        available_crons: row.get(3)?,
        unavailable_crons: row.get(4)?,
        date_of_opening: row.get(5)?,
        date_of_closure: row.get(6)?,
        minutes_of_duration: row.get(7)?,
        time_zone: row.get(8)?,
        status: row.get(9)?,
    })
}

impl TryFrom<ExpressionRow> for AvailabilityExpression {
    type Error = SlotwiseError;

    fn try_from(row: ExpressionRow) -> DomainResult<Self> {
        Ok(Self {
            id: row.id,
            host_user_id: row.host_user_id,
            venue_ids: from_json(&row.venue_ids)?,
            available_crons: from_json(&row.available_crons)?,
            unavailable_crons: from_json(&row.unavailable_crons)?,
            date_of_opening: from_timestamp(row.date_of_opening)?,
            date_of_closure: from_timestamp(row.date_of_closure)?,
            minutes_of_duration: row.minutes_of_duration,
            time_zone: row.time_zone,
            status: parse_status(&row.status)?,
        })
    }
}

struct TimeslotRow {
    expression_id: ExpressionId,
    host_user_id: HostId,
    venue_id: Option<VenueId>,
    start: i64,
    end: i64,
}

fn read_timeslot_row(row: &Row<'_>) -> rusqlite::Result<TimeslotRow> {
    Ok(TimeslotRow {
        expression_id: row.get(0)?,
        host_user_id: row.get(1)?,
        venue_id: row.get(2)?,
        start: row.get(3)?,
        end: row.get(4)?,
    })
}

impl TimeslotRow {
    fn into_domain(self) -> DomainResult<AvailabilityTimeslot> {
        Ok(AvailabilityTimeslot {
            expression_id: self.expression_id,
            host_user_id: self.host_user_id,
            venue_id: self.venue_id,
            datetime_of_start: from_timestamp(self.start)?,
            datetime_of_end: from_timestamp(self.end)?,
        })
    }
}

struct EventRow {
    id: i64,
    container_id: ContainerId,
    host_user_id: HostId,
    type_id: i64,
    venue_id: Option<VenueId>,
    start: i64,
    end: i64,
    week_of_month: u32,
    time_zone: String,
    status: String,
    deleted_at: Option<i64>,
}

fn read_event_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        container_id: row.get(1)?,
        host_user_id: row.get(2)?,
        type_id: row.get(3)?,
        venue_id: row.get(4)?,
        start: row.get(5)?,
        end: row.get(6)?,
        week_of_month: row.get(7)?,
        time_zone: row.get(8)?,
        status: row.get(9)?,
        deleted_at: row.get(10)?,
    })
}

impl EventRow {
    fn into_domain(self) -> DomainResult<Event> {
        Ok(Event {
            id: self.id,
            container_id: self.container_id,
            host_user_id: self.host_user_id,
            type_id: self.type_id,
            venue_id: self.venue_id,
            datetime_of_start: from_timestamp(self.start)?,
            datetime_of_end: from_timestamp(self.end)?,
            week_of_month: self.week_of_month,
            time_zone: self.time_zone,
            status: parse_status(&self.status)?,
            deleted_at: self.deleted_at.map(from_timestamp).transpose()?,
        })
    }
}

fn query_events(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> DomainResult<Vec<Event>> {
    let mut stmt = conn.prepare(sql).map_err(map_sql_error)?;
    let rows = stmt.query_map(params, read_event_row).map_err(map_sql_error)?;
    let events = rows.map(|row| row.map_err(map_sql_error).and_then(EventRow::into_domain)).collect();
    events
}

fn insert_all(tx: &Transaction<'_>, container_id: ContainerId, events: Vec<NewEvent>) -> DomainResult<Vec<Event>> {
    let mut insert = tx.prepare(EVENT_INSERT).map_err(map_sql_error)?;
    let stored = events
        .into_iter()
        .map(|new| {
            insert
                .execute(params![
                    container_id,
                    new.host_user_id,
                    new.type_id,
                    new.venue_id,
                    new.datetime_of_start.timestamp(),
                    new.datetime_of_end.timestamp(),
                    new.week_of_month,
                    new.time_zone,
                    new.status.to_string(),
                ])
                .map_err(map_sql_error)?;
            let id = tx.last_insert_rowid();
            Ok(NewEvent { container_id, ..new }.into_event(id))
        })
        .collect();
    stored
}

fn upsert_container(conn: &Connection, container: &EventContainer) -> DomainResult<()> {
    conn.execute(
        CONTAINER_UPSERT,
        params![container.id, container.year, container.month, container.venue_id, container.status.to_string()],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

/// Update each event by id; an id with no row is `NotFound`.
fn update_all(tx: &Transaction<'_>, events: &[Event]) -> DomainResult<()> {
    let mut update = tx.prepare(EVENT_UPDATE).map_err(map_sql_error)?;
    for event in events {
        let changed = update
            .execute(params![
                event.id,
                event.host_user_id,
                event.type_id,
                event.venue_id,
                event.datetime_of_start.timestamp(),
                event.datetime_of_end.timestamp(),
                event.week_of_month,
                event.time_zone,
                event.status.to_string(),
                event.deleted_at.map(|at| at.timestamp()),
            ])
            .map_err(map_sql_error)?;
        if changed == 0 {
            return Err(SlotwiseError::NotFound(format!("event {}", event.id)));
        }
    }
    Ok(())
}

fn from_timestamp(secs: i64) -> DomainResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| SlotwiseError::Database(format!("timestamp {secs} is out of range")))
}

fn parse_status(raw: &str) -> DomainResult<PublicationStatus> {
    raw.parse().map_err(SlotwiseError::Database)
}

fn to_json<T: serde::Serialize>(value: &T) -> DomainResult<String> {
    serde_json::to_string(value).map_err(|err| InfraError::from(err).into())
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> DomainResult<T> {
    serde_json::from_str(raw).map_err(|err| InfraError::from(err).into())
}
