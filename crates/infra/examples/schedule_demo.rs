//! Example: compile availability, fill a heatmap and copy a week
//!
//! Runs the whole scheduling flow against a throwaway SQLite database:
//! an expression is edited, compiled by the background queue, summarised as
//! an hourly heatmap, and a week of events is copied forward.
//!
//! ```bash
//! RUST_LOG=slotwise=debug cargo run -p slotwise-infra --example schedule_demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use slotwise_common::time::{SystemClock, WeekOfMonthGrid};
use slotwise_core::{
    AvailabilityCompiler, AvailabilityService, EventCalendarService, EventCalendarTransform,
    HeatmapService, PersistenceStore, TaskQueue, TimeslotAggregator,
};
use slotwise_domain::{
    AggregationKind, AvailabilityExpression, CollisionPolicy, Config, EventContainer,
    HeatmapRequest, NewEvent, PublicationStatus,
};
use slotwise_infra::{
    init_tracing, CompilationQueue, CompilationQueueConfig, DbManager, SqliteScheduleStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::TempDir::new()?;
    let mut config = Config::default();
    config.database.path = temp_dir.path().join("demo.db").display().to_string();
    config.validate()?;
    init_tracing(&config.logging)?;

    let db = Arc::new(DbManager::from_config(&config.database)?);
    db.run_migrations()?;
    let store: Arc<dyn PersistenceStore> = Arc::new(SqliteScheduleStore::new(db));

    let queue = Arc::new(CompilationQueue::new(CompilationQueueConfig::from(&config.worker)));
    let availability = Arc::new(AvailabilityService::new(
        Arc::clone(&store),
        Arc::clone(&queue) as Arc<dyn TaskQueue>,
        AvailabilityCompiler::new(config.scheduling.unit_minutes),
    ));
    queue.start(Arc::clone(&availability) as _)?;

    let opening = Utc.with_ymd_and_hms(2023, 7, 1, 0, 0, 0).single().ok_or("opening")?;
    let closure = Utc.with_ymd_and_hms(2023, 8, 1, 0, 0, 0).single().ok_or("closure")?;
    let office = AvailabilityExpression::new(1, 42, opening, closure, 30)
        .with_venues([5])
        .with_available("*/30 9-16 * * 1-5")
        .with_unavailable("*/30 12 * * *");
    availability.update_expression(office).await?;

    while store.load_expression(1).await?.status != PublicationStatus::Published {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    queue.stop().await?;
    println!("Queue stats: {:?}", queue.stats());

    let heatmap = HeatmapService::new(Arc::clone(&store), TimeslotAggregator::new(config.scheduling.unit_minutes));
    let cells = heatmap
        .month_heatmap(&HeatmapRequest {
            year: 2023,
            month: 7,
            minutes_of_timeslot: 60,
            time_zone: "UTC".to_string(),
            host_ids: vec![42],
            venue_id: Some(5),
            kind: AggregationKind::Nested,
        })
        .await?;
    let covered = cells.iter().filter(|cell| !cell.coverage.is_empty()).count();
    println!("July 2023: {covered} of {} hourly cells covered", cells.len());

    store.save_container(&EventContainer::new(1, 2023, 7, 5)).await?;
    let start = Utc.with_ymd_and_hms(2023, 7, 3, 10, 0, 0).single().ok_or("event start")?;
    store
        .insert_events(
            1,
            vec![NewEvent {
                container_id: 1,
                host_user_id: 42,
                type_id: 1,
                venue_id: Some(5),
                datetime_of_start: start,
                datetime_of_end: start + chrono::Duration::hours(1),
                week_of_month: 2,
                time_zone: "UTC".to_string(),
                status: PublicationStatus::Editing,
            }],
        )
        .await?;

    let calendar = EventCalendarService::new(
        Arc::clone(&store),
        EventCalendarTransform::new(WeekOfMonthGrid::new(config.scheduling.week_start)),
        Arc::new(SystemClock),
    );
    let report = calendar.copy_week(1, 2, 1, &[3, 4, 5], CollisionPolicy::Overwrite).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let container = calendar.publish(1).await?;
    println!("Container {} is now {}", container.id, container.status);
    Ok(())
}
