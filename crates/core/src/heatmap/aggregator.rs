//! Timeslot aggregator
//!
//! A host is available in a cell `[start, end)` when its distinct unit slots
//! tile the cell exactly: `(end - start) / unit` slots, each starting on a
//! unit boundary measured from the cell start and ending inside the cell.
//! Duplicate rows for the same start count once.
//!
//! Coverage is always measured per `(host, venue)`: a host whose venue A has
//! 09:00 and venue B has 09:30 does not cover the 09:00-10:00 cell. Terms
//! aggregation lists a host once if any of its venues covers the cell.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use slotwise_domain::constants::DEFAULT_UNIT_MINUTES;
use slotwise_domain::{
    Aggregation, AggregationKind, AvailabilityTimeslot, HeatmapTimeslot, HostId, Result,
    SlotwiseError, VenueBucket, VenueId,
};

/// Half-open interval to evaluate coverage for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TargetCell {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TargetCell {
    pub fn new(start: DateTime<Utc>, minutes: u32) -> Self {
        Self { start, end: start + Duration::minutes(i64::from(minutes)) }
    }
}

impl From<&HeatmapTimeslot> for TargetCell {
    fn from(cell: &HeatmapTimeslot) -> Self {
        Self { start: cell.datetime_of_start, end: cell.datetime_of_end() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeslotAggregator {
    unit_minutes: u32,
}

impl Default for TimeslotAggregator {
    fn default() -> Self {
        Self { unit_minutes: DEFAULT_UNIT_MINUTES }
    }
}

impl TimeslotAggregator {
    pub const fn new(unit_minutes: u32) -> Self {
        Self { unit_minutes }
    }

    /// For each cell, the keys whose slot starts cover it completely.
    ///
    /// Keys are returned in ascending order. A cell nobody covers yields an
    /// empty list.
    ///
    /// # Errors
    /// `Range` when a cell's length is not a positive multiple of the unit.
    pub fn aggregate<K: Ord + Clone>(
        &self,
        cells: &[TargetCell],
        starts_by_key: &BTreeMap<K, Vec<DateTime<Utc>>>,
    ) -> Result<Vec<Vec<K>>> {
        let unit = self.unit()?;
        let distinct: Vec<(&K, BTreeSet<DateTime<Utc>>)> = starts_by_key
            .iter()
            .map(|(key, starts)| (key, starts.iter().copied().collect()))
            .collect();

        cells
            .iter()
            .map(|cell| {
                let required = self.required_slots(cell)?;
                Ok(distinct
                    .iter()
                    .filter(|(_, starts)| covered_slots(starts, cell, unit) == required)
                    .map(|(key, _)| (*key).clone())
                    .collect())
            })
            .collect()
    }

    /// Aggregate stored timeslots into one coverage entry per cell.
    pub fn aggregate_slots(
        &self,
        kind: AggregationKind,
        cells: &[TargetCell],
        slots: &[AvailabilityTimeslot],
    ) -> Result<Vec<Aggregation>> {
        match kind {
            AggregationKind::Terms => {
                let mut by_host_venue: BTreeMap<(HostId, Option<VenueId>), Vec<DateTime<Utc>>> =
                    BTreeMap::new();
                for slot in slots {
                    by_host_venue
                        .entry((slot.host_user_id, slot.venue_id))
                        .or_default()
                        .push(slot.datetime_of_start);
                }
                Ok(self
                    .aggregate(cells, &by_host_venue)?
                    .into_iter()
                    .map(|keys| {
                        let mut hosts: Vec<HostId> = keys.into_iter().map(|(host, _)| host).collect();
                        hosts.dedup();
                        Aggregation::Terms(hosts)
                    })
                    .collect())
            }
            AggregationKind::Nested => {
                let mut by_venue_host: BTreeMap<(Option<VenueId>, HostId), Vec<DateTime<Utc>>> =
                    BTreeMap::new();
                for slot in slots {
                    by_venue_host
                        .entry((slot.venue_id, slot.host_user_id))
                        .or_default()
                        .push(slot.datetime_of_start);
                }
                Ok(self
                    .aggregate(cells, &by_venue_host)?
                    .into_iter()
                    .map(|keys| Aggregation::Nested(bucket_by_venue(keys)))
                    .collect())
            }
        }
    }

    /// Fill the coverage of prebuilt heatmap cells in place.
    pub fn fill(
        &self,
        kind: AggregationKind,
        cells: &mut [HeatmapTimeslot],
        slots: &[AvailabilityTimeslot],
    ) -> Result<()> {
        let targets: Vec<TargetCell> = cells.iter().map(TargetCell::from).collect();
        let coverage = self.aggregate_slots(kind, &targets, slots)?;
        for (cell, aggregation) in cells.iter_mut().zip(coverage) {
            cell.coverage = aggregation;
        }
        Ok(())
    }

    /// Empty heatmap grid for a calendar month in `time_zone`.
    ///
    /// Cells run from local midnight on the 1st to local midnight on the 1st
    /// of the next month, so days with a DST change hold one cell more or
    /// less.
    ///
    /// # Errors
    /// `Range` for an invalid month or a cell length that is not a positive
    /// multiple of the unit.
    pub fn month_cells(
        &self,
        year: i32,
        month: u32,
        minutes_of_timeslot: u32,
        time_zone: Tz,
    ) -> Result<Vec<HeatmapTimeslot>> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| SlotwiseError::Range(format!("{year}-{month} is not a valid month")))?;
        let next = first
            .checked_add_months(chrono::Months::new(1))
            .ok_or_else(|| SlotwiseError::Range(format!("{year}-{month} has no following month")))?;

        self.slots_per_cell(i64::from(minutes_of_timeslot))?;
        let cell_length = Duration::minutes(i64::from(minutes_of_timeslot));

        let start = local_midnight(time_zone, first)?;
        let end = local_midnight(time_zone, next)?;

        let mut cells = Vec::new();
        let mut cursor = start;
        while cursor < end {
            let local = cursor.with_timezone(&time_zone);
            cells.push(HeatmapTimeslot {
                year: local.year(),
                month: local.month(),
                day_of_month: local.day(),
                day_of_week: local.weekday(),
                hour: local.hour(),
                minute: local.minute(),
                minutes_of_timeslot,
                datetime_of_start: cursor,
                coverage: Aggregation::empty(AggregationKind::Terms),
            });
            cursor += cell_length;
        }
        Ok(cells)
    }

    fn unit(&self) -> Result<Duration> {
        if self.unit_minutes == 0 {
            return Err(SlotwiseError::InvalidInput("unit must be positive".into()));
        }
        Ok(Duration::minutes(i64::from(self.unit_minutes)))
    }

    fn required_slots(&self, cell: &TargetCell) -> Result<usize> {
        self.slots_per_cell((cell.end - cell.start).num_minutes())
    }

    fn slots_per_cell(&self, minutes: i64) -> Result<usize> {
        let unit = i64::from(self.unit_minutes);
        if unit == 0 || minutes <= 0 || minutes % unit != 0 {
            return Err(SlotwiseError::Range(format!(
                "cell of {minutes} minutes is not a positive multiple of the {unit}-minute unit"
            )));
        }
        Ok(usize::try_from(minutes / unit).unwrap_or(usize::MAX))
    }
}

fn covered_slots(starts: &BTreeSet<DateTime<Utc>>, cell: &TargetCell, unit: Duration) -> usize {
    let unit_secs = unit.num_seconds();
    starts
        .range(cell.start..cell.end)
        .filter(|start| {
            (**start - cell.start).num_seconds() % unit_secs == 0 && **start + unit <= cell.end
        })
        .count()
}

fn bucket_by_venue(keys: Vec<(Option<VenueId>, HostId)>) -> Vec<VenueBucket> {
    let mut buckets: Vec<VenueBucket> = Vec::new();
    for (venue_id, host_id) in keys {
        match buckets.last_mut() {
            Some(bucket) if bucket.venue_id == venue_id => bucket.host_ids.push(host_id),
            _ => buckets.push(VenueBucket { venue_id, host_ids: vec![host_id] }),
        }
    }
    buckets
}

fn local_midnight(time_zone: Tz, date: NaiveDate) -> Result<DateTime<Utc>> {
    let missing =
        || SlotwiseError::InvalidInput(format!("midnight of {date} does not exist in {time_zone}"));
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(missing)?;
    time_zone
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(missing)
}
