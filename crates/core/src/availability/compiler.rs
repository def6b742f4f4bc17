//! Availability compiler
//!
//! Expands an [`AvailabilityExpression`] into the full, ordered list of unit
//! timeslots it describes:
//!
//! 1. every start matched by an available pattern opens
//!    `minutes_of_duration / unit` consecutive unit slots,
//! 2. every instant matched by an unavailable pattern removes the slot that
//!    starts there,
//! 3. the remaining starts are emitted once per venue, ordered by
//!    `(start, venue)`.
//!
//! Slots never start at or after `date_of_closure`. Compilation is
//! deterministic and all-or-nothing: any invalid pattern aborts with no
//! output.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use slotwise_common::time::CronExpression;
use slotwise_domain::constants::DEFAULT_UNIT_MINUTES;
use slotwise_domain::{AvailabilityExpression, AvailabilityTimeslot, Result, SlotwiseError};
use tracing::debug;

use crate::errors::IntoDomainError;
use crate::zone::parse_time_zone;

/// Compiles availability expressions at a fixed unit granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityCompiler {
    unit_minutes: u32,
}

impl Default for AvailabilityCompiler {
    fn default() -> Self {
        Self { unit_minutes: DEFAULT_UNIT_MINUTES }
    }
}

impl AvailabilityCompiler {
    pub const fn new(unit_minutes: u32) -> Self {
        Self { unit_minutes }
    }

    pub const fn unit_minutes(&self) -> u32 {
        self.unit_minutes
    }

    /// Compile `expression` into its timeslots.
    ///
    /// # Errors
    /// - `Range` when opening is not before closure, or the duration is not a
    ///   positive multiple of the unit
    /// - `InvalidInput` for an unknown time zone or a zero unit
    /// - `Parse` for the first malformed cron pattern
    pub fn compile(&self, expression: &AvailabilityExpression) -> Result<Vec<AvailabilityTimeslot>> {
        let plan = self.plan(expression)?;

        let candidates = plan.candidate_starts();
        let excluded = plan.excluded_starts();
        let venues: Vec<Option<i64>> = if expression.venue_ids.is_empty() {
            vec![None]
        } else {
            expression.venue_ids.iter().copied().map(Some).collect()
        };

        let unit = plan.unit;
        let slots: Vec<AvailabilityTimeslot> = candidates
            .difference(&excluded)
            .flat_map(|start| {
                venues.iter().map(move |venue_id| AvailabilityTimeslot {
                    expression_id: expression.id,
                    host_user_id: expression.host_user_id,
                    venue_id: *venue_id,
                    datetime_of_start: *start,
                    datetime_of_end: *start + unit,
                })
            })
            .collect();

        debug!(
            expression_id = expression.id,
            candidates = candidates.len(),
            excluded = excluded.len(),
            slots = slots.len(),
            "Compiled availability expression"
        );

        Ok(slots)
    }

    /// Validate the expression and parse every pattern up front.
    fn plan(&self, expression: &AvailabilityExpression) -> Result<CompilePlan> {
        if self.unit_minutes == 0 {
            return Err(SlotwiseError::InvalidInput("unit must be positive".into()));
        }
        if expression.date_of_opening >= expression.date_of_closure {
            return Err(SlotwiseError::Range(format!(
                "opening {} is not before closure {}",
                expression.date_of_opening, expression.date_of_closure
            )));
        }
        let duration = expression.minutes_of_duration;
        if duration == 0 || duration % self.unit_minutes != 0 {
            return Err(SlotwiseError::Range(format!(
                "duration of {duration} minutes is not a positive multiple of the {}-minute unit",
                self.unit_minutes
            )));
        }

        let time_zone = parse_time_zone(&expression.time_zone)?;
        let available = parse_all(&expression.available_crons)?;
        let unavailable = parse_all(&expression.unavailable_crons)?;

        Ok(CompilePlan {
            opening: expression.date_of_opening,
            closure: expression.date_of_closure,
            unit_minutes: self.unit_minutes,
            unit: Duration::minutes(i64::from(self.unit_minutes)),
            sub_slots: duration / self.unit_minutes,
            time_zone,
            available,
            unavailable,
        })
    }
}

fn parse_all(patterns: &[String]) -> Result<Vec<CronExpression>> {
    patterns
        .iter()
        .map(|pattern| CronExpression::parse(pattern).map_err(IntoDomainError::into_domain))
        .collect()
}

struct CompilePlan {
    opening: DateTime<Utc>,
    closure: DateTime<Utc>,
    unit_minutes: u32,
    unit: Duration,
    sub_slots: u32,
    time_zone: Tz,
    available: Vec<CronExpression>,
    unavailable: Vec<CronExpression>,
}

impl CompilePlan {
    fn occurrences<'a>(&'a self, cron: &'a CronExpression) -> impl Iterator<Item = DateTime<Utc>> + 'a {
        cron.occurrences_in(self.time_zone, self.opening, self.closure, self.unit_minutes)
    }

    fn candidate_starts(&self) -> BTreeSet<DateTime<Utc>> {
        let mut starts = BTreeSet::new();
        for cron in &self.available {
            for start in self.occurrences(cron) {
                let mut slot = start;
                for _ in 0..self.sub_slots {
                    if slot >= self.closure {
                        break;
                    }
                    starts.insert(slot);
                    slot += self.unit;
                }
            }
        }
        starts
    }

    fn excluded_starts(&self) -> BTreeSet<DateTime<Utc>> {
        self.unavailable.iter().flat_map(|cron| self.occurrences(cron)).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone, Timelike, Weekday};
    use slotwise_domain::PublicationStatus;

    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn office_hours() -> AvailabilityExpression {
        AvailabilityExpression::new(1, 42, utc(2023, 7, 1, 0, 0), utc(2023, 10, 1, 0, 0), 30)
            .with_available("0,30 11-14 * 7-9 1,3,5")
    }

    /// Validates the office-hours scenario over a quarter.
    ///
    /// Assertions:
    /// - Confirms every slot is Mon/Wed/Fri, hours 11-14, on :00 or :30.
    /// - Confirms each slot lasts exactly one unit and has no venue.
    #[test]
    fn test_compile_office_hours() {
        let slots = AvailabilityCompiler::new(30).compile(&office_hours()).unwrap();

        assert_eq!(slots.len(), 39 * 8);
        for slot in &slots {
            let start = slot.datetime_of_start;
            assert!(matches!(start.weekday(), Weekday::Mon | Weekday::Wed | Weekday::Fri));
            assert!((11..=14).contains(&start.hour()));
            assert!(start.minute() % 30 == 0);
            assert_eq!(slot.datetime_of_end - start, Duration::minutes(30));
            assert_eq!(slot.venue_id, None);
            assert_eq!(slot.host_user_id, 42);
        }
    }

    /// Validates unavailable patterns remove matching starts.
    ///
    /// Assertions:
    /// - Confirms no slot remains on the 20th of any month.
    /// - Confirms only the 20th's slots were removed.
    #[test]
    fn test_unavailable_removes_twentieth() {
        let compiler = AvailabilityCompiler::new(30);
        let all = compiler.compile(&office_hours()).unwrap();
        let blocked = compiler
            .compile(&office_hours().with_unavailable("0,30 11-14 20 7-9 *"))
            .unwrap();

        assert!(blocked.iter().all(|slot| slot.datetime_of_start.day() != 20));
        // Only September 20 (a Wednesday) had slots; July 20 and August 20 did not
        let removed = all.len() - blocked.len();
        assert_eq!(removed, 8);
    }

    /// Validates duration expansion and clipping at closure.
    ///
    /// Assertions:
    /// - Confirms a 90-minute duration opens three unit slots.
    /// - Confirms slots at or after closure are dropped.
    #[test]
    fn test_duration_expansion_clipped_at_closure() {
        let expr = AvailabilityExpression::new(2, 7, utc(2024, 1, 1, 0, 0), utc(2024, 1, 1, 10, 0), 90)
            .with_available("0 9 * * *");
        let slots = AvailabilityCompiler::new(30).compile(&expr).unwrap();
        let starts: Vec<_> = slots.iter().map(|s| s.datetime_of_start).collect();
        assert_eq!(starts, vec![utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 9, 30)]);
    }

    /// Validates overlapping patterns do not duplicate slots and venues fan
    /// out in order.
    ///
    /// Assertions:
    /// - Confirms rows are ordered by start then venue.
    /// - Confirms overlapping expansions produce each start once per venue.
    #[test]
    fn test_dedup_and_venue_fan_out() {
        let expr = AvailabilityExpression::new(3, 7, utc(2024, 1, 1, 0, 0), utc(2024, 1, 2, 0, 0), 60)
            .with_available("0 9 * * *")
            .with_available("30 9 * * *")
            .with_venues([20, 10]);
        let slots = AvailabilityCompiler::new(30).compile(&expr).unwrap();

        let rows: Vec<_> =
            slots.iter().map(|s| (s.datetime_of_start.hour(), s.datetime_of_start.minute(), s.venue_id)).collect();
        assert_eq!(
            rows,
            vec![
                (9, 0, Some(10)),
                (9, 0, Some(20)),
                (9, 30, Some(10)),
                (9, 30, Some(20)),
                (10, 0, Some(10)),
                (10, 0, Some(20)),
            ]
        );
    }

    /// Validates compiling twice yields identical output.
    ///
    /// Assertions:
    /// - Confirms the two results are equal.
    #[test]
    fn test_compile_is_deterministic() {
        let compiler = AvailabilityCompiler::default();
        let expr = office_hours().with_venues([1, 2]);
        assert_eq!(compiler.compile(&expr).unwrap(), compiler.compile(&expr).unwrap());
    }

    /// Validates the time zone is applied to cron fields.
    ///
    /// Assertions:
    /// - Confirms 09:00 Asia/Tokyo compiles to 00:00 UTC.
    #[test]
    fn test_time_zone_applied() {
        let expr = AvailabilityExpression::new(4, 7, utc(2024, 1, 1, 0, 0), utc(2024, 1, 2, 0, 0), 30)
            .with_available("0 9 * * *")
            .with_time_zone("Asia/Tokyo");
        let slots = AvailabilityCompiler::new(30).compile(&expr).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].datetime_of_start, utc(2024, 1, 1, 0, 0));
    }

    /// Validates compilation in zones whose offset is not a whole unit.
    ///
    /// Assertions:
    /// - Confirms 09:00 Asia/Kathmandu (+05:45) yields one slot per day at a
    ///   30 minute unit, starting 03:15 UTC.
    /// - Confirms 09:00 Asia/Kolkata (+05:30) yields one slot per day at a
    ///   60 minute unit, starting 03:30 UTC.
    #[test]
    fn test_fractional_offset_zones() {
        let week = |tz: &str, minutes: u32| {
            AvailabilityExpression::new(5, 7, utc(2024, 1, 1, 0, 0), utc(2024, 1, 8, 0, 0), minutes)
                .with_available("0 9 * * *")
                .with_time_zone(tz)
        };

        let kathmandu = AvailabilityCompiler::new(30).compile(&week("Asia/Kathmandu", 30)).unwrap();
        assert_eq!(kathmandu.len(), 7);
        assert_eq!(kathmandu[0].datetime_of_start, utc(2024, 1, 1, 3, 15));
        assert_eq!(kathmandu[0].datetime_of_end, utc(2024, 1, 1, 3, 45));
        assert!(kathmandu.iter().all(|s| (s.datetime_of_start.hour(), s.datetime_of_start.minute()) == (3, 15)));

        let kolkata = AvailabilityCompiler::new(60).compile(&week("Asia/Kolkata", 60)).unwrap();
        assert_eq!(kolkata.len(), 7);
        assert!(kolkata.iter().all(|s| (s.datetime_of_start.hour(), s.datetime_of_start.minute()) == (3, 30)));
    }

    /// Validates rejection paths.
    ///
    /// Assertions:
    /// - Confirms inverted windows and bad durations are `Range` errors.
    /// - Confirms a malformed unavailable pattern is a `Parse` error.
    /// - Confirms an unknown zone is `InvalidInput`.
    #[test]
    fn test_validation_errors() {
        let compiler = AvailabilityCompiler::new(30);
        let base = office_hours();

        let mut inverted = base.clone();
        inverted.date_of_closure = inverted.date_of_opening;
        assert!(matches!(compiler.compile(&inverted), Err(SlotwiseError::Range(_))));

        let mut odd = base.clone();
        odd.minutes_of_duration = 45;
        assert!(matches!(compiler.compile(&odd), Err(SlotwiseError::Range(_))));

        let broken = base.clone().with_unavailable("0 25 * * *");
        assert_eq!(
            compiler.compile(&broken),
            Err(SlotwiseError::Parse { field: "hour".into(), token: "25".into() })
        );

        let zoned = base.with_time_zone("Nowhere/Special");
        assert!(matches!(compiler.compile(&zoned), Err(SlotwiseError::InvalidInput(_))));
        assert_eq!(office_hours().status, PublicationStatus::Editing);
    }
}
