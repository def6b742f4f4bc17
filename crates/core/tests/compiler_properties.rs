//! Property tests for `AvailabilityCompiler` over generated weekly patterns.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use proptest::prelude::*;
use slotwise_common::testing::{assert_sorted, assert_strictly_sorted};
use slotwise_core::AvailabilityCompiler;
use slotwise_domain::AvailabilityExpression;

fn opening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 7, 3, 0, 0, 0).unwrap()
}

fn closure() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 7, 10, 0, 0, 0).unwrap()
}

fn list(values: &BTreeSet<u32>) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

fn expression(
    hours: &BTreeSet<u32>,
    weekdays: &BTreeSet<u32>,
    units: u32,
    venues: &BTreeSet<i64>,
) -> AvailabilityExpression {
    AvailabilityExpression::new(1, 42, opening(), closure(), units * 30)
        .with_venues(venues.iter().copied())
        .with_available(format!("0 {} * * {}", list(hours), list(weekdays)))
}

proptest! {
    /// Every slot is one aligned unit inside the window, in `(start, venue)`
    /// order, and none starts inside the blocked hour.
    #[test]
    fn test_compiled_slots_respect_window_and_exclusions(
        hours in proptest::collection::btree_set(0u32..24, 1..4),
        weekdays in proptest::collection::btree_set(0u32..7, 1..3),
        units in 1u32..4,
        venues in proptest::collection::btree_set(1i64..5, 0..3),
        blocked in 0u32..24,
    ) {
        let compiler = AvailabilityCompiler::new(30);
        let open = expression(&hours, &weekdays, units, &venues);
        let restricted = open.clone().with_unavailable(format!("*/30 {blocked} * * *"));

        let all = compiler.compile(&open).unwrap();
        let kept = compiler.compile(&restricted).unwrap();

        for slot in &kept {
            prop_assert!(slot.datetime_of_start >= opening());
            prop_assert!(slot.datetime_of_start < closure());
            prop_assert_eq!(slot.datetime_of_end - slot.datetime_of_start, Duration::minutes(30));
            prop_assert_eq!(slot.datetime_of_start.timestamp() % 1800, 0);
            prop_assert_ne!(slot.datetime_of_start.hour(), blocked);
        }

        let starts: Vec<_> = kept.iter().map(|s| s.datetime_of_start).collect();
        assert_sorted(&starts);
        let keys: Vec<_> = kept.iter().map(|s| (s.datetime_of_start, s.venue_id)).collect();
        assert_strictly_sorted(&keys);

        let everything: HashSet<_> = all.iter().collect();
        prop_assert!(kept.iter().all(|slot| everything.contains(slot)));

        let per_venue = venues.len().max(1);
        prop_assert_eq!(all.len() % per_venue, 0);
    }
}
