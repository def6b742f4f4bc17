//! Custom assertions for testing

// These assertions are designed to panic on failure
#![allow(clippy::missing_panics_doc)]

use std::fmt::Debug;

/// Assert that an error's display text contains a substring
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-utils")]
/// # {
/// let result: Result<(), String> = Err("expected 5 cron fields, got 4".to_string());
/// slotwise_common::assert_error_contains!(result, "cron fields");
/// # }
/// ```
#[macro_export]
macro_rules! assert_error_contains {
    ($result:expr, $substring:expr) => {
        match &$result {
            Ok(_) => panic!("Expected error but got Ok"),
            Err(e) => {
                let error_msg = format!("{}", e);
                assert!(
                    error_msg.contains($substring),
                    "Error message '{}' does not contain '{}'",
                    error_msg,
                    $substring
                );
            }
        }
    };
}

/// Assert that items are in non-decreasing order
pub fn assert_sorted<T>(items: &[T])
where
    T: Ord + Debug,
{
    for window in items.windows(2) {
        assert!(window[0] <= window[1], "Items not sorted: {:?} > {:?}", window[0], window[1]);
    }
}

/// Assert that items are ascending with no duplicates
pub fn assert_strictly_sorted<T>(items: &[T])
where
    T: Ord + Debug,
{
    for window in items.windows(2) {
        assert!(
            window[0] < window[1],
            "Items not strictly ascending: {:?} >= {:?}",
            window[0],
            window[1]
        );
    }
}
