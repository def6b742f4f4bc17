//! Testing utilities and helpers
//!
//! - **[`assertions`]**: Ordering and error-message assertions
//! - **[`async_utils`]**: Polling and timeout helpers for async tests
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "test-utils")]
//! # {
//! use slotwise_common::testing::assert_strictly_sorted;
//!
//! assert_strictly_sorted(&[1, 2, 5]);
//!
//! let result: Result<(), String> = Err("week 7 is outside 2023-7".to_string());
//! slotwise_common::assert_error_contains!(result, "outside");
//! # }
//! ```

pub mod assertions;
pub mod async_utils;

// Macros exported with #[macro_export] are available at crate root
pub use assertions::{assert_sorted, assert_strictly_sorted};
pub use async_utils::{poll_until, timeout_ok};
