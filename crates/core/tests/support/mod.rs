//! Shared test helpers for `slotwise-core` integration tests.
//!
//! In-memory implementations of the core ports plus a few fixture builders,
//! so service tests can focus on behaviour instead of wiring.

#![allow(dead_code)]

pub mod queue;
pub mod store;

use chrono::{DateTime, TimeZone, Utc};

pub use queue::RecordingQueue;
pub use store::MockStore;

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}
