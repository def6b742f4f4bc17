//! Time utilities for scheduling
//!
//! - **[`cron`]**: Cron expression parsing, matching and enumeration
//! - **[`week_grid`]**: Week-of-month partitioning of calendar months
//! - **[`clock`]**: Wall-clock abstraction with a pinned test clock

pub mod clock;
pub mod cron;
pub mod week_grid;

pub use clock::{Clock, FixedClock, SystemClock};
pub use cron::{CronExpression, CronField, CronFieldKind, CronParseError, CronTerm, Occurrences};
pub use week_grid::{CalendarDay, CalendarError, WeekOfMonthGrid};
