//! Week-of-month calendar grid
//!
//! Partitions a calendar month into weeks that begin on a configured weekday.
//! The first and last week of a month may be partial. Weeks are numbered from
//! 1.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Errors raised for dates the grid cannot place
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalendarError {
    #[error("{year}-{month} is not a valid calendar month")]
    InvalidMonth { year: i32, month: u32 },

    #[error("week {week} is outside {year}-{month}, which has {weeks} weeks")]
    WeekOutOfRange { year: i32, month: u32, week: u32, weeks: u32 },
}

impl ErrorClassification for CalendarError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }
}

/// One cell of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day_of_month: u32,
    pub weekday: Weekday,
}

/// Splits months into weeks starting on `week_start`
///
/// # Examples
///
/// ```
/// use chrono::Weekday;
/// use slotwise_common::time::WeekOfMonthGrid;
///
/// let grid = WeekOfMonthGrid::default();
/// // February 2023 starts on a Wednesday: 4 + 7 + 7 + 7 + 3 days
/// let weeks = grid.days_of_month(2023, 2).unwrap();
/// assert_eq!(weeks.len(), 5);
/// assert_eq!(weeks[0].len(), 4);
/// assert_eq!(weeks[0][0].weekday, Weekday::Wed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekOfMonthGrid {
    week_start: Weekday,
}

impl Default for WeekOfMonthGrid {
    fn default() -> Self {
        Self::new(Weekday::Sun)
    }
}

impl WeekOfMonthGrid {
    pub const fn new(week_start: Weekday) -> Self {
        Self { week_start }
    }

    pub const fn week_start(&self) -> Weekday {
        self.week_start
    }

    /// Every day of the month, grouped into weeks.
    pub fn days_of_month(&self, year: i32, month: u32) -> Result<Vec<Vec<CalendarDay>>, CalendarError> {
        let first = first_of_month(year, month)?;
        let mut weeks: Vec<Vec<CalendarDay>> = Vec::with_capacity(6);

        for date in first.iter_days().take_while(|d| d.month() == month) {
            let index = self.week_index(first, date.day());
            if weeks.len() <= index {
                weeks.push(Vec::with_capacity(7));
            }
            weeks[index].push(CalendarDay { day_of_month: date.day(), weekday: date.weekday() });
        }

        Ok(weeks)
    }

    /// Days of one week. Empty when `week` is outside `1..=number_of_weeks`.
    pub fn days_of_week(&self, year: i32, month: u32, week: u32) -> Result<Vec<CalendarDay>, CalendarError> {
        let mut weeks = self.days_of_month(year, month)?;
        let Some(index) = week.checked_sub(1).map(|w| w as usize) else {
            return Ok(Vec::new());
        };
        if index >= weeks.len() {
            return Ok(Vec::new());
        }
        Ok(weeks.swap_remove(index))
    }

    pub fn number_of_weeks(&self, year: i32, month: u32) -> Result<u32, CalendarError> {
        let first = first_of_month(year, month)?;
        let last_day = days_in_month(first);
        Ok((self.offset(first) + last_day - 1) / 7 + 1)
    }

    /// Week number (1-based) that `date` falls into within its own month.
    pub fn week_of_month(&self, date: NaiveDate) -> u32 {
        let first = date.with_day(1).unwrap_or(date);
        self.week_index(first, date.day()) as u32 + 1
    }

    /// The date in `week` that falls on `weekday`, if that week contains it.
    pub fn day_in_week(
        &self,
        year: i32,
        month: u32,
        week: u32,
        weekday: Weekday,
    ) -> Result<Option<NaiveDate>, CalendarError> {
        self.check_week(year, month, week)?;
        let first = first_of_month(year, month)?;
        let position = days_from(self.week_start, weekday);
        let day = (week - 1) * 7 + position + 1;

        // Positions before the 1st or after the last day are absent in a
        // partial week.
        let Some(day) = day.checked_sub(self.offset(first)) else {
            return Ok(None);
        };
        if day == 0 || day > days_in_month(first) {
            return Ok(None);
        }
        Ok(NaiveDate::from_ymd_opt(year, month, day))
    }

    /// Fails unless `week` is within `1..=number_of_weeks(year, month)`.
    pub fn check_week(&self, year: i32, month: u32, week: u32) -> Result<(), CalendarError> {
        let weeks = self.number_of_weeks(year, month)?;
        if week == 0 || week > weeks {
            return Err(CalendarError::WeekOutOfRange { year, month, week, weeks });
        }
        Ok(())
    }

    /// Leading days of the first week that belong to the previous month.
    fn offset(&self, first: NaiveDate) -> u32 {
        days_from(self.week_start, first.weekday())
    }

    fn week_index(&self, first: NaiveDate, day_of_month: u32) -> usize {
        ((self.offset(first) + day_of_month - 1) / 7) as usize
    }
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CalendarError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::InvalidMonth { year, month })
}

fn days_in_month(first: NaiveDate) -> u32 {
    first.iter_days().take_while(|d| d.month() == first.month()).count() as u32
}

/// Days walked forward from `start` to reach `day`.
fn days_from(start: Weekday, day: Weekday) -> u32 {
    (day.num_days_from_monday() + 7 - start.num_days_from_monday()) % 7
}
