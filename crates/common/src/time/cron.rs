//! Cron expression parsing and evaluation
//!
//! Five-field expressions (`minute hour day-of-month month day-of-week`) are
//! parsed once into a [`CronExpression`] and then evaluated against instants
//! with [`CronExpression::matches`] or expanded over a half-open range with
//! [`CronExpression::enumerate`].
//!
//! Each field accepts `*`, a single value, a comma separated list, an
//! inclusive range `a-b`, and steps (`*/n`, `a/n`, `a-b/n`). Day-of-week runs
//! from `0` (Sunday) to `6`, with `7` accepted as an alias for Sunday.
//!
//! Fields combine with AND, except day-of-month and day-of-week: when both
//! are restricted (their token does not start with `*`) an instant matches if
//! either of them does.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Offset, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Which of the five cron fields a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CronFieldKind {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl CronFieldKind {
    /// Fields in the order they appear in an expression.
    pub const ALL: [Self; 5] =
        [Self::Minute, Self::Hour, Self::DayOfMonth, Self::Month, Self::DayOfWeek];

    /// Inclusive bounds accepted for explicit values.
    pub const fn bounds(self) -> (u32, u32) {
        match self {
            Self::Minute => (0, 59),
            Self::Hour => (0, 23),
            Self::DayOfMonth => (1, 31),
            Self::Month => (1, 12),
            Self::DayOfWeek => (0, 7),
        }
    }

    /// Span covered by `*`; day-of-week stops at Saturday so Sunday is not
    /// counted twice.
    const fn wildcard_span(self) -> (u32, u32) {
        match self {
            Self::DayOfWeek => (0, 6),
            other => other.bounds(),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::DayOfMonth => "day-of-month",
            Self::Month => "month",
            Self::DayOfWeek => "day-of-week",
        }
    }
}

impl fmt::Display for CronFieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for cron parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CronParseError {
    #[error("expected 5 cron fields, got {found} in '{expression}'")]
    FieldCount { found: usize, expression: String },

    #[error("invalid {field} token '{token}': {reason}")]
    InvalidToken { field: CronFieldKind, token: String, reason: &'static str },

    #[error("{field} value {value} in '{token}' is outside {min}-{max}")]
    OutOfRange { field: CronFieldKind, token: String, value: u32, min: u32, max: u32 },
}

impl CronParseError {
    /// Field that failed to parse, if the failure is tied to one.
    pub fn field(&self) -> Option<CronFieldKind> {
        match self {
            Self::FieldCount { .. } => None,
            Self::InvalidToken { field, .. } | Self::OutOfRange { field, .. } => Some(*field),
        }
    }

    /// The offending token (the whole expression for field-count errors).
    pub fn token(&self) -> &str {
        match self {
            Self::FieldCount { expression, .. } => expression,
            Self::InvalidToken { token, .. } | Self::OutOfRange { token, .. } => token,
        }
    }
}

impl ErrorClassification for CronParseError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }
}

/// One comma separated term of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronTerm {
    Single(u32),
    Range { start: u32, end: u32 },
    Step { start: u32, end: u32, step: u32 },
}

impl CronTerm {
    fn contains(self, value: u32) -> bool {
        match self {
            Self::Single(v) => v == value,
            Self::Range { start, end } => (start..=end).contains(&value),
            Self::Step { start, end, step } => {
                (start..=end).contains(&value) && (value - start) % step == 0
            }
        }
    }
}

/// A parsed cron field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CronField {
    Any,
    Terms(Vec<CronTerm>),
}

impl CronField {
    fn parse(token: &str, kind: CronFieldKind) -> Result<Self, CronParseError> {
        if token == "*" {
            return Ok(Self::Any);
        }

        let terms = token
            .split(',')
            .map(|term| parse_term(term, token, kind))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::Terms(terms))
    }

    fn contains(&self, value: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Terms(terms) => terms.iter().any(|term| term.contains(value)),
        }
    }
}

fn parse_term(term: &str, token: &str, kind: CronFieldKind) -> Result<CronTerm, CronParseError> {
    let invalid = |reason| CronParseError::InvalidToken { field: kind, token: token.to_string(), reason };

    if term.is_empty() {
        return Err(invalid("empty list element"));
    }

    let (body, step) = match term.split_once('/') {
        Some((body, step)) => {
            let step: u32 = step.parse().map_err(|_| invalid("step is not a number"))?;
            if step == 0 {
                return Err(invalid("step must be positive"));
            }
            (body, Some(step))
        }
        None => (term, None),
    };

    let (start, end) = if body == "*" {
        kind.wildcard_span()
    } else if let Some((lo, hi)) = body.split_once('-') {
        let lo = parse_value(lo, token, kind)?;
        let hi = parse_value(hi, token, kind)?;
        if lo > hi {
            return Err(invalid("range start exceeds range end"));
        }
        (lo, hi)
    } else {
        let value = parse_value(body, token, kind)?;
        match step {
            // `a/n` runs from `a` to the top of the field
            Some(_) => (value, kind.wildcard_span().1.max(value)),
            None => return Ok(CronTerm::Single(value)),
        }
    };

    Ok(match step {
        Some(step) => CronTerm::Step { start, end, step },
        None => CronTerm::Range { start, end },
    })
}

fn parse_value(raw: &str, token: &str, kind: CronFieldKind) -> Result<u32, CronParseError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CronParseError::InvalidToken {
            field: kind,
            token: token.to_string(),
            reason: "expected a non-negative integer",
        });
    }

    let (min, max) = kind.bounds();
    // All-digit strings too long for u32 are out of range by definition.
    let value = raw.parse::<u32>().unwrap_or(u32::MAX);
    if value < min || value > max {
        return Err(CronParseError::OutOfRange {
            field: kind,
            token: token.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(value)
}

/// A parsed cron expression
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use slotwise_common::time::cron::CronExpression;
///
/// // Mondays, Wednesdays and Fridays at 11:00 and 11:30
/// let cron = CronExpression::parse("0,30 11 * * 1,3,5").unwrap();
///
/// let monday = Utc.with_ymd_and_hms(2023, 7, 3, 11, 30, 0).unwrap();
/// assert!(cron.matches(&monday));
///
/// let tuesday = Utc.with_ymd_and_hms(2023, 7, 4, 11, 30, 0).unwrap();
/// assert!(!cron.matches(&tuesday));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    minute: CronField,
    hour: CronField,
    day_of_month: CronField,
    month: CronField,
    day_of_week: CronField,
    day_of_month_restricted: bool,
    day_of_week_restricted: bool,
}

impl CronExpression {
    /// Parse a cron expression from a string
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = parts[..] else {
            return Err(CronParseError::FieldCount {
                found: parts.len(),
                expression: expr.to_string(),
            });
        };

        Ok(Self {
            source: parts.join(" "),
            minute: CronField::parse(minute, CronFieldKind::Minute)?,
            hour: CronField::parse(hour, CronFieldKind::Hour)?,
            day_of_month: CronField::parse(dom, CronFieldKind::DayOfMonth)?,
            month: CronField::parse(month, CronFieldKind::Month)?,
            day_of_week: CronField::parse(dow, CronFieldKind::DayOfWeek)?,
            day_of_month_restricted: !dom.starts_with('*'),
            day_of_week_restricted: !dow.starts_with('*'),
        })
    }

    /// Normalized source text (fields separated by single spaces).
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether day-of-month and day-of-week combine with OR.
    pub fn uses_day_union(&self) -> bool {
        self.day_of_month_restricted && self.day_of_week_restricted
    }

    /// Check if an instant matches, reading its fields in the instant's own
    /// time zone. Seconds are ignored.
    pub fn matches<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        if !(self.minute.contains(instant.minute())
            && self.hour.contains(instant.hour())
            && self.month.contains(instant.month()))
        {
            return false;
        }

        let dom = self.day_of_month.contains(instant.day());
        let dow = self.matches_weekday(instant.weekday().num_days_from_sunday());

        if self.uses_day_union() {
            dom || dow
        } else {
            dom && dow
        }
    }

    fn matches_weekday(&self, from_sunday: u32) -> bool {
        self.day_of_week.contains(from_sunday) || (from_sunday == 0 && self.day_of_week.contains(7))
    }

    /// Matching instants in `[start, end)` on `step_minutes` boundaries,
    /// evaluated in UTC.
    pub fn enumerate(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_minutes: u32,
    ) -> Occurrences<'_, Utc> {
        self.occurrences_in(Utc, start, end, step_minutes)
    }

    /// Matching instants in `[start, end)` on `step_minutes` boundaries,
    /// with field values read in `tz`.
    ///
    /// A boundary is an instant whose local wall-clock minutes in `tz` (minutes
    /// since the Unix epoch plus the UTC offset in force at that instant) are a
    /// multiple of `step_minutes`, so 09:00 in a +05:45 zone is on a 30 minute
    /// boundary. A zero step yields nothing.
    pub fn occurrences_in<Tz: TimeZone>(
        &self,
        tz: Tz,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_minutes: u32,
    ) -> Occurrences<'_, Tz> {
        let step = i64::from(step_minutes);
        let end_secs = end.timestamp();
        let cursor = if step == 0 { end_secs.div_euclid(60) + 1 } else { ceil_div(start.timestamp(), 60) };

        Occurrences { expression: self, tz, cursor, step: step.max(1), end_secs }
    }
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    let quotient = value.div_euclid(divisor);
    if value.rem_euclid(divisor) == 0 {
        quotient
    } else {
        quotient + 1
    }
}

impl FromStr for CronExpression {
    type Err = CronParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Ascending, finite sequence of matching instants.
///
/// A clone continues independently from the same position.
#[derive(Clone)]
pub struct Occurrences<'a, Tz: TimeZone> {
    expression: &'a CronExpression,
    tz: Tz,
    /// Minutes since the Unix epoch of the next candidate. Not yet aligned
    /// to the local grid until `next` has looked at it.
    cursor: i64,
    step: i64,
    end_secs: i64,
}

impl<Tz: TimeZone> Iterator for Occurrences<'_, Tz> {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor.checked_mul(60)? < self.end_secs {
            let candidate = Utc.timestamp_opt(self.cursor * 60, 0).single()?;
            let local = candidate.with_timezone(&self.tz);
            let offset_minutes = i64::from(local.offset().fix().local_minus_utc()).div_euclid(60);

            // Realign whenever the offset moves the local clock off the grid.
            let misalignment = (self.cursor + offset_minutes).rem_euclid(self.step);
            if misalignment != 0 {
                self.cursor += self.step - misalignment;
                continue;
            }

            self.cursor += self.step;
            if self.expression.matches(&local) {
                return Some(candidate);
            }
        }
        None
    }
}
