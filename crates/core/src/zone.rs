//! IANA time zone lookup

use chrono_tz::Tz;
use slotwise_domain::{Result, SlotwiseError};

/// Resolve an IANA zone name such as `Europe/Berlin` or `UTC`.
///
/// # Errors
/// Returns `SlotwiseError::InvalidInput` for unknown names.
pub fn parse_time_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| SlotwiseError::InvalidInput(format!("unknown time zone '{name}'")))
}
