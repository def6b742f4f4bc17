//! Mapping of leaf errors from `slotwise-common` into `SlotwiseError`

use slotwise_common::time::{CalendarError, CronParseError};
use slotwise_domain::SlotwiseError;

/// Conversion into the domain error
///
/// `From` cannot be implemented here because both types are foreign to this
/// crate.
pub trait IntoDomainError {
    fn into_domain(self) -> SlotwiseError;
}

impl IntoDomainError for CronParseError {
    fn into_domain(self) -> SlotwiseError {
        let field = self.field().map_or("expression", |field| field.as_str());
        SlotwiseError::Parse { field: field.to_string(), token: self.token().to_string() }
    }
}

impl IntoDomainError for CalendarError {
    fn into_domain(self) -> SlotwiseError {
        SlotwiseError::Range(self.to_string())
    }
}
