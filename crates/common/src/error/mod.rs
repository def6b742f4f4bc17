//! Common error classification shared across Slotwise crates
//!
//! Leaf error types (cron parsing, calendar grid lookups, worker failures)
//! implement [`ErrorClassification`] so that callers can decide how loudly to
//! log a failure and whether a retry makes sense without matching on every
//! concrete variant.
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Empty source week, missing resource |
//! | **Warning** | Degraded but operational | Job timeout, queue saturation |
//! | **Error** | Failure requiring attention | Malformed cron field, invalid month |
//! | **Critical** | System integrity at risk | Worker panics, broken invariants |
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use slotwise_common::error::{ErrorClassification, ErrorSeverity};
//!
//! #[derive(Debug)]
//! enum WidgetError {
//!     Busy,
//!     Invalid,
//! }
//!
//! impl ErrorClassification for WidgetError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//!
//!     fn severity(&self) -> ErrorSeverity {
//!         match self {
//!             Self::Busy => ErrorSeverity::Warning,
//!             Self::Invalid => ErrorSeverity::Error,
//!         }
//!     }
//! }
//!
//! assert!(WidgetError::Busy.is_retryable());
//! assert_eq!(WidgetError::Invalid.severity(), ErrorSeverity::Error);
//! assert!(WidgetError::Invalid.retry_after().is_none());
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Unified severity level for monitoring and log routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational, expected conditions
    Info,
    /// Degraded but operational
    Warning,
    /// Failure requiring attention
    Error,
    /// System integrity at risk
    Critical,
}

impl ErrorSeverity {
    /// Stable lowercase label for structured log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Can the failed operation be attempted again unchanged?
    fn is_retryable(&self) -> bool;

    /// How serious is this error?
    fn severity(&self) -> ErrorSeverity;

    /// Does this error require immediate attention?
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Suggested retry delay, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
