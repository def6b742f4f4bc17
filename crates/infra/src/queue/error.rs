//! Compilation queue error types

use std::time::Duration;

use slotwise_common::error::{ErrorClassification, ErrorSeverity};
use slotwise_domain::SlotwiseError;
use thiserror::Error;

use crate::errors::InfraError;

/// Queue lifecycle and submission errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Queue is already running
    #[error("Compilation queue already running")]
    AlreadyRunning,

    /// Queue is not running
    #[error("Compilation queue not running")]
    NotRunning,

    /// Bounded channel has no free capacity
    #[error("Compilation queue is full ({capacity} pending)")]
    Full { capacity: usize },

    /// Receiving side has been dropped
    #[error("Compilation queue is closed")]
    Closed,

    /// Workers did not finish within the join timeout
    #[error("Workers did not stop within {duration:?}")]
    Timeout { duration: Duration },

    /// A worker task panicked or was aborted
    #[error("Worker join failed: {0}")]
    JoinFailed(String),
}

impl ErrorClassification for QueueError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Full { .. } | Self::Timeout { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::AlreadyRunning | Self::NotRunning => ErrorSeverity::Info,
            Self::Full { .. } | Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Closed => ErrorSeverity::Error,
            Self::JoinFailed(_) => ErrorSeverity::Critical,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Full { .. } => Some(Duration::from_millis(100)),
            _ => None,
        }
    }
}

impl From<QueueError> for InfraError {
    fn from(err: QueueError) -> Self {
        let slotwise_err = match err {
            QueueError::AlreadyRunning | QueueError::NotRunning => {
                SlotwiseError::InvalidState(err.to_string())
            }
            _ => SlotwiseError::Internal(err.to_string()),
        };
        InfraError(slotwise_err)
    }
}

impl From<QueueError> for SlotwiseError {
    fn from(err: QueueError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
