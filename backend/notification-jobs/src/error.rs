/// Error types for the notification jobs
///
/// One enum per collaborator boundary. Job entry points never return these:
/// they are logged and folded into the run's `JobSummary`.
use std::time::Duration;
use thiserror::Error;

/// The remote profile directory could not be used for this run.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// 5xx, timeout, transport failure or an unreadable response body
    #[error("profile directory unavailable: {0}")]
    Unavailable(String),
}

/// A windowed record query against the ERP database failed.
#[derive(Debug, Error)]
pub enum RecordQueryError {
    #[error("record query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record query timed out after {0:?}")]
    Timeout(Duration),
}

impl From<db_pool::QueryError> for RecordQueryError {
    fn from(err: db_pool::QueryError) -> Self {
        match err {
            db_pool::QueryError::Timeout(elapsed) => RecordQueryError::Timeout(elapsed),
            db_pool::QueryError::Database(e) => RecordQueryError::Database(e),
        }
    }
}

/// The notification store did not accept an insert.
#[derive(Debug, Error)]
pub enum SinkError {
    /// 5xx, timeout or transport failure
    #[error("notification store unavailable: {0}")]
    Unavailable(String),

    /// Any other non-success status that is not a uniqueness conflict
    #[error("notification store rejected insert with status {status}")]
    Rejected { status: u16 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusinessDayError {
    #[error("business day offset must be >= 0, got {0}")]
    NegativeOffset(i64),

    #[error("business day offset {0} runs past the supported date range")]
    OutOfRange(i64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure while resolving one recipient's records.
#[derive(Debug, Error)]
pub enum RecipientError {
    #[error(transparent)]
    Window(#[from] BusinessDayError),

    #[error(transparent)]
    Query(#[from] RecordQueryError),
}
