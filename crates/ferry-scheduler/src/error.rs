//! Scheduler error types.

use ferry_storage::StorageError;
use thiserror::Error;

use crate::execution::JobExecution;

/// Errors raised while dispatching and recording pipeline runs.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No pipeline with the requested name is configured.
    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    /// Cron expression could not be parsed.
    #[error("Invalid schedule '{schedule}': {message}")]
    InvalidSchedule { schedule: String, message: String },

    /// Transfer or deletion failed as a whole.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Execution store failed.
    #[error("Execution store error: {0}")]
    Store(String),

    /// The run panicked.
    #[error("Execution panicked: {0}")]
    Panicked(String),

    /// The run failed after its record was finalised.
    #[error("Pipeline '{}' failed: {source}", .execution.pipeline_name)]
    Execution {
        execution: Box<JobExecution>,
        #[source]
        source: Box<SchedulerError>,
    },
}

impl SchedulerError {
    /// The finalised record attached to a failed run, if any.
    pub fn execution(&self) -> Option<&JobExecution> {
        match self {
            SchedulerError::Execution { execution, .. } => Some(execution),
            _ => None,
        }
    }
}

impl From<tokio_rusqlite::Error> for SchedulerError {
    fn from(e: tokio_rusqlite::Error) -> Self {
        SchedulerError::Store(e.to_string())
    }
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
