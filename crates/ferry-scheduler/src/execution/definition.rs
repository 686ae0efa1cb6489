//! Execution record and status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ferry_config::Operation;
use ferry_storage::TransferOutcome;
use serde::{Deserialize, Serialize};

/// Execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Run in progress.
    Running,
    /// Run completed; individual items may still have failed.
    Success,
    /// Run aborted.
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(ExecutionStatus::Running),
            "SUCCESS" => Ok(ExecutionStatus::Success),
            "FAILED" => Ok(ExecutionStatus::Failed),
            other => Err(format!("unknown execution status '{}'", other)),
        }
    }
}

/// Audit record of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecution {
    /// Assigned by the execution store on save.
    pub id: Option<i64>,
    pub pipeline_name: String,
    /// Source path after template rendering.
    pub source_path: String,
    /// Target path after template rendering.
    pub target_path: String,
    pub operation: Operation,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub files_processed: u64,
    pub files_failed: u64,
    /// Items copied, in batch order.
    pub source_files: Vec<String>,
    /// Targets of `source_files`, index for index.
    pub target_files: Vec<String>,
}

impl JobExecution {
    /// Open a new record in the running state.
    pub fn start(
        pipeline_name: impl Into<String>,
        source_path: impl Into<String>,
        target_path: impl Into<String>,
        operation: Operation,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            pipeline_name: pipeline_name.into(),
            source_path: source_path.into(),
            target_path: target_path.into(),
            operation,
            start_time,
            end_time: None,
            status: ExecutionStatus::Running,
            error_message: None,
            files_processed: 0,
            files_failed: 0,
            source_files: Vec::new(),
            target_files: Vec::new(),
        }
    }

    /// Copy the outcome of the transfer phase into the record.
    pub fn record_transfer(&mut self, outcome: &TransferOutcome) {
        self.source_files = outcome.source_items();
        self.target_files = outcome.target_items();
        self.files_processed = outcome.files_processed() as u64;
        self.files_failed = outcome.failures.len() as u64;
    }

    /// Mark the run as completed.
    pub fn succeed(&mut self, end_time: DateTime<Utc>) {
        self.status = ExecutionStatus::Success;
        self.end_time = Some(end_time);
        self.error_message = None;
    }

    /// Mark the run as failed.
    pub fn fail(&mut self, message: impl Into<String>, end_time: DateTime<Utc>) {
        self.status = ExecutionStatus::Failed;
        self.end_time = Some(end_time);
        self.error_message = Some(message.into());
    }

    pub fn is_finished(&self) -> bool {
        self.status != ExecutionStatus::Running && self.end_time.is_some()
    }

    /// Wall-clock duration once finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}
