//! Execution tracker: runs one pipeline and records the outcome.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use ferry_config::Operation;
use ferry_storage::{DeletionEngine, Storage, StorageLocation, TransferEngine, TransferOutcome};
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::error::{SchedulerError, SchedulerResult};
use crate::execution::{ExecutionStore, JobExecution};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs transfers and deletions and persists exactly one record per run.
pub struct ExecutionTracker {
    transfer: TransferEngine,
    deletion: DeletionEngine,
    store: Arc<dyn ExecutionStore>,
}

impl ExecutionTracker {
    pub fn new(storage: Storage, store: Arc<dyn ExecutionStore>) -> Self {
        Self {
            transfer: TransferEngine::new(storage.clone()),
            deletion: DeletionEngine::new(storage),
            store,
        }
    }

    /// Bound per-item concurrency for both copy and delete phases.
    pub fn with_max_concurrent_items(mut self, max: usize) -> Self {
        self.transfer = self.transfer.with_max_concurrent_items(max);
        self.deletion = self.deletion.with_max_concurrent_items(max);
        self
    }

    /// Run one pipeline execution.
    ///
    /// The record is finalised and saved on every exit path, including a
    /// panic inside the transfer. On failure the saved record travels with
    /// the error as [`SchedulerError::Execution`].
    pub async fn run(
        &self,
        operation: Operation,
        source_path: &str,
        target_path: &str,
        pipeline_name: &str,
        explicit_keys: &[String],
    ) -> SchedulerResult<JobExecution> {
        let mut execution =
            JobExecution::start(pipeline_name, source_path, target_path, operation, Utc::now());

        let source = StorageLocation::parse(source_path);
        let target = StorageLocation::parse(target_path);
        let result = AssertUnwindSafe(self.execute(operation, &source, &target, explicit_keys))
            .catch_unwind()
            .await;

        let failure = match result {
            Ok(Ok(outcome)) => {
                execution.record_transfer(&outcome);
                execution.succeed(Utc::now());
                info!(
                    "Pipeline '{}' completed: {} files processed, {} failed",
                    pipeline_name, execution.files_processed, execution.files_failed
                );
                None
            }
            Ok(Err(e)) => {
                error!("Pipeline '{}' failed: {}", pipeline_name, e);
                execution.fail(e.to_string(), Utc::now());
                Some(e)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Pipeline '{}' panicked: {}", pipeline_name, message);
                let e = SchedulerError::Panicked(message);
                execution.fail(e.to_string(), Utc::now());
                Some(e)
            }
        };

        match (self.store.save(execution.clone()).await, failure) {
            (Ok(saved), None) => Ok(saved),
            (Ok(saved), Some(e)) => Err(SchedulerError::Execution {
                execution: Box::new(saved),
                source: Box::new(e),
            }),
            (Err(store_error), None) => {
                error!(
                    "Failed to save execution record for '{}': {}",
                    pipeline_name, store_error
                );
                Err(store_error)
            }
            (Err(store_error), Some(e)) => {
                error!(
                    "Failed to save execution record for '{}': {}",
                    pipeline_name, store_error
                );
                Err(SchedulerError::Execution {
                    execution: Box::new(execution),
                    source: Box::new(e),
                })
            }
        }
    }

    async fn execute(
        &self,
        operation: Operation,
        source: &StorageLocation,
        target: &StorageLocation,
        explicit_keys: &[String],
    ) -> SchedulerResult<TransferOutcome> {
        info!("{} from {} to {}", operation, source, target);
        let outcome = self.transfer.transfer(source, target, explicit_keys).await?;

        if operation == Operation::Move {
            let deleted = self
                .deletion
                .delete_source(source, explicit_keys, &outcome)
                .await;
            if !deleted.failures.is_empty() {
                warn!(
                    "{} source items could not be deleted from {}",
                    deleted.failures.len(),
                    source
                );
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
