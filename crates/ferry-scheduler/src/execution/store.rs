//! Execution store contract and in-memory implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::definition::JobExecution;
use crate::error::SchedulerResult;

/// Persistence for execution records. Results are ordered by id.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a record, assigning an id when it has none.
    async fn save(&self, execution: JobExecution) -> SchedulerResult<JobExecution>;

    async fn find_all(&self) -> SchedulerResult<Vec<JobExecution>>;

    async fn find_by_id(&self, id: i64) -> SchedulerResult<Option<JobExecution>>;

    async fn find_by_pipeline_name(&self, name: &str) -> SchedulerResult<Vec<JobExecution>>;

    /// Records whose start time lies in `[start, end]`.
    async fn find_by_start_time_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<Vec<JobExecution>>;

    /// Finished records whose end time lies in `[start, end]`.
    async fn find_by_end_time_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<Vec<JobExecution>>;
}

/// In-memory execution store for testing.
pub struct MemoryExecutionStore {
    executions: RwLock<BTreeMap<i64, JobExecution>>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self {
            executions: RwLock::new(BTreeMap::new()),
        }
    }

    async fn filter<F>(&self, predicate: F) -> Vec<JobExecution>
    where
        F: Fn(&JobExecution) -> bool,
    {
        let executions = self.executions.read().await;
        executions.values().filter(|e| predicate(e)).cloned().collect()
    }
}

impl Default for MemoryExecutionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn save(&self, mut execution: JobExecution) -> SchedulerResult<JobExecution> {
        let mut executions = self.executions.write().await;
        let id = match execution.id {
            Some(id) => id,
            None => executions.keys().next_back().map_or(1, |last| last + 1),
        };
        execution.id = Some(id);
        executions.insert(id, execution.clone());
        Ok(execution)
    }

    async fn find_all(&self) -> SchedulerResult<Vec<JobExecution>> {
        Ok(self.filter(|_| true).await)
    }

    async fn find_by_id(&self, id: i64) -> SchedulerResult<Option<JobExecution>> {
        let executions = self.executions.read().await;
        Ok(executions.get(&id).cloned())
    }

    async fn find_by_pipeline_name(&self, name: &str) -> SchedulerResult<Vec<JobExecution>> {
        Ok(self.filter(|e| e.pipeline_name == name).await)
    }

    async fn find_by_start_time_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<Vec<JobExecution>> {
        Ok(self
            .filter(|e| e.start_time >= start && e.start_time <= end)
            .await)
    }

    async fn find_by_end_time_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<Vec<JobExecution>> {
        Ok(self
            .filter(|e| e.end_time.is_some_and(|t| t >= start && t <= end))
            .await)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
