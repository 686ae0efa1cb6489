//! Pipeline scheduler: wakes periodically and runs due pipelines.

use std::sync::Arc;

use chrono::{DateTime, Local};
use ferry_config::PipelineDefinition;
use tokio::sync::watch;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::due::is_due;
use crate::error::{SchedulerError, SchedulerResult};
use crate::execution::JobExecution;
use crate::template::render;
use crate::tracker::ExecutionTracker;

/// Scheduler that periodically evaluates pipelines and runs the due ones.
pub struct PipelineScheduler {
    pipelines: Vec<PipelineDefinition>,
    tracker: ExecutionTracker,
    poll_interval: Duration,
    window: chrono::Duration,
}

impl PipelineScheduler {
    /// Create a scheduler ticking every 60 seconds with a one-minute window.
    pub fn new(pipelines: Vec<PipelineDefinition>, tracker: ExecutionTracker) -> Self {
        Self {
            pipelines,
            tracker,
            poll_interval: Duration::from_secs(60),
            window: chrono::Duration::seconds(60),
        }
    }

    /// Set the tick interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the acceptance window around each fire time.
    pub fn with_window(mut self, window: chrono::Duration) -> Self {
        self.window = window;
        self
    }

    pub fn find_pipeline(&self, name: &str) -> Option<&PipelineDefinition> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    /// Start the scheduler loop. Runs until the cancellation channel fires.
    pub async fn run(self: Arc<Self>, cancel: watch::Receiver<bool>) {
        info!(
            "Pipeline scheduler started ({} pipelines, interval: {:?})",
            self.pipelines.len(),
            self.poll_interval
        );

        let mut interval = time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cancel = cancel;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_tick(Local::now()).await;
                }
                _ = cancel.changed() => {
                    info!("Pipeline scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// Evaluate every pipeline once against `now` and run the due ones in
    /// configured order.
    ///
    /// Failures are logged and never stop the tick. Returns the records of
    /// the runs that were dispatched.
    pub async fn run_tick(&self, now: DateTime<Local>) -> Vec<JobExecution> {
        let mut executions = Vec::new();

        for pipeline in &self.pipelines {
            if !is_due(pipeline, &now, self.window) {
                continue;
            }

            match self.execute_pipeline(pipeline, &now).await {
                Ok(execution) => executions.push(execution),
                Err(e) => {
                    error!("Scheduled run of '{}' failed: {}", pipeline.name, e);
                    if let Some(execution) = e.execution() {
                        executions.push(execution.clone());
                    }
                }
            }
        }

        debug!("Tick at {} dispatched {} pipelines", now, executions.len());
        executions
    }

    /// Run a pipeline immediately, regardless of its schedule.
    pub async fn execute_by_name(&self, name: &str) -> SchedulerResult<JobExecution> {
        let pipeline = self
            .find_pipeline(name)
            .ok_or_else(|| SchedulerError::PipelineNotFound(name.to_string()))?;
        info!("On-demand run of pipeline '{}'", name);
        self.execute_pipeline(pipeline, &Local::now()).await
    }

    async fn execute_pipeline(
        &self,
        pipeline: &PipelineDefinition,
        now: &DateTime<Local>,
    ) -> SchedulerResult<JobExecution> {
        let source = render(&pipeline.source, now);
        let target = render(&pipeline.target, now);

        info!("Executing pipeline: {}", pipeline.name);
        info!("From: {}", source);
        info!("To: {}", target);

        self.tracker
            .run(
                pipeline.operation,
                &source,
                &target,
                &pipeline.name,
                &pipeline.source_keys,
            )
            .await
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
