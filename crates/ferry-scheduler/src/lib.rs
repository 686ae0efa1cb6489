//! # Ferry Scheduler
//!
//! Decides which pipelines are due on each tick, runs them through the
//! storage engines and keeps an auditable record of every run.

mod due;
mod error;
pub mod execution;
mod scheduler;
mod template;
mod tracker;

pub use due::{is_due, next_fire_time, parse_schedule};
pub use error::{SchedulerError, SchedulerResult};
pub use execution::{
    ExecutionStatus, ExecutionStore, JobExecution, MemoryExecutionStore, SqliteExecutionStore,
};
pub use scheduler::PipelineScheduler;
pub use template::{date_folder, render};
pub use tracker::ExecutionTracker;
