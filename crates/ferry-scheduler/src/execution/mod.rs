//! Execution records and their persistence.

mod definition;
mod sqlite;
mod store;

pub use definition::{ExecutionStatus, JobExecution};
pub use sqlite::SqliteExecutionStore;
pub use store::{ExecutionStore, MemoryExecutionStore};
