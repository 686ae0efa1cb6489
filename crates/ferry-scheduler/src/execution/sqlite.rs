//! SQLite execution store.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection as SqlConnection, Params, Row, params};
use tokio_rusqlite::Connection;
use tracing::debug;

use super::definition::JobExecution;
use super::store::ExecutionStore;
use crate::error::{SchedulerError, SchedulerResult};

const SCHEMA: &str = r#"
-- One row per pipeline run
CREATE TABLE IF NOT EXISTS job_executions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pipeline_name TEXT NOT NULL,
    source_path TEXT NOT NULL,
    target_path TEXT NOT NULL,
    operation TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT,
    status TEXT NOT NULL,
    error_message TEXT,
    files_processed INTEGER NOT NULL DEFAULT 0,
    files_failed INTEGER NOT NULL DEFAULT 0
);

-- Copied items, in batch order
CREATE TABLE IF NOT EXISTS job_execution_files (
    execution_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    source_file TEXT NOT NULL,
    target_file TEXT NOT NULL,
    PRIMARY KEY (execution_id, position),
    FOREIGN KEY (execution_id) REFERENCES job_executions(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_executions_pipeline ON job_executions(pipeline_name);
CREATE INDEX IF NOT EXISTS idx_executions_start ON job_executions(start_time);
CREATE INDEX IF NOT EXISTS idx_executions_end ON job_executions(end_time);
"#;

const SELECT_EXECUTIONS: &str = "SELECT id, pipeline_name, source_path, target_path, operation,
        start_time, end_time, status, error_message, files_processed, files_failed
     FROM job_executions";

fn init_schema(conn: &SqlConnection) -> Result<(), tokio_rusqlite::Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Fixed-width UTC timestamps so text comparison matches time order.
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(index: usize, e: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, e.into())
}

fn parse_time(index: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(index, e))
}

fn read_execution(row: &Row<'_>) -> rusqlite::Result<JobExecution> {
    let operation: String = row.get(4)?;
    let start_time: String = row.get(5)?;
    let end_time: Option<String> = row.get(6)?;
    let status: String = row.get(7)?;
    let files_processed: i64 = row.get(9)?;
    let files_failed: i64 = row.get(10)?;

    Ok(JobExecution {
        id: Some(row.get(0)?),
        pipeline_name: row.get(1)?,
        source_path: row.get(2)?,
        target_path: row.get(3)?,
        operation: operation.parse().map_err(|e| conversion_error(4, e))?,
        start_time: parse_time(5, &start_time)?,
        end_time: end_time.as_deref().map(|t| parse_time(6, t)).transpose()?,
        status: status.parse().map_err(|e: String| conversion_error(7, e))?,
        error_message: row.get(8)?,
        files_processed: files_processed.max(0) as u64,
        files_failed: files_failed.max(0) as u64,
        source_files: Vec::new(),
        target_files: Vec::new(),
    })
}

fn select<P: Params>(
    conn: &SqlConnection,
    clause: &str,
    params: P,
) -> rusqlite::Result<Vec<JobExecution>> {
    let sql = format!("{} {} ORDER BY id", SELECT_EXECUTIONS, clause);
    let mut stmt = conn.prepare(&sql)?;
    let mut executions = stmt
        .query_map(params, read_execution)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut files = conn.prepare(
        "SELECT source_file, target_file FROM job_execution_files
         WHERE execution_id = ?1 ORDER BY position",
    )?;
    for execution in &mut executions {
        let Some(id) = execution.id else { continue };
        let rows = files.query_map([id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (source, target) = row?;
            execution.source_files.push(source);
            execution.target_files.push(target);
        }
    }
    Ok(executions)
}

/// SQLite-backed execution store.
pub struct SqliteExecutionStore {
    conn: Connection,
}

impl SqliteExecutionStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> SchedulerResult<Self> {
        let conn = Connection::open_in_memory().await?;
        conn.call(|conn| Ok(init_schema(conn)?)).await?;
        Ok(Self { conn })
    }

    /// Open (or create) a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> SchedulerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SchedulerError::Store(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        debug!("Opening execution store at {}", path.display());
        let conn = Connection::open(path).await?;
        conn.call(|conn| Ok(init_schema(conn)?)).await?;
        Ok(Self { conn })
    }

    async fn query<F>(&self, f: F) -> SchedulerResult<Vec<JobExecution>>
    where
        F: FnOnce(&SqlConnection) -> rusqlite::Result<Vec<JobExecution>> + Send + 'static,
    {
        Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
    }
}

#[async_trait]
impl ExecutionStore for SqliteExecutionStore {
    async fn save(&self, mut execution: JobExecution) -> SchedulerResult<JobExecution> {
        let saved = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let start_time = format_time(&execution.start_time);
                let end_time = execution.end_time.as_ref().map(format_time);

                let id = match execution.id {
                    Some(id) => {
                        tx.execute(
                            "INSERT OR REPLACE INTO job_executions (id, pipeline_name, source_path,
                                target_path, operation, start_time, end_time, status, error_message,
                                files_processed, files_failed)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                            params![
                                id,
                                execution.pipeline_name,
                                execution.source_path,
                                execution.target_path,
                                execution.operation.as_str(),
                                start_time,
                                end_time,
                                execution.status.as_str(),
                                execution.error_message,
                                execution.files_processed as i64,
                                execution.files_failed as i64,
                            ],
                        )?;
                        tx.execute(
                            "DELETE FROM job_execution_files WHERE execution_id = ?1",
                            [id],
                        )?;
                        id
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO job_executions (pipeline_name, source_path, target_path,
                                operation, start_time, end_time, status, error_message,
                                files_processed, files_failed)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                            params![
                                execution.pipeline_name,
                                execution.source_path,
                                execution.target_path,
                                execution.operation.as_str(),
                                start_time,
                                end_time,
                                execution.status.as_str(),
                                execution.error_message,
                                execution.files_processed as i64,
                                execution.files_failed as i64,
                            ],
                        )?;
                        tx.last_insert_rowid()
                    }
                };

                for (position, (source, target)) in execution
                    .source_files
                    .iter()
                    .zip(&execution.target_files)
                    .enumerate()
                {
                    tx.execute(
                        "INSERT INTO job_execution_files (execution_id, position, source_file, target_file)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![id, position as i64, source, target],
                    )?;
                }

                tx.commit()?;
                execution.id = Some(id);
                Ok(execution)
            })
            .await?;

        debug!(
            "Saved execution {:?} for pipeline '{}'",
            saved.id, saved.pipeline_name
        );
        Ok(saved)
    }

    async fn find_all(&self) -> SchedulerResult<Vec<JobExecution>> {
        self.query(|conn| select(conn, "", [])).await
    }

    async fn find_by_id(&self, id: i64) -> SchedulerResult<Option<JobExecution>> {
        let found = self
            .query(move |conn| select(conn, "WHERE id = ?1", [id]))
            .await?;
        Ok(found.into_iter().next())
    }

    async fn find_by_pipeline_name(&self, name: &str) -> SchedulerResult<Vec<JobExecution>> {
        let name = name.to_string();
        self.query(move |conn| select(conn, "WHERE pipeline_name = ?1", [name]))
            .await
    }

    async fn find_by_start_time_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<Vec<JobExecution>> {
        let range = [format_time(&start), format_time(&end)];
        self.query(move |conn| select(conn, "WHERE start_time BETWEEN ?1 AND ?2", range))
            .await
    }

    async fn find_by_end_time_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<Vec<JobExecution>> {
        let range = [format_time(&start), format_time(&end)];
        self.query(move |conn| select(conn, "WHERE end_time BETWEEN ?1 AND ?2", range))
            .await
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
