//! History subcommand handler for Ferry.

use chrono::{DateTime, Utc};

use ferry_config::Config;
use ferry_scheduler::JobExecution;

use crate::cli::OutputFormat;
use crate::cmd_run::open_store;

/// Filters accepted by `ferry history`.
pub(crate) struct HistoryQuery {
    pub id: Option<i64>,
    pub pipeline: Option<String>,
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub by_end_time: bool,
}

/// Print persisted execution records.
pub(crate) async fn show_history(
    config: &Config,
    query: HistoryQuery,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&config.store).await?;

    let mut executions = match (query.id, query.range) {
        (Some(id), _) => store.find_by_id(id).await?.into_iter().collect(),
        (None, Some((from, to))) if query.by_end_time => {
            store.find_by_end_time_between(from, to).await?
        }
        (None, Some((from, to))) => store.find_by_start_time_between(from, to).await?,
        (None, None) => match query.pipeline.as_deref() {
            Some(name) => store.find_by_pipeline_name(name).await?,
            None => store.find_all().await?,
        },
    };

    // A range query can still be narrowed to one pipeline.
    if let (Some(name), Some(_)) = (query.pipeline.as_deref(), query.range) {
        executions.retain(|e| e.pipeline_name == name);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&executions)?),
        OutputFormat::Table => print_table(&executions),
    }
    Ok(())
}

fn print_table(executions: &[JobExecution]) {
    if executions.is_empty() {
        println!("No executions found");
        return;
    }

    println!(
        "{:<6} {:<24} {:<8} {:<8} {:<20} {:>9} {:>7}",
        "ID", "PIPELINE", "OP", "STATUS", "STARTED", "PROCESSED", "FAILED"
    );
    for e in executions {
        println!(
            "{:<6} {:<24} {:<8} {:<8} {:<20} {:>9} {:>7}",
            e.id.map(|id| id.to_string()).unwrap_or_default(),
            e.pipeline_name,
            e.operation.as_str(),
            e.status.as_str(),
            e.start_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            e.files_processed,
            e.files_failed
        );
        if let Some(ref message) = e.error_message {
            println!("       error: {}", message);
        }
    }
}
