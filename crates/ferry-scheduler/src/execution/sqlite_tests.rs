
use super::*;
use crate::execution::ExecutionStatus;
use chrono::{Duration, TimeZone};
use ferry_config::Operation;
use tempfile::TempDir;

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 10, minute, 0).unwrap()
}

fn sample(name: &str, start_minute: u32) -> JobExecution {
    let mut execution =
        JobExecution::start(name, "s3://bkt/in/", "/data/out/", Operation::Move, at(start_minute));
    execution.source_files = vec!["s3://bkt/in/a.csv".to_string(), "s3://bkt/in/b.csv".to_string()];
    execution.target_files = vec!["/data/out/a.csv".to_string(), "/data/out/b.csv".to_string()];
    execution.files_processed = 2;
    execution.files_failed = 1;
    execution.succeed(at(start_minute) + Duration::seconds(45));
    execution
}

#[tokio::test]
async fn test_save_and_find_by_id() {
    let store = SqliteExecutionStore::in_memory().await.unwrap();
    let saved = store.save(sample("orders", 0)).await.unwrap();
    assert_eq!(saved.id, Some(1));

    let loaded = store.find_by_id(1).await.unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.operation, Operation::Move);
    assert_eq!(loaded.status, ExecutionStatus::Success);
    assert_eq!(loaded.source_files, vec!["s3://bkt/in/a.csv", "s3://bkt/in/b.csv"]);
    assert_eq!(loaded.target_files, vec!["/data/out/a.csv", "/data/out/b.csv"]);
    assert!(store.find_by_id(99).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_record_round_trips_error() {
    let store = SqliteExecutionStore::in_memory().await.unwrap();
    let mut execution = JobExecution::start("orders", "/missing/", "/out/", Operation::Copy, at(0));
    execution.fail("Not found: /missing/", at(1));

    let saved = store.save(execution).await.unwrap();
    let loaded = store.find_by_id(saved.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(loaded.status, ExecutionStatus::Failed);
    assert_eq!(loaded.error_message.as_deref(), Some("Not found: /missing/"));
    assert!(loaded.source_files.is_empty());
}

#[tokio::test]
async fn test_resave_replaces_files() {
    let store = SqliteExecutionStore::in_memory().await.unwrap();
    let mut saved = store.save(sample("orders", 0)).await.unwrap();
    saved.source_files.truncate(1);
    saved.target_files.truncate(1);
    saved.files_processed = 1;
    store.save(saved).await.unwrap();

    let all = store.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].source_files, vec!["s3://bkt/in/a.csv"]);
    assert_eq!(all[0].files_processed, 1);
}

#[tokio::test]
async fn test_queries() {
    let store = SqliteExecutionStore::in_memory().await.unwrap();
    store.save(sample("orders", 0)).await.unwrap();
    store.save(sample("invoices", 5)).await.unwrap();
    store.save(sample("orders", 10)).await.unwrap();
    store
        .save(JobExecution::start("orders", "/in/", "/out/", Operation::Copy, at(20)))
        .await
        .unwrap();

    let orders = store.find_by_pipeline_name("orders").await.unwrap();
    assert_eq!(orders.len(), 3);

    let started = store.find_by_start_time_between(at(5), at(10)).await.unwrap();
    let ids: Vec<_> = started.iter().filter_map(|e| e.id).collect();
    assert_eq!(ids, vec![2, 3]);

    // Still running, so never matched by end time.
    let ended = store.find_by_end_time_between(at(0), at(30)).await.unwrap();
    assert_eq!(ended.len(), 3);
}

#[tokio::test]
async fn test_file_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/executions.db");

    {
        let store = SqliteExecutionStore::open(&path).await.unwrap();
        store.save(sample("orders", 0)).await.unwrap();
    }

    let reopened = SqliteExecutionStore::open(&path).await.unwrap();
    let all = reopened.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].pipeline_name, "orders");
}

#[test]
fn test_time_format_is_fixed_width() {
    assert_eq!(format_time(&at(0)), "2024-03-05T10:00:00.000000Z");
}
