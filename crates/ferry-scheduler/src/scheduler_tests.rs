//! Tests for the pipeline scheduler.

use super::*;
use chrono::TimeZone;
use ferry_config::Operation;
use ferry_storage::{MemoryObjectStore, Storage};

use crate::execution::{ExecutionStatus, ExecutionStore, MemoryExecutionStore};

struct Fixture {
    objects: Arc<MemoryObjectStore>,
    store: Arc<MemoryExecutionStore>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            objects: Arc::new(MemoryObjectStore::new()),
            store: Arc::new(MemoryExecutionStore::new()),
        }
    }

    fn scheduler(&self, pipelines: Vec<PipelineDefinition>) -> PipelineScheduler {
        let storage = Storage::with_object_store(self.objects.clone());
        let tracker = ExecutionTracker::new(storage, self.store.clone());
        PipelineScheduler::new(pipelines, tracker)
    }
}

fn daily_at_ten(name: &str) -> PipelineDefinition {
    PipelineDefinition::new(
        name,
        "0 10 * * *",
        "s3://bkt/in/{date_folder}/",
        "s3://bkt2/out/{date_folder}/",
        Operation::Copy,
    )
}

fn just_before_ten() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 5, 9, 59, 30).unwrap()
}

#[tokio::test]
async fn test_tick_runs_due_pipeline_with_date_folder() {
    let fixture = Fixture::new();
    fixture.objects.insert("bkt", "in/20240305/a.csv", b"a".to_vec()).await;
    fixture.objects.insert("bkt", "in/20240304/old.csv", b"o".to_vec()).await;

    let scheduler = fixture.scheduler(vec![daily_at_ten("orders")]);
    let executions = scheduler.run_tick(just_before_ten()).await;

    assert_eq!(executions.len(), 1);
    let execution = &executions[0];
    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(execution.source_path, "s3://bkt/in/20240305/");
    assert_eq!(execution.target_path, "s3://bkt2/out/20240305/");
    assert_eq!(execution.target_files, vec!["s3://bkt2/out/20240305/a.csv"]);
    assert_eq!(fixture.objects.keys("bkt2").await, vec!["out/20240305/a.csv"]);
}

#[tokio::test]
async fn test_tick_skips_pipelines_not_due() {
    let fixture = Fixture::new();
    let scheduler = fixture.scheduler(vec![daily_at_ten("orders")]);

    let early = Local.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
    assert!(scheduler.run_tick(early).await.is_empty());
    assert!(fixture.store.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_cron_does_not_block_others() {
    let fixture = Fixture::new();
    let mut broken = daily_at_ten("broken");
    broken.schedule = "every day at ten".to_string();

    let scheduler = fixture.scheduler(vec![broken, daily_at_ten("orders")]);
    let executions = scheduler.run_tick(just_before_ten()).await;

    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].pipeline_name, "orders");
}

#[tokio::test]
async fn test_failed_pipeline_does_not_block_next() {
    let fixture = Fixture::new();
    fixture.objects.insert("bkt", "in/20240305/a.csv", b"a".to_vec()).await;

    let missing = PipelineDefinition::new(
        "missing",
        "0 10 * * *",
        "/definitely/not/here/{date_folder}/",
        "s3://bkt2/out/",
        Operation::Move,
    );
    let scheduler = fixture.scheduler(vec![missing, daily_at_ten("orders")]);
    let executions = scheduler.run_tick(just_before_ten()).await;

    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0].status, ExecutionStatus::Failed);
    assert_eq!(executions[1].status, ExecutionStatus::Success);
    assert_eq!(fixture.store.find_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_execute_by_name() {
    let fixture = Fixture::new();
    fixture.objects.insert("bkt", "static/a.csv", b"a".to_vec()).await;
    let pipeline = PipelineDefinition::new(
        "static",
        "0 0 1 1 *",
        "s3://bkt/static/",
        "s3://bkt/copy/",
        Operation::Copy,
    );

    let scheduler = fixture.scheduler(vec![pipeline]);
    let execution = scheduler.execute_by_name("static").await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(execution.files_processed, 1);
    assert_eq!(
        fixture.store.find_by_pipeline_name("static").await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_execute_by_name_unknown() {
    let fixture = Fixture::new();
    let scheduler = fixture.scheduler(vec![daily_at_ten("orders")]);

    let err = scheduler.execute_by_name("nope").await.unwrap_err();
    assert!(matches!(err, SchedulerError::PipelineNotFound(ref name) if name == "nope"));
    assert!(fixture.store.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scheduler_shutdown() {
    let fixture = Fixture::new();
    let scheduler = Arc::new(
        fixture
            .scheduler(Vec::new())
            .with_poll_interval(Duration::from_millis(20)),
    );
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(scheduler.clone().run(rx));
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
    assert!(result.is_ok(), "scheduler did not stop");
}

#[test]
fn test_builder_settings() {
    let fixture = Fixture::new();
    let scheduler = fixture
        .scheduler(vec![daily_at_ten("orders")])
        .with_poll_interval(Duration::from_secs(30))
        .with_window(chrono::Duration::seconds(90));

    assert_eq!(scheduler.poll_interval, Duration::from_secs(30));
    assert_eq!(scheduler.window, chrono::Duration::seconds(90));
    assert!(scheduler.find_pipeline("orders").is_some());
    assert!(scheduler.find_pipeline("other").is_none());
}
