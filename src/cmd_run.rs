//! Scheduler and on-demand execution handlers for Ferry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use ferry_config::{Config, ConfigLoader, StoreBackend, StoreConfig};
use ferry_scheduler::{
    ExecutionStore, ExecutionTracker, MemoryExecutionStore, PipelineScheduler, SchedulerError,
    SqliteExecutionStore,
};
use ferry_storage::{S3ObjectStore, S3Settings, Storage};

/// Open the configured execution store.
pub(crate) async fn open_store(
    config: &StoreConfig,
) -> Result<Arc<dyn ExecutionStore>, SchedulerError> {
    match config.backend {
        StoreBackend::Sqlite => {
            let path = ConfigLoader::expand_path(&config.path);
            info!("Execution store: sqlite at {}", path);
            Ok(Arc::new(SqliteExecutionStore::open(path).await?))
        }
        StoreBackend::Memory => {
            info!("Execution store: in-memory (records are lost on exit)");
            Ok(Arc::new(MemoryExecutionStore::new()))
        }
    }
}

/// Wire storage, store and tracker into a scheduler.
async fn build_scheduler(config: &Config) -> Result<PipelineScheduler, SchedulerError> {
    let store = open_store(&config.store).await?;

    let object_store = S3ObjectStore::new(S3Settings {
        region: config.storage.region.clone(),
        endpoint_url: config.storage.endpoint_url.clone(),
        force_path_style: config.storage.force_path_style,
    });
    let storage = Storage::with_object_store(Arc::new(object_store));

    let tracker = ExecutionTracker::new(storage, store)
        .with_max_concurrent_items(config.storage.max_concurrent_items);

    Ok(PipelineScheduler::new(config.pipelines.clone(), tracker)
        .with_poll_interval(Duration::from_secs(config.scheduler.poll_interval_secs))
        .with_window(chrono::Duration::seconds(
            config.scheduler.window_secs as i64,
        )))
}

/// Run the scheduler loop until Ctrl-C.
pub(crate) async fn run_scheduler(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Ferry v{}", env!("CARGO_PKG_VERSION"));

    let scheduler = Arc::new(build_scheduler(&config).await?);
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(scheduler.run(cancel_rx));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    let _ = cancel_tx.send(true);
    handle.await?;

    info!("Ferry stopped");
    Ok(())
}

/// Run one pipeline now and print its record.
pub(crate) async fn exec_pipeline(
    config: Config,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = build_scheduler(&config).await?;

    match scheduler.execute_by_name(name).await {
        Ok(execution) => {
            println!("{}", serde_json::to_string_pretty(&execution)?);
            Ok(())
        }
        Err(e) => {
            if let Some(execution) = e.execution() {
                println!("{}", serde_json::to_string_pretty(execution)?);
            }
            error!("Execution of '{}' failed: {}", name, e);
            Err(e.into())
        }
    }
}
