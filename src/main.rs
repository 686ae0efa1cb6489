//! Ferry - scheduled data-movement pipelines
//!
//! Main entry point for the Ferry CLI and scheduler.

mod cli;
mod cmd_history;
mod cmd_run;

use std::path::PathBuf;

use clap::Parser;
use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use ferry_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};

use crate::cli::{Cli, Commands};

/// Initialize tracing with console and file output.
///
/// Log files are written to the configured directory with daily rotation.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = PathBuf::from(ConfigLoader::expand_path(&logging.directory));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("ferry")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes buffered lines on exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

/// Fail on validation errors and log warnings.
fn check_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    for warning in ConfigValidator::validate(config).into_result()? {
        warn!("Config warning at {}: {}", warning.path, warning.message);
    }
    Ok(())
}

/// Report every validation problem without starting anything.
fn validate_config(path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(path)?;
    let result = ConfigValidator::validate(&config);

    for error in &result.errors {
        println!("error   {}: {}", error.path, error.message);
    }
    for warning in &result.warnings {
        println!("warning {}: {}", warning.path, warning.message);
    }

    if result.is_valid() {
        println!(
            "{} is valid ({} pipelines)",
            path.display(),
            config.pipelines.len()
        );
        Ok(())
    } else {
        Err(format!("{} has {} errors", path.display(), result.errors.len()).into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Validate) = cli.command {
        return validate_config(&cli.config);
    }

    let config = ConfigLoader::load(&cli.config)?;
    init_tracing(&config.logging)?;
    check_config(&config)?;

    match cli.command {
        None | Some(Commands::Run) => cmd_run::run_scheduler(config).await,
        Some(Commands::Exec { pipeline }) => cmd_run::exec_pipeline(config, &pipeline).await,
        Some(Commands::History {
            id,
            pipeline,
            from,
            to,
            by_end_time,
            format,
        }) => {
            let query = cmd_history::HistoryQuery {
                id,
                pipeline,
                range: from.zip(to),
                by_end_time,
            };
            cmd_history::show_history(&config, query, format).await
        }
        Some(Commands::Validate) => validate_config(&cli.config),
    }
}
