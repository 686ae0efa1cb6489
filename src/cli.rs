//! CLI definitions for Ferry.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

/// Ferry CLI.
#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Scheduled data-movement pipelines")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config/ferry.toml",
        env = "FERRY_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the scheduler loop in foreground (default)
    Run,

    /// Execute one pipeline immediately, ignoring its schedule
    Exec {
        /// Pipeline name
        pipeline: String,
    },

    /// Check the configuration file and report problems
    Validate,

    /// Show persisted execution records
    History {
        /// Show a single record
        #[arg(long, conflicts_with_all = ["pipeline", "from", "to"])]
        id: Option<i64>,

        /// Only records of this pipeline
        #[arg(long)]
        pipeline: Option<String>,

        /// Range start (RFC 3339)
        #[arg(long, requires = "to")]
        from: Option<DateTime<Utc>>,

        /// Range end (RFC 3339)
        #[arg(long, requires = "from")]
        to: Option<DateTime<Utc>>,

        /// Match the range against end time instead of start time
        #[arg(long)]
        by_end_time: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}
