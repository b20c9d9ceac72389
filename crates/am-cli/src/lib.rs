//! Agent memory CLI library.

pub mod errors;
pub mod recover;
pub mod run;
pub mod snapshot;
pub mod task;

use am_local_db::Database;
use std::path::PathBuf;

// Re-export CLI types for testing
pub use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "am")]
#[command(about = "Agent memory CLI - durable index of tasks, runs, errors, and context")]
#[command(version, author, long_about = None)]
pub struct Cli {
    /// Path to the memory database file (defaults to the platform state dir)
    #[arg(long = "db-path", value_name = "PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks (active by default)
    ListTasks(task::ListTasksArgs),
    /// Add a new task
    AddTask(task::AddTaskArgs),
    /// Update an existing task's status, summary, or taskinfo path
    UpdateTask(task::UpdateTaskArgs),
    /// Log an agent run
    LogRun(run::LogRunArgs),
    /// List the 10 most recent agent runs
    ListRuns(run::ListRunsArgs),
    /// Record an error pattern (deduplicated by exact pattern)
    RecordError(errors::RecordErrorArgs),
    /// Query recorded error patterns
    QueryErrors(errors::QueryErrorsArgs),
    /// Save a context snapshot
    SaveSnapshot(snapshot::SaveSnapshotArgs),
    /// Show the latest context snapshot
    LatestSnapshot(snapshot::LatestSnapshotArgs),
    /// Show the latest snapshot for a session
    SnapshotBySession(snapshot::SnapshotBySessionArgs),
    /// Print a compact one-shot recovery report
    Recover(recover::RecoverArgs),
}

impl Commands {
    /// Execute the command against an opened database.
    pub fn run(self, db: &Database) -> anyhow::Result<()> {
        match self {
            Commands::ListTasks(args) => args.run(db),
            Commands::AddTask(args) => args.run(db),
            Commands::UpdateTask(args) => args.run(db),
            Commands::LogRun(args) => args.run(db),
            Commands::ListRuns(args) => args.run(db),
            Commands::RecordError(args) => args.run(db),
            Commands::QueryErrors(args) => args.run(db),
            Commands::SaveSnapshot(args) => args.run(db),
            Commands::LatestSnapshot(args) => args.run(db),
            Commands::SnapshotBySession(args) => args.run(db),
            Commands::Recover(args) => args.run(db),
        }
    }
}

/// First `len` characters of a stored timestamp, for compact listings.
pub(crate) fn ts_prefix(ts: &str, len: usize) -> &str {
    ts.get(..len).unwrap_or(ts)
}
