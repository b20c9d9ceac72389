//! SQLite database management for local agent memory state.
//!
//! This crate provides persistent storage for tasks, agent runs, recurring
//! error patterns, and context snapshots using SQLite as the backing
//! database, plus the composite recovery view that reads across all four.

pub mod connection;
pub mod models;
pub mod schema;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for database operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("task '{id}' already exists")]
    AlreadyExists { id: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Create a new invalid-argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new not-found error. `what` names the missing entity,
    /// e.g. `task 'build-ui'`.
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a new generic database error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }
}

/// Database connection and management.
pub use connection::Database;

/// Database models and operations.
pub use models::{
    ErrorPatternRecord, ErrorQuery, ErrorStore, RecordOutcome, RecoveryReport, RunFilter,
    RunRecord, RunStore, SnapshotRecord, SnapshotStore, TaskFilter, TaskRecord, TaskStatus,
    TaskStore,
};
