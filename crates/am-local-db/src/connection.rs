//! Database connection management.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::models::RecoveryReport;

/// Database connection wrapper. One instance owns one connection for one
/// unit of work; dropping it releases the connection on every exit path.
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<std::sync::Mutex<Connection>>,
}

impl Database {
    /// Get the default database path based on the AM_HOME environment
    /// variable or platform defaults.
    ///
    /// Priority order:
    /// 1. AM_HOME environment variable (custom)
    /// 2. Platform-specific defaults:
    ///    - Linux: `${XDG_STATE_HOME:-~/.local/state}/agent-memory/memory.db`
    ///    - macOS: `~/Library/Application Support/agent-memory/memory.db`
    ///    - Windows: `%LOCALAPPDATA%\agent-memory\memory.db`
    ///
    /// An explicitly supplied path (`Database::open`) always wins over this
    /// default; the default is only a convenience for the CLI entry point.
    pub fn default_path() -> crate::Result<PathBuf> {
        if let Ok(am_home) = std::env::var("AM_HOME") {
            return Ok(PathBuf::from(am_home).join("memory.db"));
        }

        #[cfg(target_os = "linux")]
        {
            let xdg_state_home = match std::env::var("XDG_STATE_HOME") {
                Ok(dir) => PathBuf::from(dir),
                Err(_) => {
                    let home = std::env::var("HOME")
                        .map_err(|_| crate::Error::generic("HOME environment variable not set"))?;
                    PathBuf::from(home).join(".local").join("state")
                }
            };
            Ok(xdg_state_home.join("agent-memory").join("memory.db"))
        }

        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME")
                .map_err(|_| crate::Error::generic("HOME environment variable not set"))?;
            Ok(PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("agent-memory")
                .join("memory.db"))
        }

        #[cfg(target_os = "windows")]
        {
            let local_appdata = std::env::var("LOCALAPPDATA")
                .map_err(|_| crate::Error::generic("LOCALAPPDATA environment variable not set"))?;
            Ok(PathBuf::from(local_appdata).join("agent-memory").join("memory.db"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let home = std::env::var("HOME")
                .map_err(|_| crate::Error::generic("HOME environment variable not set"))?;
            Ok(PathBuf::from(home).join(".agent-memory").join("memory.db"))
        }
    }

    /// Open the database at the default path, creating parent directories
    /// as needed.
    pub fn open_default() -> crate::Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(&path)
    }

    /// Open a new database connection at the specified path.
    ///
    /// If the path doesn't exist, the database will be created.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            connection: Arc::new(std::sync::Mutex::new(conn)),
        })
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            connection: Arc::new(std::sync::Mutex::new(conn)),
        })
    }

    /// Initialize the database schema. Idempotent: safe to run on every open.
    fn initialize_schema(conn: &Connection) -> crate::Result<()> {
        // SQLite ships with foreign-key enforcement off; agent_runs.task_id
        // relies on it to reject inserts referencing a missing task.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(crate::schema::CREATE_TABLES)?;
        debug!(
            tables = ?[
                crate::schema::TABLE_TASKS,
                crate::schema::TABLE_AGENT_RUNS,
                crate::schema::TABLE_ERROR_PATTERNS,
                crate::schema::TABLE_CONTEXT_SNAPSHOTS,
            ],
            "schema ensured"
        );
        Ok(())
    }

    /// Run `f` with the locked connection. Store types borrow the connection
    /// for the duration of one operation.
    pub fn with_conn<F, T>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&Connection) -> crate::Result<T>,
    {
        let conn = self
            .connection
            .lock()
            .map_err(|e| crate::Error::generic(format!("Failed to acquire database lock: {}", e)))?;
        f(&conn)
    }

    /// Assemble the composite recovery report from four independent reads.
    /// No transaction spans them; the report is a best-effort snapshot.
    pub fn recover(&self) -> crate::Result<RecoveryReport> {
        self.with_conn(RecoveryReport::gather)
    }
}
