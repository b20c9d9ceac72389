use am_local_db::{Database, TaskFilter, TaskStatus, TaskStore};
use anyhow::Result;
use clap::Args;

/// Arguments for adding a new task.
#[derive(Args)]
pub struct AddTaskArgs {
    /// Task identifier (caller-supplied, must be unique)
    #[arg(value_name = "ID")]
    pub id: String,

    /// Task title
    #[arg(value_name = "TITLE")]
    pub title: String,

    /// Free-text summary
    #[arg(long = "summary", value_name = "TEXT")]
    pub summary: Option<String>,

    /// Reference to detail stored elsewhere
    #[arg(long = "taskinfo-path", value_name = "PATH")]
    pub taskinfo_path: Option<String>,
}

impl AddTaskArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        db.with_conn(|conn| {
            TaskStore::new(conn).insert(
                &self.id,
                &self.title,
                self.summary.as_deref(),
                self.taskinfo_path.as_deref(),
            )
        })?;
        println!("task added: {}", self.id);
        Ok(())
    }
}

/// Arguments for updating an existing task.
#[derive(Args)]
pub struct UpdateTaskArgs {
    /// Task identifier
    #[arg(value_name = "ID")]
    pub id: String,

    /// New status (active, completed, paused, cancelled)
    #[arg(long = "status", value_name = "STATUS")]
    pub status: Option<String>,

    /// New summary
    #[arg(long = "summary", value_name = "TEXT")]
    pub summary: Option<String>,

    /// New taskinfo path
    #[arg(long = "taskinfo-path", value_name = "PATH")]
    pub taskinfo_path: Option<String>,
}

impl UpdateTaskArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        // Status is validated before anything touches the database.
        let status = self.status.as_deref().map(str::parse::<TaskStatus>).transpose()?;
        db.with_conn(|conn| {
            TaskStore::new(conn).update(
                &self.id,
                status,
                self.summary.as_deref(),
                self.taskinfo_path.as_deref(),
            )
        })?;
        println!("task updated: {}", self.id);
        Ok(())
    }
}

/// Arguments for listing tasks.
#[derive(Args)]
pub struct ListTasksArgs {
    /// List every task regardless of status
    #[arg(long = "all")]
    pub all: bool,

    /// List only tasks with this status
    #[arg(long = "status", value_name = "STATUS", conflicts_with = "all")]
    pub status: Option<String>,
}

impl ListTasksArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        let filter = if self.all {
            TaskFilter::All
        } else if let Some(status) = self.status.as_deref() {
            TaskFilter::Status(status.parse()?)
        } else {
            TaskFilter::Active
        };

        let tasks = db.with_conn(|conn| TaskStore::new(conn).list(&filter))?;
        if tasks.is_empty() {
            println!("no tasks");
            return Ok(());
        }
        for task in &tasks {
            let summary = task.summary.as_deref().map(|s| format!(" | {}", s)).unwrap_or_default();
            println!("[{}] {}: {}{}", task.status, task.id, task.title, summary);
        }
        Ok(())
    }
}
