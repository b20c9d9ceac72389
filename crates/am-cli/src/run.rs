use crate::ts_prefix;
use am_local_db::{Database, RunFilter, RunStore};
use anyhow::Result;
use clap::Args;

/// Arguments for logging an agent run.
#[derive(Args)]
pub struct LogRunArgs {
    /// Name of the agent that ran
    #[arg(long = "agent", value_name = "NAME")]
    pub agent: String,

    /// What the agent did
    #[arg(long = "action", value_name = "TEXT")]
    pub action: String,

    /// Task this run belongs to (must exist)
    #[arg(long = "task-id", value_name = "ID")]
    pub task_id: Option<String>,

    /// Run result; anything other than "pending" marks the run completed
    #[arg(long = "result", value_name = "RESULT", default_value = "pending")]
    pub result: String,

    /// Session grouping label
    #[arg(long = "session-id", value_name = "ID")]
    pub session_id: Option<String>,

    /// Free-text notes
    #[arg(long = "notes", value_name = "TEXT")]
    pub notes: Option<String>,
}

impl LogRunArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        db.with_conn(|conn| {
            RunStore::new(conn).insert(
                &self.agent,
                &self.action,
                self.task_id.as_deref(),
                &self.result,
                self.session_id.as_deref(),
                self.notes.as_deref(),
            )
        })?;
        println!("run logged: {} / {} / {}", self.agent, self.action, self.result);
        Ok(())
    }
}

/// Arguments for listing recent agent runs.
#[derive(Args)]
pub struct ListRunsArgs {
    /// Only runs by this agent
    #[arg(long = "agent", value_name = "NAME")]
    pub agent: Option<String>,

    /// Only runs for this task
    #[arg(long = "task-id", value_name = "ID")]
    pub task_id: Option<String>,

    /// Only runs with this result
    #[arg(long = "result", value_name = "RESULT")]
    pub result: Option<String>,
}

impl ListRunsArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        let filter = RunFilter {
            agent: self.agent,
            task_id: self.task_id,
            result: self.result,
        };
        let runs = db.with_conn(|conn| RunStore::new(conn).list(&filter))?;
        if runs.is_empty() {
            println!("no runs");
            return Ok(());
        }
        for run in &runs {
            let task = run.task_id.as_deref().map(|t| format!("[{}]", t)).unwrap_or_default();
            let notes = run.notes.as_deref().map(|n| format!(" | {}", n)).unwrap_or_default();
            println!(
                "#{} {} {} {} -> {} ({}){}",
                run.id,
                run.agent,
                task,
                run.action,
                run.result,
                ts_prefix(&run.started_at, 10),
                notes
            );
        }
        Ok(())
    }
}
