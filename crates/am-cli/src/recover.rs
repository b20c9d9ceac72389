use crate::ts_prefix;
use am_local_db::{Database, RecoveryReport};
use anyhow::Result;
use clap::Args;

/// Arguments for the one-shot recovery report.
#[derive(Args)]
pub struct RecoverArgs {}

impl RecoverArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        let report = db.recover()?;
        print!("{}", render(&report));
        Ok(())
    }
}

/// Render the report compactly. Every section is present even when empty so
/// the output shape is stable for agents that parse it.
fn render(report: &RecoveryReport) -> String {
    let mut out = String::new();

    out.push_str("=TASKS\n");
    if report.active_tasks.is_empty() {
        out.push_str("  none\n");
    }
    for task in &report.active_tasks {
        let summary = task.summary.as_deref().map(|s| format!(" {}", s)).unwrap_or_default();
        out.push_str(&format!("  {}: {}{}\n", task.id, task.title, summary));
    }

    out.push_str("=SNAPSHOT\n");
    match &report.latest_snapshot {
        Some(snap) => {
            out.push_str(&format!(
                "  session={} at={}\n",
                snap.session_id.as_deref().unwrap_or("-"),
                ts_prefix(&snap.created_at, 16)
            ));
            if let Some(work) = snap.current_work.as_deref() {
                out.push_str(&format!("  work: {}\n", work));
            }
            if let Some(pending) = snap.pending_items.as_deref() {
                out.push_str(&format!("  pending: {}\n", pending));
            }
            if let Some(notes) = snap.notes.as_deref() {
                out.push_str(&format!("  notes: {}\n", notes));
            }
        }
        None => out.push_str("  none\n"),
    }

    out.push_str("=RUNS\n");
    if report.recent_runs.is_empty() {
        out.push_str("  none\n");
    }
    for run in &report.recent_runs {
        let task = run.task_id.as_deref().map(|t| format!("[{}]", t)).unwrap_or_default();
        out.push_str(&format!(
            "  {} {} {} -> {} ({})\n",
            run.agent,
            task,
            run.action,
            run.result,
            ts_prefix(&run.started_at, 10)
        ));
    }

    out.push_str("=ERRORS\n");
    if report.recent_errors.is_empty() {
        out.push_str("  none\n");
    }
    for error in &report.recent_errors {
        let sol = error.solution.as_deref().map(|s| format!(" -> {}", s)).unwrap_or_default();
        out.push_str(&format!("  x{} {}{}\n", error.occurrences, error.pattern, sol));
    }

    out
}
