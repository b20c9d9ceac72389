use crate::ts_prefix;
use am_local_db::{Database, SnapshotRecord, SnapshotStore};
use anyhow::Result;
use clap::Args;

/// Arguments for saving a context snapshot.
#[derive(Args)]
pub struct SaveSnapshotArgs {
    /// Session grouping label
    #[arg(long = "session-id", value_name = "ID")]
    pub session_id: Option<String>,

    /// What is being worked on right now
    #[arg(long = "current-work", value_name = "TEXT")]
    pub current_work: Option<String>,

    /// What remains to be done
    #[arg(long = "pending", value_name = "TEXT")]
    pub pending: Option<String>,

    /// JSON array of active task ids, stored verbatim
    #[arg(long = "active-tasks", value_name = "JSON")]
    pub active_tasks: Option<String>,

    /// Free-text notes
    #[arg(long = "notes", value_name = "TEXT")]
    pub notes: Option<String>,
}

impl SaveSnapshotArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        db.with_conn(|conn| {
            SnapshotStore::new(conn).insert(
                self.session_id.as_deref(),
                self.current_work.as_deref(),
                self.pending.as_deref(),
                self.active_tasks.as_deref(),
                self.notes.as_deref(),
            )
        })?;
        println!("snapshot saved: session={}", self.session_id.as_deref().unwrap_or("-"));
        Ok(())
    }
}

/// Arguments for showing the latest snapshot overall.
#[derive(Args)]
pub struct LatestSnapshotArgs {}

impl LatestSnapshotArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        let snapshot = db.with_conn(|conn| SnapshotStore::new(conn).latest())?;
        print_snapshot(snapshot.as_ref());
        Ok(())
    }
}

/// Arguments for showing the latest snapshot for one session.
#[derive(Args)]
pub struct SnapshotBySessionArgs {
    /// Session grouping label
    #[arg(long = "session-id", value_name = "ID")]
    pub session_id: String,
}

impl SnapshotBySessionArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        let snapshot =
            db.with_conn(|conn| SnapshotStore::new(conn).latest_for_session(&self.session_id))?;
        print_snapshot(snapshot.as_ref());
        Ok(())
    }
}

fn print_snapshot(snapshot: Option<&SnapshotRecord>) {
    let Some(s) = snapshot else {
        println!("no snapshot");
        return;
    };
    println!(
        "snapshot #{} @ {} session={}",
        s.id,
        ts_prefix(&s.created_at, 16),
        s.session_id.as_deref().unwrap_or("-")
    );
    if let Some(raw) = s.active_tasks.as_deref() {
        println!("  active: {}", render_active_tasks(raw));
    }
    if let Some(work) = s.current_work.as_deref() {
        println!("  work: {}", work);
    }
    if let Some(pending) = s.pending_items.as_deref() {
        println!("  pending: {}", pending);
    }
    if let Some(notes) = s.notes.as_deref() {
        println!("  notes: {}", notes);
    }
}

/// Pretty-print the stored JSON array as a comma-separated list. The value
/// was validated at save time; on a parse failure fall back to the raw text.
fn render_active_tasks(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        _ => raw.to_string(),
    }
}
