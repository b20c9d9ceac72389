//! Database models and persistence operations.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Current UTC time in the same text format the SQL column defaults produce,
/// so Rust-written and SQL-defaulted timestamps sort together.
fn now_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Status of a task in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task is being worked on. The default for new tasks.
    Active,
    /// Task finished successfully.
    Completed,
    /// Task is parked but expected to resume.
    Paused,
    /// Task was abandoned.
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
            TaskStatus::Paused => "paused",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TaskStatus::Active),
            "completed" => Ok(TaskStatus::Completed),
            "paused" => Ok(TaskStatus::Paused),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(crate::Error::invalid_argument(format!(
                "invalid status '{}'. valid: active, cancelled, completed, paused",
                other
            ))),
        }
    }
}

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().and_then(|s| s.parse().map_err(|_| FromSqlError::InvalidType))
    }
}

/// Database model for tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
    pub taskinfo_path: Option<String>,
    pub summary: Option<String>,
}

/// Database model for agent runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i64,
    pub task_id: Option<String>,
    pub agent: String,
    pub action: String,
    pub result: String,
    pub session_id: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub notes: Option<String>,
}

/// Database model for error patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPatternRecord {
    pub id: i64,
    pub pattern: String,
    pub context: Option<String>,
    pub solution: Option<String>,
    pub occurrences: i64,
    pub first_seen: String,
    pub last_seen: String,
}

/// Database model for context snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: i64,
    pub session_id: Option<String>,
    pub created_at: String,
    pub active_tasks: Option<String>,
    pub current_work: Option<String>,
    pub pending_items: Option<String>,
    pub notes: Option<String>,
}

/// Which tasks a listing should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFilter {
    /// Only active tasks. The default.
    Active,
    /// Every task regardless of status.
    All,
    /// Tasks with exactly this status.
    Status(TaskStatus),
}

impl Default for TaskFilter {
    fn default() -> Self {
        TaskFilter::Active
    }
}

/// Database operations for tasks.
pub struct TaskStore<'a> {
    conn: &'a Connection,
}

impl<'a> TaskStore<'a> {
    const SELECT: &'static str =
        "SELECT id, title, status, created_at, updated_at, taskinfo_path, summary FROM tasks";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new task with status `active`. The id is caller-supplied and
    /// must be non-empty and not already present.
    pub fn insert(
        &self,
        id: &str,
        title: &str,
        summary: Option<&str>,
        taskinfo_path: Option<&str>,
    ) -> crate::Result<()> {
        if id.trim().is_empty() {
            return Err(crate::Error::invalid_argument("task id cannot be empty"));
        }

        let result = self.conn.execute(
            r#"
            INSERT INTO tasks (id, title, summary, taskinfo_path)
            VALUES (?, ?, ?, ?)
            "#,
            params![id, title, summary, taskinfo_path],
        );

        match result {
            Ok(_) => {
                debug!(id, "task added");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(crate::Error::AlreadyExists { id: id.to_string() })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Update only the supplied fields of an existing task and refresh
    /// `updated_at`. Title and id are immutable.
    pub fn update(
        &self,
        id: &str,
        status: Option<TaskStatus>,
        summary: Option<&str>,
        taskinfo_path: Option<&str>,
    ) -> crate::Result<()> {
        let mut sets: Vec<&str> = Vec::new();
        let mut vals: Vec<Value> = Vec::new();

        if let Some(status) = status {
            sets.push("status = ?");
            vals.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(summary) = summary {
            sets.push("summary = ?");
            vals.push(Value::Text(summary.to_string()));
        }
        if let Some(path) = taskinfo_path {
            sets.push("taskinfo_path = ?");
            vals.push(Value::Text(path.to_string()));
        }
        if sets.is_empty() {
            return Err(crate::Error::invalid_argument("nothing to update"));
        }

        sets.push("updated_at = ?");
        vals.push(Value::Text(now_utc()));
        vals.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        let changed = self.conn.execute(&sql, params_from_iter(vals))?;
        if changed == 0 {
            return Err(crate::Error::not_found(format!("task '{}'", id)));
        }
        debug!(id, "task updated");
        Ok(())
    }

    pub fn get(&self, id: &str) -> crate::Result<Option<TaskRecord>> {
        let mut stmt = self.conn.prepare(&format!("{} WHERE id = ?", Self::SELECT))?;
        let mut rows = stmt.query_map(params![id], Self::from_row)?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// List tasks matching the filter, most recently touched first.
    pub fn list(&self, filter: &TaskFilter) -> crate::Result<Vec<TaskRecord>> {
        let order = "ORDER BY updated_at DESC";
        let mut tasks = Vec::new();

        match filter {
            TaskFilter::All => {
                let mut stmt = self.conn.prepare(&format!("{} {}", Self::SELECT, order))?;
                let records = stmt.query_map(params![], Self::from_row)?;
                for record in records {
                    tasks.push(record?);
                }
            }
            TaskFilter::Active => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{} WHERE status = 'active' {}", Self::SELECT, order))?;
                let records = stmt.query_map(params![], Self::from_row)?;
                for record in records {
                    tasks.push(record?);
                }
            }
            TaskFilter::Status(status) => {
                let mut stmt =
                    self.conn.prepare(&format!("{} WHERE status = ? {}", Self::SELECT, order))?;
                let records = stmt.query_map(params![status], Self::from_row)?;
                for record in records {
                    tasks.push(record?);
                }
            }
        }

        Ok(tasks)
    }

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<TaskRecord> {
        Ok(TaskRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            status: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            taskinfo_path: row.get(5)?,
            summary: row.get(6)?,
        })
    }
}

/// Optional conjunctive filters for listing agent runs.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub agent: Option<String>,
    pub task_id: Option<String>,
    pub result: Option<String>,
}

/// Database operations for agent runs. The log is append-only: rows are
/// never updated or deleted.
pub struct RunStore<'a> {
    conn: &'a Connection,
}

impl<'a> RunStore<'a> {
    const SELECT: &'static str = "SELECT id, task_id, agent, action, result, session_id, \
                                  started_at, completed_at, notes FROM agent_runs";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Log one agent invocation. `completed_at` is set at insert time only
    /// when the supplied result is already non-pending; a pending run leaves
    /// it unset even though `started_at` is recorded.
    pub fn insert(
        &self,
        agent: &str,
        action: &str,
        task_id: Option<&str>,
        result: &str,
        session_id: Option<&str>,
        notes: Option<&str>,
    ) -> crate::Result<i64> {
        let completed_at = if result != "pending" { Some(now_utc()) } else { None };

        let inserted = self.conn.execute(
            r#"
            INSERT INTO agent_runs (task_id, agent, action, result, session_id, completed_at, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![task_id, agent, action, result, session_id, completed_at, notes],
        );

        match inserted {
            Ok(_) => {
                debug!(agent, action, result, "run logged");
                Ok(self.conn.last_insert_rowid())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(crate::Error::not_found(format!("task '{}'", task_id.unwrap_or(""))))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The 10 most recent runs matching every supplied filter.
    pub fn list(&self, filter: &RunFilter) -> crate::Result<Vec<RunRecord>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut vals: Vec<Value> = Vec::new();

        if let Some(agent) = &filter.agent {
            clauses.push("agent = ?");
            vals.push(Value::Text(agent.clone()));
        }
        if let Some(task_id) = &filter.task_id {
            clauses.push("task_id = ?");
            vals.push(Value::Text(task_id.clone()));
        }
        if let Some(result) = &filter.result {
            clauses.push("result = ?");
            vals.push(Value::Text(result.clone()));
        }

        let clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!("{} {} ORDER BY id DESC LIMIT 10", Self::SELECT, clause);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt.query_map(params_from_iter(vals), Self::from_row)?;

        let mut runs = Vec::new();
        for record in records {
            runs.push(record?);
        }
        Ok(runs)
    }

    /// The `limit` most recent runs with no filter, for the recovery report.
    pub fn recent(&self, limit: u32) -> crate::Result<Vec<RunRecord>> {
        let sql = format!("{} ORDER BY id DESC LIMIT ?", Self::SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt.query_map(params![limit], Self::from_row)?;

        let mut runs = Vec::new();
        for record in records {
            runs.push(record?);
        }
        Ok(runs)
    }

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            task_id: row.get(1)?,
            agent: row.get(2)?,
            action: row.get(3)?,
            result: row.get(4)?,
            session_id: row.get(5)?,
            started_at: row.get(6)?,
            completed_at: row.get(7)?,
            notes: row.get(8)?,
        })
    }
}

/// Result of recording an error pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First report of this pattern; a new record was inserted.
    Added,
    /// Repeat report folded into the existing record.
    Deduplicated { occurrences: i64 },
}

/// Which error patterns a query should return. Exactly one mode is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorQuery {
    /// The N most recently seen patterns.
    Recent(u32),
    /// Substring match against pattern, context, and solution.
    Search(String),
    /// The 10 most frequent patterns. The default.
    Top,
}

/// Database operations for error patterns.
pub struct ErrorStore<'a> {
    conn: &'a Connection,
}

impl<'a> ErrorStore<'a> {
    const SELECT: &'static str = "SELECT id, pattern, context, solution, occurrences, \
                                  first_seen, last_seen FROM error_patterns";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Upsert keyed on exact `pattern`, implemented as read-then-branch.
    /// A repeat report always increments `occurrences` and refreshes
    /// `last_seen`; context and solution are first-write-wins per field.
    /// Not atomic against concurrent identical-pattern writers; the store
    /// assumes a single writer.
    pub fn record(
        &self,
        pattern: &str,
        context: Option<&str>,
        solution: Option<&str>,
    ) -> crate::Result<RecordOutcome> {
        if let Some(existing) = self.get_by_pattern(pattern)? {
            let context = keep_or_fill(existing.context, context);
            let solution = keep_or_fill(existing.solution, solution);
            self.conn.execute(
                r#"
                UPDATE error_patterns
                SET occurrences = occurrences + 1, last_seen = ?, context = ?, solution = ?
                WHERE id = ?
                "#,
                params![now_utc(), context, solution, existing.id],
            )?;
            let occurrences = existing.occurrences + 1;
            debug!(pattern, occurrences, "error pattern deduplicated");
            Ok(RecordOutcome::Deduplicated { occurrences })
        } else {
            self.conn.execute(
                r#"
                INSERT INTO error_patterns (pattern, context, solution)
                VALUES (?, ?, ?)
                "#,
                params![pattern, context, solution],
            )?;
            debug!(pattern, "error pattern added");
            Ok(RecordOutcome::Added)
        }
    }

    pub fn get_by_pattern(&self, pattern: &str) -> crate::Result<Option<ErrorPatternRecord>> {
        let mut stmt = self.conn.prepare(&format!("{} WHERE pattern = ?", Self::SELECT))?;
        let mut rows = stmt.query_map(params![pattern], Self::from_row)?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn query(&self, query: &ErrorQuery) -> crate::Result<Vec<ErrorPatternRecord>> {
        let mut patterns = Vec::new();

        match query {
            ErrorQuery::Recent(limit) => {
                let sql = format!("{} ORDER BY last_seen DESC LIMIT ?", Self::SELECT);
                let mut stmt = self.conn.prepare(&sql)?;
                let records = stmt.query_map(params![limit], Self::from_row)?;
                for record in records {
                    patterns.push(record?);
                }
            }
            ErrorQuery::Search(text) => {
                let sql = format!(
                    "{} WHERE pattern LIKE ? OR context LIKE ? OR solution LIKE ? \
                     ORDER BY occurrences DESC",
                    Self::SELECT
                );
                let needle = format!("%{}%", text);
                let mut stmt = self.conn.prepare(&sql)?;
                let records = stmt.query_map(params![needle, needle, needle], Self::from_row)?;
                for record in records {
                    patterns.push(record?);
                }
            }
            ErrorQuery::Top => {
                let sql = format!("{} ORDER BY occurrences DESC LIMIT 10", Self::SELECT);
                let mut stmt = self.conn.prepare(&sql)?;
                let records = stmt.query_map(params![], Self::from_row)?;
                for record in records {
                    patterns.push(record?);
                }
            }
        }

        Ok(patterns)
    }

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<ErrorPatternRecord> {
        Ok(ErrorPatternRecord {
            id: row.get(0)?,
            pattern: row.get(1)?,
            context: row.get(2)?,
            solution: row.get(3)?,
            occurrences: row.get(4)?,
            first_seen: row.get(5)?,
            last_seen: row.get(6)?,
        })
    }
}

/// First write wins: keep a non-empty stored value, otherwise fill from the
/// new report.
fn keep_or_fill(existing: Option<String>, new: Option<&str>) -> Option<String> {
    match existing {
        Some(v) if !v.is_empty() => Some(v),
        _ => new.map(str::to_string),
    }
}

/// Database operations for context snapshots. Append-only: saving never
/// updates in place, history is cumulative.
pub struct SnapshotStore<'a> {
    conn: &'a Connection,
}

impl<'a> SnapshotStore<'a> {
    const SELECT: &'static str = "SELECT id, session_id, created_at, active_tasks, current_work, \
                                  pending_items, notes FROM context_snapshots";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new snapshot. `active_tasks`, when supplied, must be a JSON
    /// array; it is validated before any write and stored verbatim.
    pub fn insert(
        &self,
        session_id: Option<&str>,
        current_work: Option<&str>,
        pending_items: Option<&str>,
        active_tasks: Option<&str>,
        notes: Option<&str>,
    ) -> crate::Result<i64> {
        if let Some(raw) = active_tasks {
            let parsed: Result<serde_json::Value, _> = serde_json::from_str(raw);
            if !parsed.map(|v| v.is_array()).unwrap_or(false) {
                return Err(crate::Error::invalid_argument(
                    "active tasks must be a valid JSON array",
                ));
            }
        }

        self.conn.execute(
            r#"
            INSERT INTO context_snapshots (session_id, active_tasks, current_work, pending_items, notes)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![session_id, active_tasks, current_work, pending_items, notes],
        )?;
        debug!(session_id, "snapshot saved");
        Ok(self.conn.last_insert_rowid())
    }

    /// The most recent snapshot overall, or None if the table is empty.
    pub fn latest(&self) -> crate::Result<Option<SnapshotRecord>> {
        let sql = format!("{} ORDER BY id DESC LIMIT 1", Self::SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![], Self::from_row)?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// The most recent snapshot for one session, or None if no match.
    pub fn latest_for_session(&self, session_id: &str) -> crate::Result<Option<SnapshotRecord>> {
        let sql = format!("{} WHERE session_id = ? ORDER BY id DESC LIMIT 1", Self::SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![session_id], Self::from_row)?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<SnapshotRecord> {
        Ok(SnapshotRecord {
            id: row.get(0)?,
            session_id: row.get(1)?,
            created_at: row.get(2)?,
            active_tasks: row.get(3)?,
            current_work: row.get(4)?,
            pending_items: row.get(5)?,
            notes: row.get(6)?,
        })
    }
}

/// Compact cross-entity view for one-shot context recovery. Assembled from
/// four independent reads with no spanning transaction; each section is
/// empty-safe on its own.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    pub active_tasks: Vec<TaskRecord>,
    pub latest_snapshot: Option<SnapshotRecord>,
    pub recent_runs: Vec<RunRecord>,
    pub recent_errors: Vec<ErrorPatternRecord>,
}

impl RecoveryReport {
    /// How many recent runs the report includes.
    pub const RECENT_RUNS: u32 = 5;
    /// How many recently seen error patterns the report includes.
    pub const RECENT_ERRORS: u32 = 3;

    pub fn gather(conn: &Connection) -> crate::Result<Self> {
        Ok(Self {
            active_tasks: TaskStore::new(conn).list(&TaskFilter::Active)?,
            latest_snapshot: SnapshotStore::new(conn).latest()?,
            recent_runs: RunStore::new(conn).recent(Self::RECENT_RUNS)?,
            recent_errors: ErrorStore::new(conn).query(&ErrorQuery::Recent(Self::RECENT_ERRORS))?,
        })
    }
}
