//! Database schema definitions and constants.

// Table names
pub const TABLE_TASKS: &str = "tasks";
pub const TABLE_AGENT_RUNS: &str = "agent_runs";
pub const TABLE_ERROR_PATTERNS: &str = "error_patterns";
pub const TABLE_CONTEXT_SNAPSHOTS: &str = "context_snapshots";

/// Idempotent schema batch. Every statement is CREATE TABLE IF NOT EXISTS,
/// so running it on every open is side-effect-free. There is no schema
/// version table; evolution beyond additive create-if-absent is out of scope.
pub const CREATE_TABLES: &str = r#"
-- Units of ongoing or completed work. Ids are caller-supplied and immutable.
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    taskinfo_path TEXT,
    summary TEXT
);

-- Append-only log of agent invocations, optionally tied to a task.
CREATE TABLE IF NOT EXISTS agent_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id TEXT REFERENCES tasks(id),
    agent TEXT NOT NULL,
    action TEXT NOT NULL,
    result TEXT NOT NULL DEFAULT 'pending',
    session_id TEXT,
    started_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    completed_at TEXT,
    notes TEXT
);

-- Deduplicated, frequency-counted error signatures. The pattern column is
-- the dedup key at the application level (lookup-before-insert), not UNIQUE.
CREATE TABLE IF NOT EXISTS error_patterns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pattern TEXT NOT NULL,
    context TEXT,
    solution TEXT,
    occurrences INTEGER NOT NULL DEFAULT 1,
    first_seen TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    last_seen TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
);

-- Append-only point-in-time captures of agent state.
CREATE TABLE IF NOT EXISTS context_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    active_tasks TEXT,
    current_work TEXT,
    pending_items TEXT,
    notes TEXT
);
"#;
