use am_local_db::{
    Database, Error, ErrorQuery, ErrorStore, RecordOutcome, RecoveryReport, RunFilter, RunStore,
    SnapshotStore, TaskFilter, TaskStatus, TaskStore,
};

fn memory_db() -> Database {
    Database::open_in_memory().unwrap()
}

#[test]
fn opening_the_same_store_twice_is_idempotent() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("memory.db");

    let db = Database::open(&path).unwrap();
    db.with_conn(|conn| TaskStore::new(conn).insert("t1", "Task", None, None)).unwrap();
    drop(db);

    // Second open re-runs the schema batch against existing tables.
    let db = Database::open(&path).unwrap();
    let task = db.with_conn(|conn| TaskStore::new(conn).get("t1")).unwrap().unwrap();
    assert_eq!(task.title, "Task");
}

#[test]
fn add_task_defaults_to_active() {
    let db = memory_db();
    db.with_conn(|conn| TaskStore::new(conn).insert("t1", "Task", Some("summary"), None)).unwrap();

    let task = db.with_conn(|conn| TaskStore::new(conn).get("t1")).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Active);
    assert_eq!(task.summary.as_deref(), Some("summary"));
    assert!(task.taskinfo_path.is_none());
}

#[test]
fn add_task_rejects_blank_id() {
    let db = memory_db();
    for id in ["", "   ", "\t\n"] {
        let err = db
            .with_conn(|conn| TaskStore::new(conn).insert(id, "Task", None, None))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }
}

#[test]
fn duplicate_task_id_leaves_existing_row_unmodified() {
    let db = memory_db();
    db.with_conn(|conn| TaskStore::new(conn).insert("t1", "Original", None, None)).unwrap();

    let err = db
        .with_conn(|conn| TaskStore::new(conn).insert("t1", "Replacement", Some("s"), None))
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));

    let task = db.with_conn(|conn| TaskStore::new(conn).get("t1")).unwrap().unwrap();
    assert_eq!(task.title, "Original");
    assert!(task.summary.is_none());
}

#[test]
fn update_with_no_fields_is_rejected_before_any_write() {
    let db = memory_db();
    db.with_conn(|conn| TaskStore::new(conn).insert("t1", "Task", None, None)).unwrap();
    let before = db.with_conn(|conn| TaskStore::new(conn).get("t1")).unwrap().unwrap();

    let err =
        db.with_conn(|conn| TaskStore::new(conn).update("t1", None, None, None)).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));

    let after = db.with_conn(|conn| TaskStore::new(conn).get("t1")).unwrap().unwrap();
    assert_eq!(after.updated_at, before.updated_at);
}

#[test]
fn update_refreshes_updated_at_and_only_supplied_fields() {
    let db = memory_db();
    db.with_conn(|conn| {
        let store = TaskStore::new(conn);
        store.insert("t1", "Task", Some("keep me"), None)?;
        // Pin updated_at to a known old value so the refresh is observable.
        conn.execute("UPDATE tasks SET updated_at = '2000-01-01T00:00:00.000Z'", [])?;
        store.update("t1", Some(TaskStatus::Paused), None, Some("/info/t1.md"))
    })
    .unwrap();

    let task = db.with_conn(|conn| TaskStore::new(conn).get("t1")).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Paused);
    assert_eq!(task.summary.as_deref(), Some("keep me"));
    assert_eq!(task.taskinfo_path.as_deref(), Some("/info/t1.md"));
    assert!(task.updated_at > "2000-01-01T00:00:00.000Z".to_string());
}

#[test]
fn list_by_status_returns_only_that_status() {
    let db = memory_db();
    db.with_conn(|conn| {
        let store = TaskStore::new(conn);
        store.insert("a", "A", None, None)?;
        store.insert("b", "B", None, None)?;
        store.insert("c", "C", None, None)?;
        store.update("b", Some(TaskStatus::Completed), None, None)?;
        store.update("c", Some(TaskStatus::Cancelled), None, None)
    })
    .unwrap();

    let completed = db
        .with_conn(|conn| TaskStore::new(conn).list(&TaskFilter::Status(TaskStatus::Completed)))
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert!(completed.iter().all(|t| t.status == TaskStatus::Completed));

    let active = db.with_conn(|conn| TaskStore::new(conn).list(&TaskFilter::Active)).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "a");

    let all = db.with_conn(|conn| TaskStore::new(conn).list(&TaskFilter::All)).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn list_orders_by_most_recently_touched() {
    let db = memory_db();
    db.with_conn(|conn| {
        let store = TaskStore::new(conn);
        store.insert("old", "Old", None, None)?;
        store.insert("new", "New", None, None)?;
        // Deterministic timestamps; consecutive inserts can share a millisecond.
        conn.execute("UPDATE tasks SET updated_at = '2026-01-01T00:00:00.000Z' WHERE id = 'old'", [])?;
        conn.execute("UPDATE tasks SET updated_at = '2026-02-01T00:00:00.000Z' WHERE id = 'new'", [])?;
        Ok(())
    })
    .unwrap();

    let tasks = db.with_conn(|conn| TaskStore::new(conn).list(&TaskFilter::All)).unwrap();
    assert_eq!(tasks[0].id, "new");
    assert_eq!(tasks[1].id, "old");
}

#[test]
fn run_completed_at_follows_the_result() {
    let db = memory_db();
    db.with_conn(|conn| {
        let store = RunStore::new(conn);
        store.insert("coder", "edit", None, "pending", None, None)?;
        store.insert("coder", "edit", None, "success", Some("s1"), Some("done"))
    })
    .unwrap();

    let runs = db.with_conn(|conn| RunStore::new(conn).list(&RunFilter::default())).unwrap();
    let pending = runs.iter().find(|r| r.result == "pending").unwrap();
    let finished = runs.iter().find(|r| r.result == "success").unwrap();
    assert!(pending.completed_at.is_none());
    assert!(!pending.started_at.is_empty());
    assert!(finished.completed_at.is_some());
    assert_eq!(finished.session_id.as_deref(), Some("s1"));
}

#[test]
fn run_referencing_missing_task_fails_with_not_found() {
    let db = memory_db();
    let err = db
        .with_conn(|conn| RunStore::new(conn).insert("coder", "edit", Some("ghost"), "pending", None, None))
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));

    let runs = db.with_conn(|conn| RunStore::new(conn).list(&RunFilter::default())).unwrap();
    assert!(runs.is_empty());
}

#[test]
fn run_listing_caps_at_ten_newest_first() {
    let db = memory_db();
    db.with_conn(|conn| {
        let store = RunStore::new(conn);
        for i in 0..12 {
            store.insert("coder", &format!("step-{}", i), None, "pending", None, None)?;
        }
        Ok(())
    })
    .unwrap();

    let runs = db.with_conn(|conn| RunStore::new(conn).list(&RunFilter::default())).unwrap();
    assert_eq!(runs.len(), 10);
    assert_eq!(runs[0].action, "step-11");
    assert_eq!(runs[9].action, "step-2");
}

#[test]
fn repeated_error_reports_accumulate_without_context() {
    let db = memory_db();
    db.with_conn(|conn| {
        let store = ErrorStore::new(conn);
        for _ in 0..4 {
            store.record("borrowck", None, None)?;
        }
        Ok(())
    })
    .unwrap();

    let rec =
        db.with_conn(|conn| ErrorStore::new(conn).get_by_pattern("borrowck")).unwrap().unwrap();
    assert_eq!(rec.occurrences, 4);
    assert!(rec.context.is_none());
    assert!(rec.solution.is_none());
}

#[test]
fn error_context_and_solution_are_first_write_wins() {
    let db = memory_db();
    db.with_conn(|conn| {
        let store = ErrorStore::new(conn);
        assert_eq!(store.record("E1", Some("A"), None)?, RecordOutcome::Added);
        assert_eq!(
            store.record("E1", Some("B"), Some("fix"))?,
            RecordOutcome::Deduplicated { occurrences: 2 }
        );
        Ok(())
    })
    .unwrap();

    let rec = db.with_conn(|conn| ErrorStore::new(conn).get_by_pattern("E1")).unwrap().unwrap();
    assert_eq!(rec.context.as_deref(), Some("A"));
    assert_eq!(rec.solution.as_deref(), Some("fix"));
    assert_eq!(rec.occurrences, 2);
}

#[test]
fn dedup_refreshes_last_seen_but_not_first_seen() {
    let db = memory_db();
    db.with_conn(|conn| {
        let store = ErrorStore::new(conn);
        store.record("E1", None, None)?;
        conn.execute(
            "UPDATE error_patterns SET first_seen = '2000-01-01T00:00:00.000Z', \
             last_seen = '2000-01-01T00:00:00.000Z'",
            [],
        )?;
        store.record("E1", None, None)?;
        Ok(())
    })
    .unwrap();

    let rec = db.with_conn(|conn| ErrorStore::new(conn).get_by_pattern("E1")).unwrap().unwrap();
    assert_eq!(rec.first_seen, "2000-01-01T00:00:00.000Z");
    assert!(rec.last_seen > rec.first_seen);
}

#[test]
fn error_query_modes() {
    let db = memory_db();
    db.with_conn(|conn| {
        let store = ErrorStore::new(conn);
        store.record("network timeout", Some("fetch"), None)?;
        store.record("disk full", None, Some("prune cache"))?;
        store.record("disk full", None, None)?;
        Ok(())
    })
    .unwrap();

    // Top: most frequent first.
    let top = db.with_conn(|conn| ErrorStore::new(conn).query(&ErrorQuery::Top)).unwrap();
    assert_eq!(top[0].pattern, "disk full");
    assert_eq!(top[0].occurrences, 2);

    // Search matches pattern, context, and solution.
    for needle in ["timeout", "fetch"] {
        let found = db
            .with_conn(|conn| ErrorStore::new(conn).query(&ErrorQuery::Search(needle.to_string())))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pattern, "network timeout");
    }
    let by_solution = db
        .with_conn(|conn| ErrorStore::new(conn).query(&ErrorQuery::Search("prune".to_string())))
        .unwrap();
    assert_eq!(by_solution.len(), 1);
    assert_eq!(by_solution[0].pattern, "disk full");

    // Recent caps and orders by last_seen.
    let recent = db
        .with_conn(|conn| ErrorStore::new(conn).query(&ErrorQuery::Recent(1)))
        .unwrap();
    assert_eq!(recent.len(), 1);
}

#[test]
fn snapshot_payload_is_validated_before_any_write() {
    let db = memory_db();
    let err = db
        .with_conn(|conn| SnapshotStore::new(conn).insert(None, None, None, Some("not json"), None))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));

    assert!(db.with_conn(|conn| SnapshotStore::new(conn).latest()).unwrap().is_none());

    db.with_conn(|conn| {
        SnapshotStore::new(conn).insert(Some("s1"), Some("wiring"), None, Some("[\"t1\",\"t2\"]"), None)
    })
    .unwrap();
    let latest = db.with_conn(|conn| SnapshotStore::new(conn).latest()).unwrap().unwrap();
    assert_eq!(latest.active_tasks.as_deref(), Some("[\"t1\",\"t2\"]"));
    assert_eq!(latest.current_work.as_deref(), Some("wiring"));
}

#[test]
fn recover_on_empty_store_has_empty_sections_and_no_error() {
    let db = memory_db();
    let report = db.recover().unwrap();
    assert!(report.active_tasks.is_empty());
    assert!(report.latest_snapshot.is_none());
    assert!(report.recent_runs.is_empty());
    assert!(report.recent_errors.is_empty());
}

#[test]
fn recover_caps_each_section() {
    let db = memory_db();
    db.with_conn(|conn| {
        let tasks = TaskStore::new(conn);
        tasks.insert("t1", "Active one", None, None)?;
        tasks.insert("t2", "Done one", None, None)?;
        tasks.update("t2", Some(TaskStatus::Completed), None, None)?;

        let runs = RunStore::new(conn);
        for i in 0..7 {
            runs.insert("coder", &format!("step-{}", i), Some("t1"), "pending", None, None)?;
        }

        let errors = ErrorStore::new(conn);
        for pattern in ["e1", "e2", "e3", "e4"] {
            errors.record(pattern, None, None)?;
        }

        SnapshotStore::new(conn).insert(Some("s1"), Some("work"), None, None, None)?;
        Ok(())
    })
    .unwrap();

    let report = db.recover().unwrap();
    assert_eq!(report.active_tasks.len(), 1);
    assert_eq!(report.active_tasks[0].id, "t1");
    assert_eq!(report.recent_runs.len(), RecoveryReport::RECENT_RUNS as usize);
    assert_eq!(report.recent_runs[0].action, "step-6");
    assert_eq!(report.recent_errors.len(), RecoveryReport::RECENT_ERRORS as usize);
    assert_eq!(report.latest_snapshot.as_ref().unwrap().session_id.as_deref(), Some("s1"));
}
