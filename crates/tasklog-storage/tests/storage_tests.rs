use std::fs;

use tasklog_storage::{
    BackendKind, Error, JsonBackend, QueryableBackend, SqliteBackend, StorageBackend,
    StorageConfig, open_backend,
};
use tasklog_types::{LogEntry, TodoItem};
use tempfile::TempDir;

fn todo(content: &str, status: &str) -> TodoItem {
    TodoItem {
        content: content.to_string(),
        status: status.to_string(),
        active_form: format!("Working on {}", content),
    }
}

fn entry(session_id: &str, todos: Vec<TodoItem>) -> LogEntry {
    LogEntry {
        timestamp: "2025-11-14T10:30:45.123Z".to_string(),
        session_id: session_id.to_string(),
        cwd: "/work/project".to_string(),
        todos,
    }
}

fn each_backend(test: impl Fn(&dyn StorageBackend)) {
    let dir = TempDir::new().unwrap();
    let json = JsonBackend::new(dir.path().join("todos.json"));
    test(&json);

    let dir = TempDir::new().unwrap();
    let sqlite = SqliteBackend::open(dir.path().join("todos.db")).unwrap();
    test(&sqlite);
}

#[test]
fn append_then_load_extends_history_by_one() {
    each_backend(|backend| {
        backend.append_entry(&entry("s1", vec![todo("a", "pending")])).unwrap();
        let before = backend.load_history().unwrap();

        let new = entry("s2", vec![todo("b", "in_progress")]);
        backend.append_entry(&new).unwrap();

        let after = backend.load_history().unwrap();
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after[..before.len()], before[..]);
        assert_eq!(*after.last().unwrap(), new);
    });
}

#[test]
fn sequential_appends_load_in_append_order() {
    each_backend(|backend| {
        for i in 0..5 {
            backend
                .append_entry(&entry(&format!("s{}", i), vec![]))
                .unwrap();
        }

        let history = backend.load_history().unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].session_id, "s0");
        assert_eq!(history[4].session_id, "s4");
    });
}

#[test]
fn empty_todo_list_round_trips_as_empty() {
    each_backend(|backend| {
        backend.append_entry(&entry("s1", vec![])).unwrap();

        let history = backend.load_history().unwrap();
        assert_eq!(history.len(), 1);
        // Never null and never a phantom item from the outer join.
        assert_eq!(history[0].todos, Vec::<TodoItem>::new());
    });
}

#[test]
fn unicode_content_round_trips_exactly() {
    let content = "修复 naïve régression 🚀🔧";

    each_backend(|backend| {
        backend
            .append_entry(&entry("s1", vec![todo(content, "pending")]))
            .unwrap();

        let history = backend.load_history().unwrap();
        assert_eq!(history[0].todos[0].content, content);
    });
}

#[test]
fn json_file_stores_unicode_unescaped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("todos.json");
    let backend = JsonBackend::new(&path);

    backend
        .append_entry(&entry("s1", vec![todo("修复 🚀", "pending")]))
        .unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("修复 🚀"));
    assert!(!raw.contains("\\u"));
}

#[test]
fn json_reload_reproduces_logical_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("todos.json");
    let backend = JsonBackend::new(&path);

    backend
        .append_entry(&entry("s1", vec![todo("a", "pending"), todo("b", "done")]))
        .unwrap();
    backend.append_entry(&entry("s2", vec![])).unwrap();

    let first = backend.load_history().unwrap();
    let reserialized = serde_json::to_value(&first).unwrap();
    let on_disk: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reserialized, on_disk);
}

#[test]
fn json_failed_replace_leaves_target_untouched() {
    let dir = TempDir::new().unwrap();

    // A directory sitting at the target path makes the final rename
    // fail after the temp file has been written.
    let target = dir.path().join("todos.json");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("occupant"), "keep me").unwrap();

    let backend = JsonBackend::new(&target);
    let err = backend.append_entry(&entry("s1", vec![])).unwrap_err();
    assert!(matches!(err, Error::Io(_)));

    // Target unchanged, and the temp file was cleaned up.
    assert_eq!(
        fs::read_to_string(target.join("occupant")).unwrap(),
        "keep me"
    );
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path() != target)
        .collect();
    assert!(leftovers.is_empty(), "stray temp files: {:?}", leftovers);
}

#[cfg(unix)]
#[test]
fn json_failed_append_preserves_existing_bytes() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("todos.json");
    let backend = JsonBackend::new(&target);
    backend.append_entry(&entry("s1", vec![])).unwrap();
    let before = fs::read(&target).unwrap();

    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();

    // A privileged caller can write into a read-only directory, so the
    // failure cannot be induced; skip in that case.
    if fs::File::create(dir.path().join("probe")).is_ok() {
        fs::remove_file(dir.path().join("probe")).unwrap();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = backend.append_entry(&entry("s2", vec![]));
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

    assert!(result.is_err());
    assert_eq!(fs::read(&target).unwrap(), before);
}

#[test]
fn queryable_capability_is_sqlite_only() {
    let dir = TempDir::new().unwrap();

    let json = JsonBackend::new(dir.path().join("todos.json"));
    assert!(json.as_queryable().is_none());

    let sqlite = SqliteBackend::open(dir.path().join("todos.db")).unwrap();
    assert!(sqlite.as_queryable().is_some());
}

#[test]
fn entries_by_session_filters_in_append_order() {
    let dir = TempDir::new().unwrap();
    let sqlite = SqliteBackend::open(dir.path().join("todos.db")).unwrap();

    sqlite.append_entry(&entry("a", vec![todo("first", "pending")])).unwrap();
    sqlite.append_entry(&entry("b", vec![])).unwrap();
    sqlite.append_entry(&entry("a", vec![todo("second", "done")])).unwrap();

    let queryable = sqlite.as_queryable().unwrap();
    let entries = queryable.entries_by_session("a").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].todos[0].content, "first");
    assert_eq!(entries[1].todos[0].content, "second");

    assert!(queryable.entries_by_session("missing").unwrap().is_empty());
}

#[test]
fn todos_by_status_spans_entries_in_insertion_order() {
    let dir = TempDir::new().unwrap();
    let sqlite = SqliteBackend::open(dir.path().join("todos.db")).unwrap();

    sqlite
        .append_entry(&entry(
            "a",
            vec![todo("one", "pending"), todo("two", "completed")],
        ))
        .unwrap();
    sqlite
        .append_entry(&entry("b", vec![todo("three", "pending")]))
        .unwrap();

    let pending = sqlite.as_queryable().unwrap().todos_by_status("pending").unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].content, "one");
    assert_eq!(pending[1].content, "three");

    assert!(
        sqlite
            .as_queryable()
            .unwrap()
            .todos_by_status("cancelled")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn sqlite_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("todos.db");

    {
        let sqlite = SqliteBackend::open(&db_path).unwrap();
        sqlite
            .append_entry(&entry("s1", vec![todo("a", "pending")]))
            .unwrap();
    }

    let reopened = SqliteBackend::open(&db_path).unwrap();
    let history = reopened.load_history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].todos.len(), 1);
}

#[test]
fn open_backend_is_interchangeable_from_the_caller_side() {
    for kind in [BackendKind::Json, BackendKind::Sqlite] {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            backend: kind,
            ..StorageConfig::default()
        };

        let backend = open_backend(dir.path(), &config).unwrap();
        backend.append_entry(&entry("s1", vec![todo("a", "pending")])).unwrap();

        let history = backend.load_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].session_id, "s1");
    }
}
