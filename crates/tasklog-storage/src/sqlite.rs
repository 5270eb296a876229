use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, Rows, TransactionBehavior, params};
use tasklog_types::{LogEntry, TodoItem};

use crate::Result;
use crate::backend::{QueryableBackend, StorageBackend};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS log_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    session_id TEXT NOT NULL,
    cwd TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    status TEXT NOT NULL,
    active_form TEXT NOT NULL,
    FOREIGN KEY (entry_id) REFERENCES log_entries(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_entries_session ON log_entries(session_id);
CREATE INDEX IF NOT EXISTS idx_todos_status ON todos(status);
"#;

/// SQLite backend storing entries and their todos in related tables.
///
/// Each operation opens its own connection; the database file is the
/// only shared state. WAL keeps readers unblocked during writes, and
/// write transactions take their lock at BEGIN so two appenders cannot
/// interleave partial inserts.
#[derive(Debug)]
pub struct SqliteBackend {
    db_path: PathBuf,
}

impl SqliteBackend {
    /// Open the backend, creating the schema when missing.
    ///
    /// Schema creation is idempotent; opening an already-initialized
    /// database is a no-op.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let backend = Self {
            db_path: db_path.into(),
        };

        let conn = backend.connect()?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Open a fresh connection. Foreign-key enforcement is off by
    /// default in SQLite and must be switched on per connection.
    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(conn)
    }
}

/// Group LEFT JOIN rows (ordered by entry id, then todo id) back into
/// nested entries.
fn group_entry_rows(rows: &mut Rows<'_>) -> Result<Vec<LogEntry>> {
    let mut entries: Vec<LogEntry> = Vec::new();
    let mut last_id: Option<i64> = None;

    while let Some(row) = rows.next()? {
        let entry_id: i64 = row.get(0)?;

        if last_id != Some(entry_id) {
            entries.push(LogEntry {
                timestamp: row.get(1)?,
                session_id: row.get(2)?,
                cwd: row.get(3)?,
                todos: Vec::new(),
            });
            last_id = Some(entry_id);
        }

        // An entry without todos joins to one all-NULL todo column set;
        // skip it rather than appending a phantom item.
        if let Some(content) = row.get::<_, Option<String>>(4)? {
            if let Some(entry) = entries.last_mut() {
                entry.todos.push(TodoItem {
                    content,
                    status: row.get(5)?,
                    active_form: row.get(6)?,
                });
            }
        }
    }

    Ok(entries)
}

impl StorageBackend for SqliteBackend {
    fn load_history(&self) -> Result<Vec<LogEntry>> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT e.id, e.timestamp, e.session_id, e.cwd,
                   t.content, t.status, t.active_form
            FROM log_entries e
            LEFT JOIN todos t ON e.id = t.entry_id
            ORDER BY e.id, t.id
            "#,
        )?;

        let mut rows = stmt.query([])?;
        group_entry_rows(&mut rows)
    }

    fn append_entry(&self, entry: &LogEntry) -> Result<()> {
        let mut conn = self.connect()?;

        // BEGIN IMMEDIATE takes the write lock up front instead of at
        // the first write, closing the race between the entry insert
        // and its todo inserts.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO log_entries (timestamp, session_id, cwd) VALUES (?1, ?2, ?3)",
            params![&entry.timestamp, &entry.session_id, &entry.cwd],
        )?;
        let entry_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO todos (entry_id, content, status, active_form) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for todo in &entry.todos {
                stmt.execute(params![
                    entry_id,
                    &todo.content,
                    &todo.status,
                    &todo.active_form
                ])?;
            }
        }

        // Any failure above drops the transaction, which rolls back
        // best-effort without masking the original error.
        tx.commit()?;
        Ok(())
    }

    fn as_queryable(&self) -> Option<&dyn QueryableBackend> {
        Some(self)
    }
}

impl QueryableBackend for SqliteBackend {
    fn entries_by_session(&self, session_id: &str) -> Result<Vec<LogEntry>> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT e.id, e.timestamp, e.session_id, e.cwd,
                   t.content, t.status, t.active_form
            FROM log_entries e
            LEFT JOIN todos t ON e.id = t.entry_id
            WHERE e.session_id = ?1
            ORDER BY e.id, t.id
            "#,
        )?;

        let mut rows = stmt.query([session_id])?;
        group_entry_rows(&mut rows)
    }

    fn todos_by_status(&self, status: &str) -> Result<Vec<TodoItem>> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(
            "SELECT content, status, active_form FROM todos WHERE status = ?1 ORDER BY id",
        )?;

        let todos = stmt
            .query_map([status], |row| {
                Ok(TodoItem {
                    content: row.get(0)?,
                    status: row.get(1)?,
                    active_form: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(todos)
    }
}
