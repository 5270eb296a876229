use tasklog_types::{LogEntry, TodoItem};

use crate::Result;

/// Contract every storage backend implements.
///
/// The log is append-only: entries are never updated or deleted through
/// this interface.
pub trait StorageBackend: std::fmt::Debug {
    /// Load all persisted entries in append order.
    ///
    /// Returns an empty vector when nothing has been stored yet.
    fn load_history(&self) -> Result<Vec<LogEntry>>;

    /// Durably append one entry to the end of the log.
    ///
    /// On failure no partial state remains visible.
    fn append_entry(&self, entry: &LogEntry) -> Result<()>;

    /// Query capability of this backend, if it has one.
    ///
    /// Callers that need the query methods check here instead of
    /// assuming a concrete backend type.
    fn as_queryable(&self) -> Option<&dyn QueryableBackend> {
        None
    }
}

/// Extended contract for backends that can answer indexed queries.
pub trait QueryableBackend: StorageBackend {
    /// All entries recorded for one session, in append order.
    fn entries_by_session(&self, session_id: &str) -> Result<Vec<LogEntry>>;

    /// Every todo whose status matches, across all entries, in
    /// insertion order and independent of the owning entry.
    fn todos_by_status(&self, status: &str) -> Result<Vec<TodoItem>>;
}
