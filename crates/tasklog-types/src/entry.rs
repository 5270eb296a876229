use serde::{Deserialize, Serialize};

/// A single todo item captured from a TodoWrite event.
///
/// Items carry no identity of their own; they are owned by exactly one
/// [`LogEntry`], created and destroyed with it, and never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Task description text.
    pub content: String,
    /// Status label (e.g. "pending", "in_progress", "completed").
    /// Free-form at the storage layer, not a closed enum.
    pub status: String,
    /// Present continuous form shown while the task is active
    /// (e.g. "Running tests").
    #[serde(rename = "activeForm")]
    pub active_form: String,
}

/// One timestamped record of a captured TodoWrite event.
///
/// Entries are appended once and never updated or deleted by the
/// storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp with millisecond precision and Z suffix
    /// (e.g. "2025-11-14T10:30:45.123Z"). Generated by the hook layer
    /// and stored verbatim; storage never parses or re-derives it.
    pub timestamp: String,
    /// Identifier of the originating agent session.
    pub session_id: String,
    /// Working directory where the tool was invoked.
    pub cwd: String,
    /// Todo list snapshot in insertion order. May be empty; an absent
    /// or null field deserializes to an empty list.
    #[serde(default)]
    pub todos: Vec<TodoItem>,
}
