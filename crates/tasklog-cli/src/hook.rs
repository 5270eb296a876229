use std::io::Read;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tasklog_types::{LogEntry, TodoItem};

/// Fallback value used when session_id or cwd is missing.
pub const UNKNOWN_VALUE: &str = "unknown";

/// Tool whose events this hook records.
const ACCEPTED_TOOL: &str = "TodoWrite";

/// Raw hook payload as delivered on stdin.
#[derive(Debug, Deserialize)]
pub struct HookEvent {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: ToolInput,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub cwd: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolInput {
    /// Items arrive untyped; validation decides what survives.
    #[serde(default)]
    pub todos: Vec<Value>,
}

/// Read one hook event from `reader`.
///
/// Returns `Ok(None)` for events from other tools so the caller can
/// exit silently. With TASKLOG_DEBUG set, the ignored tool name is
/// noted on stderr.
pub fn read_hook_event(reader: impl Read) -> Result<Option<HookEvent>> {
    let event: HookEvent =
        serde_json::from_reader(reader).context("failed to decode hook input")?;

    if event.tool_name != ACCEPTED_TOOL {
        if std::env::var_os("TASKLOG_DEBUG").is_some() {
            eprintln!("Ignoring non-TodoWrite event: {}", event.tool_name);
        }
        return Ok(None);
    }

    Ok(Some(event))
}

/// Current UTC time as ISO 8601 with millisecond precision and Z suffix
/// (e.g. "2025-11-14T10:30:45.123Z").
pub fn utc_iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Build the entry to persist from a validated event.
///
/// Missing session_id or cwd fall back to [`UNKNOWN_VALUE`]; the
/// storage layer performs no defaulting of its own.
pub fn build_log_entry(event: &HookEvent) -> LogEntry {
    let session_id = if event.session_id.is_empty() {
        UNKNOWN_VALUE.to_string()
    } else {
        event.session_id.clone()
    };

    let cwd = if event.cwd.is_empty() {
        UNKNOWN_VALUE.to_string()
    } else {
        event.cwd.clone()
    };

    LogEntry {
        timestamp: utc_iso_timestamp(),
        session_id,
        cwd,
        todos: validate_todos(&event.tool_input.todos),
    }
}

/// Keep only items carrying the three required string fields; anything
/// else the payload smuggled in is dropped.
fn validate_todos(raw: &[Value]) -> Vec<TodoItem> {
    raw.iter().filter_map(todo_from_value).collect()
}

fn todo_from_value(value: &Value) -> Option<TodoItem> {
    let obj = value.as_object()?;
    Some(TodoItem {
        content: obj.get("content")?.as_str()?.to_string(),
        status: obj.get("status")?.as_str()?.to_string(),
        active_form: obj.get("activeForm")?.as_str()?.to_string(),
    })
}
