use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::backend::StorageBackend;
use crate::json::JsonBackend;
use crate::sandbox::resolve_safe_path;
use crate::sqlite::SqliteBackend;
use crate::{Error, Result};

/// Default storage locations, relative to the project root.
pub const DEFAULT_JSON_PATH: &str = ".tasklog/todos.json";
pub const DEFAULT_SQLITE_PATH: &str = ".tasklog/todos.db";

/// The two recognized storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Json,
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(BackendKind::Json),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(Error::Config(format!(
                "unknown storage backend: '{}'. Expected 'json' or 'sqlite'",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Json => write!(f, "json"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Explicit storage configuration handed to [`open_backend`].
///
/// The storage layer never reads the environment; callers resolve
/// whatever configuration sources they have into this value first, so
/// backends stay testable with injected configuration.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    /// Override for the JSON log location. Relative to the project
    /// root unless absolute.
    pub json_path: Option<String>,
    /// Override for the SQLite database location.
    pub sqlite_path: Option<String>,
}

/// Construct the configured backend, resolving its storage location
/// against `project_dir`.
///
/// A configured path that escapes the project root is rejected before
/// any storage I/O happens.
pub fn open_backend(
    project_dir: &Path,
    config: &StorageConfig,
) -> Result<Box<dyn StorageBackend>> {
    match config.backend {
        BackendKind::Json => {
            let path = storage_path(project_dir, config.json_path.as_deref(), DEFAULT_JSON_PATH)?;
            Ok(Box::new(JsonBackend::new(path)))
        }
        BackendKind::Sqlite => {
            let path = storage_path(
                project_dir,
                config.sqlite_path.as_deref(),
                DEFAULT_SQLITE_PATH,
            )?;
            Ok(Box::new(SqliteBackend::open(path)?))
        }
    }
}

fn storage_path(project_dir: &Path, custom: Option<&str>, default: &str) -> Result<PathBuf> {
    match custom {
        Some(custom) => resolve_safe_path(project_dir, custom),
        None => Ok(project_dir.join(default)),
    }
}
