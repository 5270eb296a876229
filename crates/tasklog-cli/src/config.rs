use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tasklog_storage::{BackendKind, StorageConfig};

/// Config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "tasklog.toml";

/// On-disk configuration, loaded from `<project_dir>/tasklog.toml`.
///
/// A missing file yields the defaults; a malformed file is an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSection {
    pub backend: Option<String>,
    pub json_path: Option<String>,
    pub sqlite_path: Option<String>,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }
}

/// Resolve the project root based on priority:
/// 1. Explicit `--project-dir` flag
/// 2. TASKLOG_PROJECT_DIR environment variable
/// 3. Current working directory
pub fn discover_project_dir(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(PathBuf::from(dir));
    }

    if let Ok(env_dir) = std::env::var("TASKLOG_PROJECT_DIR")
        && !env_dir.trim().is_empty()
    {
        return Ok(PathBuf::from(env_dir));
    }

    let cwd = std::env::current_dir()?;
    Ok(cwd)
}

/// Merge flag, environment, and config file into the storage
/// configuration handed to the storage layer. Flags win over the
/// environment, which wins over the file.
pub fn resolve_storage_config(
    project_dir: &Path,
    backend_flag: Option<&str>,
) -> Result<StorageConfig> {
    let file = Config::load_from(&project_dir.join(CONFIG_FILE))?;

    let backend_name = backend_flag
        .map(str::to_string)
        .or_else(|| env_override("TASKLOG_BACKEND"))
        .or(file.storage.backend)
        .unwrap_or_else(|| BackendKind::default().to_string());

    let backend: BackendKind = backend_name.trim().to_lowercase().parse()?;

    Ok(StorageConfig {
        backend,
        json_path: env_override("TASKLOG_JSON_PATH").or(file.storage.json_path),
        sqlite_path: env_override("TASKLOG_SQLITE_PATH").or(file.storage.sqlite_path),
    })
}

fn env_override(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}
