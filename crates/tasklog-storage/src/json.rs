use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tasklog_types::LogEntry;

use crate::backend::StorageBackend;
use crate::{Error, Result};

/// Flat-file backend holding the entire history as one JSON array.
///
/// Every append rewrites the whole file through a temp-file-and-rename
/// cycle, so a crash mid-write never leaves the target missing or
/// truncated. Two processes appending at once race the read-modify-write
/// cycle; the last rename wins and the loser's entry is dropped. Known
/// limitation.
#[derive(Debug)]
pub struct JsonBackend {
    log_file: PathBuf,
}

impl JsonBackend {
    /// Create a backend for the given log file path. Parent directories
    /// are created on the first append.
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        Self {
            log_file: log_file.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.log_file
    }
}

impl StorageBackend for JsonBackend {
    /// A missing, unreadable, or corrupt file loads as an empty history,
    /// so a damaged log self-heals on the next append instead of
    /// blocking all future writes.
    fn load_history(&self) -> Result<Vec<LogEntry>> {
        let data = match fs::read_to_string(&self.log_file) {
            Ok(data) => data,
            Err(_) => return Ok(Vec::new()),
        };

        match serde_json::from_str::<Vec<LogEntry>>(&data) {
            Ok(entries) => Ok(entries),
            Err(_) => Ok(Vec::new()),
        }
    }

    fn append_entry(&self, entry: &LogEntry) -> Result<()> {
        let dir = match self.log_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut history = self.load_history()?;
        history.push(entry.clone());

        let mut data = serde_json::to_vec_pretty(&history)?;
        data.push(b'\n');

        // The temp file must live in the target's directory so the
        // final rename stays on one filesystem and is atomic.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;

        // persist() is an atomic replace; on failure the temp file is
        // dropped and removed, and the target is left as it was.
        tmp.persist(&self.log_file)
            .map_err(|err| Error::Io(err.error))?;

        Ok(())
    }
}
