use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Resolve `user_path` against `base_dir`, rejecting any result that
/// escapes it.
///
/// Relative input is joined to `base_dir`; absolute input is taken
/// as-is and still validated. The candidate is normalized lexically,
/// then resolved through the filesystem (symlinks followed) so a link
/// inside the base cannot smuggle the result outside it. The path
/// itself does not have to exist, and nothing is created.
pub fn resolve_safe_path(base_dir: &Path, user_path: &str) -> Result<PathBuf> {
    if user_path.trim().is_empty() {
        return Err(Error::Config(
            "storage path is empty or whitespace-only".to_string(),
        ));
    }

    if user_path.contains('\0') {
        return Err(Error::Config("storage path contains a NUL byte".to_string()));
    }

    let raw = Path::new(user_path);
    let candidate = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        base_dir.join(raw)
    };

    let resolved = resolve_existing_prefix(&lexical_clean(&candidate))?;
    let base_resolved = base_dir.canonicalize()?;

    if resolved.starts_with(&base_resolved) {
        Ok(resolved)
    } else {
        Err(Error::Config(format!(
            "path escapes base directory: {}",
            user_path
        )))
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let poppable = matches!(
                    cleaned.components().next_back(),
                    Some(Component::Normal(_))
                );
                if poppable {
                    cleaned.pop();
                } else if !cleaned.has_root() {
                    // A leading ".." on a relative path has to be kept;
                    // on an absolute path the root swallows it.
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

/// Canonicalize the longest existing ancestor of `path` and re-append
/// the components that do not exist yet.
fn resolve_existing_prefix(path: &Path) -> Result<PathBuf> {
    let mut current = path.to_path_buf();
    let mut pending: Vec<OsString> = Vec::new();

    loop {
        match current.canonicalize() {
            Ok(resolved) => {
                let mut result = resolved;
                for part in pending.iter().rev() {
                    result.push(part);
                }
                return Ok(result);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                match (current.parent(), current.file_name()) {
                    (Some(parent), Some(name)) => {
                        pending.push(name.to_os_string());
                        current = parent.to_path_buf();
                    }
                    _ => return Err(Error::Io(err)),
                }
            }
            Err(err) => return Err(Error::Io(err)),
        }
    }
}
