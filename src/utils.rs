//! Utility functions shared by the scanner, store, and restore coordinator
//!
//! Path manipulation, atomic metadata writes, and copy helpers that preserve
//! modification times and permission bits.

use crate::error::{Result, VaultError};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Make a path relative to a base path
///
/// Tries a lexical strip first to avoid resolving symlinks; falls back to
/// canonicalizing both sides when the lexical approach fails (relative
/// components, differing normalization).
pub fn make_relative(path: &Path, base: &Path) -> Result<PathBuf> {
    if let Ok(relative) = path.strip_prefix(base) {
        return Ok(relative.to_path_buf());
    }

    let path_canon = path.canonicalize()?;
    let base_canon = base.canonicalize()?;

    path_canon
        .strip_prefix(&base_canon)
        .map(|p| p.to_path_buf())
        .map_err(|_| {
            VaultError::internal(format!(
                "Path {:?} is not relative to {:?}",
                path_canon, base_canon
            ))
        })
}

/// Normalize a relative path to forward slashes on every platform
///
/// Snapshot metadata and enumeration output use forward-slash paths so that
/// captures are comparable across machines.
pub fn normalize_separators(path: &Path) -> PathBuf {
    let joined = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    PathBuf::from(joined)
}

/// Atomic file write (write to temp file then rename)
///
/// The target file is never observable in a partially written state; this is
/// what makes "metadata record exists" a reliable validity marker.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Copy a file, creating parent directories and preserving the source's
/// modification time and permission bits
pub fn copy_preserving(src: &Path, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = fs::copy(src, dest)?;

    let metadata = fs::metadata(src)?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(dest, mtime)?;

    Ok(bytes)
}

/// Remove directory if empty
pub fn remove_dir_if_empty(path: &Path) -> Result<bool> {
    if path.is_dir() && fs::read_dir(path)?.next().is_none() {
        fs::remove_dir(path)?;
        trace!("Removed empty directory: {:?}", path);
        Ok(true)
    } else {
        Ok(false)
    }
}
