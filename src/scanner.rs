//! Workspace enumeration
//!
//! The [`Scanner`] walks a workspace tree, consults an [`IgnoreSpec`] and the
//! configured size/count limits, and produces a deterministic, lexically
//! ordered file list. Two correctness requirements distinguish it from a
//! naive walk:
//!
//! - hitting the file-count limit is **signaled** via
//!   [`ScanResult::truncated`](crate::types::ScanResult), never silent;
//! - symlinks are not followed, and any symlink whose resolved target escapes
//!   the workspace root is excluded and reported as an anomaly.

use crate::error::{Result, VaultError};
use crate::ignore_rules::IgnoreSpec;
use crate::types::{FileEntry, ScanResult};
use crate::utils;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Default maximum size of a captured file, in bytes
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2_000_000;

/// Default maximum number of files returned by one scan
pub const DEFAULT_MAX_FILE_COUNT: usize = 4000;

/// Deterministic workspace tree walker
///
/// # Example
///
/// ```rust,no_run
/// use snapvault::{IgnoreSpec, Scanner};
/// use std::path::PathBuf;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let spec = IgnoreSpec::for_workspace(&PathBuf::from("./project"))?;
/// let scan = Scanner::new(PathBuf::from("./project")).scan(&spec)?;
/// if scan.truncated {
///     eprintln!("listing is incomplete");
/// }
/// for entry in &scan.entries {
///     println!("{}: {} bytes", entry.path.display(), entry.size);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Scanner {
    /// Workspace root to walk
    root: PathBuf,
    /// Maximum file size in bytes (0 = unlimited)
    max_file_size: u64,
    /// Maximum number of entries (0 = unlimited)
    max_file_count: usize,
}

impl Scanner {
    /// Create a scanner with the default size and count limits
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
        }
    }

    /// Set the maximum file size in bytes (0 = unlimited)
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set the maximum number of entries (0 = unlimited)
    pub fn with_max_file_count(mut self, count: usize) -> Self {
        self.max_file_count = count;
        self
    }

    /// Enumerate the workspace under the given ignore spec
    ///
    /// Regular files are included unless the spec excludes them or their size
    /// exceeds the limit. Output is sorted lexically by relative path. Once
    /// the count limit is reached no further entries are accepted and the
    /// `truncated` flag is set.
    pub fn scan(&self, spec: &IgnoreSpec) -> Result<ScanResult> {
        if !self.root.is_dir() {
            return Err(VaultError::WorkspaceNotFound(self.root.clone()));
        }
        let start = Instant::now();
        let canonical_root = fs::canonicalize(&self.root)?;

        let mut result = ScanResult::default();
        let mut walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = walker.next() {
            let entry = next?;
            if entry.depth() == 0 {
                continue;
            }

            let relative = utils::make_relative(entry.path(), &self.root)?;
            let relative = utils::normalize_separators(&relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                // Pruning an excluded directory is git-correct: children of
                // an excluded directory cannot be re-included.
                if spec.matches(&relative, true) {
                    trace!("Pruning ignored directory {:?}", relative);
                    walker.skip_current_dir();
                }
                continue;
            }

            let size = if file_type.is_symlink() {
                match fs::canonicalize(entry.path()) {
                    Ok(resolved) if resolved.starts_with(&canonical_root) => {
                        match fs::metadata(&resolved) {
                            Ok(m) if m.is_file() => m.len(),
                            // In-root symlink to a directory: not followed
                            _ => continue,
                        }
                    }
                    // Escapes the root, or cannot be resolved at all
                    _ => {
                        warn!("Symlink escapes workspace root: {:?}", relative);
                        result.anomalies.push(relative);
                        continue;
                    }
                }
            } else {
                entry.metadata()?.len()
            };

            if spec.matches(&relative, false) {
                continue;
            }
            if self.max_file_size > 0 && size > self.max_file_size {
                trace!("Skipping large file {:?} ({} bytes)", relative, size);
                continue;
            }
            if self.max_file_count > 0 && result.entries.len() >= self.max_file_count {
                result.truncated = true;
                break;
            }

            result.entries.push(FileEntry {
                path: relative,
                size,
            });
        }

        result.entries.sort_by(|a, b| a.path.cmp(&b.path));

        debug!(
            "Scanned {} files ({} bytes) in {:?}, truncated={}, anomalies={}",
            result.entries.len(),
            result.total_size(),
            start.elapsed(),
            result.truncated,
            result.anomalies.len()
        );
        Ok(result)
    }

}
