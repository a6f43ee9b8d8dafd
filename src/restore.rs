//! Safe workspace restoration
//!
//! The [`RestoreCoordinator`] brings a workspace back to the state captured
//! in a snapshot. The protocol is strictly ordered; each step is a
//! precondition for the next:
//!
//! 1. **Confinement** — the snapshot id must resolve to a direct child of
//!    the store root; rejected before any filesystem access otherwise.
//! 2. **Existence** — a valid (metadata-bearing) snapshot belonging to the
//!    named workspace must be present; checked under the workspace lock.
//! 3. **Safety snapshot** — the current workspace state is captured under
//!    the `pre-restore-auto` label; if this fails, nothing is mutated.
//! 4. **Stage** — every file of the target snapshot is copied into a
//!    temporary directory inside the workspace root. No workspace file is
//!    touched until all reads from the snapshot have succeeded.
//! 5. **Clear** — non-ignored files of the live workspace are deleted;
//!    ignored paths (version-control metadata, dependency directories) are
//!    left untouched, and emptied directories are pruned.
//! 6. **Populate** — staged files are renamed into place.
//!
//! Staging before clearing replaces the delete-then-copy ordering whose
//! mid-failure left a workspace with neither the old nor the new content on
//! disk; after staging, the remaining failure window is the rename pass over
//! already-local files, and the safety snapshot covers even that.

use crate::error::{Result, VaultError};
use crate::ignore_rules::IgnoreSpec;
use crate::scanner::Scanner;
use crate::store::{SnapshotStore, META_FILE};
use crate::types::{validate_workspace_id, FileEntry, RestoreOutcome, PRE_RESTORE_LABEL};
use crate::utils;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, trace};
use walkdir::WalkDir;

/// Orchestrates restoration of a workspace from a snapshot
///
/// # Example
///
/// ```rust,no_run
/// use snapvault::{RestoreCoordinator, SnapshotStore};
/// use std::path::PathBuf;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(SnapshotStore::open(PathBuf::from("./.snapvault"))?);
/// let coordinator = RestoreCoordinator::new(store);
/// let outcome = coordinator.restore(
///     &PathBuf::from("./project"),
///     "ws1",
///     "ws1_20250101_120000_v1",
/// )?;
/// println!(
///     "restored {} files; recovery point: {}",
///     outcome.files_restored, outcome.safety_snapshot.snapshot_id
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RestoreCoordinator {
    store: Arc<SnapshotStore>,
}

impl RestoreCoordinator {
    /// Create a coordinator over a snapshot store
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    /// Restore a workspace to the state of a snapshot
    ///
    /// Returns the number of files written in the populate phase plus the
    /// metadata of the safety snapshot taken beforehand.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidId`] if the snapshot id escapes the store root
    /// - [`VaultError::SnapshotNotFound`] if no valid snapshot exists there
    /// - [`VaultError::WorkspaceNotFound`] if the workspace root is missing
    /// - [`VaultError::Io`] if any staging, clearing, or populate step fails;
    ///   earlier steps are never retried and later steps are not attempted
    #[instrument(skip(self, workspace_root))]
    pub fn restore(
        &self,
        workspace_root: &Path,
        workspace_id: &str,
        snapshot_id: &str,
    ) -> Result<RestoreOutcome> {
        let start = Instant::now();
        validate_workspace_id(workspace_id)?;

        // Step 1: confinement, before touching any filesystem state
        let snapshot_dir = self.store.resolve_id(snapshot_id)?;
        if !workspace_root.is_dir() {
            return Err(VaultError::WorkspaceNotFound(workspace_root.to_path_buf()));
        }

        let lock = self.store.workspace_lock(workspace_id);
        let _guard = lock.lock();

        // Step 2: existence, checked under the lock so a concurrent delete
        // cannot invalidate the target between here and staging. A snapshot
        // of another workspace is not a valid target either.
        let target = self
            .store
            .read_valid_metadata(&snapshot_dir)?
            .filter(|m| m.workspace_id == workspace_id)
            .ok_or_else(|| VaultError::SnapshotNotFound(snapshot_id.to_string()))?;

        // Step 3: safety snapshot of the current state; abort on failure
        let safety_snapshot =
            self.store
                .create_locked(workspace_root, workspace_id, Some(PRE_RESTORE_LABEL))?;
        debug!("Safety snapshot: {}", safety_snapshot.snapshot_id);

        // Step 4: enumerate the live workspace, then stage the target
        // snapshot fully before the first deletion. The clear list applies
        // the ignore spec only: capture limits do not shield an oversized or
        // late-arriving file from removal.
        let spec = IgnoreSpec::for_workspace(workspace_root)?;
        let live = Scanner::new(workspace_root.to_path_buf())
            .with_max_file_size(0)
            .with_max_file_count(0)
            .scan(&spec)?;

        let snapshot_files = collect_snapshot_files(&snapshot_dir)?;
        let stage = tempfile::Builder::new()
            .prefix(".snapvault-stage-")
            .tempdir_in(workspace_root)?;
        self.store
            .copy_parallel(&snapshot_dir, stage.path(), &snapshot_files)?;
        debug!("Staged {} files", snapshot_files.len());

        // Step 5: clear non-ignored files and prune emptied directories
        let mut parents = HashSet::new();
        for entry in &live.entries {
            let path = workspace_root.join(&entry.path);
            fs::remove_file(&path)?;
            trace!("Deleted {:?}", entry.path);
            let mut parent = path.parent();
            while let Some(p) = parent {
                if p == workspace_root || p == stage.path() {
                    break;
                }
                parents.insert(p.to_path_buf());
                parent = p.parent();
            }
        }
        let mut parents: Vec<_> = parents.into_iter().collect();
        parents.sort_by(|a, b| b.components().count().cmp(&a.components().count()));
        for dir in parents {
            if let Err(e) = utils::remove_dir_if_empty(&dir) {
                trace!("Could not remove directory {:?}: {}", dir, e);
            }
        }

        // Step 6: populate from the stage
        let mut files_restored = 0;
        for entry in &snapshot_files {
            let from = stage.path().join(&entry.path);
            let to = workspace_root.join(&entry.path);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)?;
            }
            // Same filesystem as the workspace, so rename is the normal
            // path; fall back to a copy for exotic mount layouts
            if fs::rename(&from, &to).is_err() {
                utils::copy_preserving(&from, &to)?;
            }
            files_restored += 1;
        }

        let outcome = RestoreOutcome {
            snapshot_id: target.snapshot_id,
            files_restored,
            safety_snapshot,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Restored workspace '{}' from {} ({} files) in {}ms",
            workspace_id, snapshot_id, outcome.files_restored, outcome.duration_ms
        );
        Ok(outcome)
    }
}

/// Enumerate the captured files of a snapshot directory, excluding its own
/// metadata record
fn collect_snapshot_files(snapshot_dir: &Path) -> Result<Vec<FileEntry>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(snapshot_dir).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = utils::make_relative(entry.path(), snapshot_dir)?;
        if relative == PathBuf::from(META_FILE) {
            continue;
        }
        files.push(FileEntry {
            path: utils::normalize_separators(&relative),
            size: entry.metadata()?.len(),
        });
    }
    Ok(files)
}
