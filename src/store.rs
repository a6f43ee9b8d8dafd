//! Snapshot creation, listing, and deletion
//!
//! The [`SnapshotStore`] owns a process-wide store root holding one
//! subdirectory per snapshot, across all workspaces; snapshots are scoped to
//! a workspace by the `workspace_id` field of their metadata record, not by
//! directory nesting.
//!
//! ## Validity protocol
//!
//! A snapshot directory is a mirrored copy of the captured file tree plus one
//! metadata record. The record is written last, atomically: until it exists,
//! every other operation treats the snapshot as nonexistent, so a crash
//! mid-capture leaves inert garbage rather than a half-valid snapshot.
//!
//! ## Concurrency
//!
//! All mutating operations serialize per `workspace_id` through an internal
//! lock registry. Within one `create` call, file copies are parallelized
//! across a bounded worker pool; the resulting snapshot is identical
//! regardless of parallelism.

use crate::error::{Result, VaultError};
use crate::ignore_rules::IgnoreSpec;
use crate::scanner::{Scanner, DEFAULT_MAX_FILE_COUNT, DEFAULT_MAX_FILE_SIZE};
use crate::types::{sanitize_label, validate_workspace_id, SnapshotMetadata};
use crate::utils;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Name of the metadata record inside each snapshot directory
pub const META_FILE: &str = ".snapshot_meta.json";

/// Builder for [`SnapshotStore`] with custom limits
///
/// # Example
///
/// ```rust,no_run
/// use snapvault::SnapshotStoreBuilder;
/// use std::path::PathBuf;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SnapshotStoreBuilder::new()
///     .max_file_size(10 * 1024 * 1024)
///     .max_file_count(10_000)
///     .parallel_workers(4)
///     .build(PathBuf::from("./.snapvault"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotStoreBuilder {
    max_file_size: u64,
    max_file_count: usize,
    parallel_workers: usize,
}

impl Default for SnapshotStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStoreBuilder {
    /// Create a builder with default limits
    pub fn new() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            parallel_workers: num_cpus::get(),
        }
    }

    /// Maximum size of a captured file in bytes (0 = unlimited)
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Maximum number of files captured per snapshot (0 = unlimited)
    pub fn max_file_count(mut self, count: usize) -> Self {
        self.max_file_count = count;
        self
    }

    /// Number of worker threads for parallel copies (minimum 1)
    pub fn parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers.max(1);
        self
    }

    /// Open (creating if needed) a snapshot store at the given root
    pub fn build(self, store_root: PathBuf) -> Result<SnapshotStore> {
        fs::create_dir_all(&store_root)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_workers)
            .build()
            .map_err(|e| VaultError::internal(format!("Thread pool: {}", e)))?;

        debug!(
            "Opened snapshot store at {:?} ({} workers)",
            store_root, self.parallel_workers
        );
        Ok(SnapshotStore {
            root: store_root,
            max_file_size: self.max_file_size,
            max_file_count: self.max_file_count,
            pool,
            locks: DashMap::new(),
        })
    }
}

/// Store of immutable workspace snapshots
pub struct SnapshotStore {
    /// Directory holding one subdirectory per snapshot id
    root: PathBuf,
    /// Size limit applied when enumerating workspaces
    max_file_size: u64,
    /// Count limit applied when enumerating workspaces
    max_file_count: usize,
    /// Bounded pool for parallel file copies
    pool: rayon::ThreadPool,
    /// Per-workspace advisory locks serializing create/restore/delete
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("root", &self.root)
            .field("max_file_size", &self.max_file_size)
            .field("max_file_count", &self.max_file_count)
            .finish()
    }
}

impl SnapshotStore {
    /// Open (creating if needed) a store with default limits
    pub fn open(store_root: PathBuf) -> Result<Self> {
        SnapshotStoreBuilder::new().build(store_root)
    }

    /// The store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a snapshot of a workspace
    ///
    /// Enumerates the workspace under its ignore spec, mirrors every eligible
    /// file into a fresh snapshot directory (preserving relative structure,
    /// modification times, and permission bits), and writes the metadata
    /// record last. The workspace itself is never mutated.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidWorkspaceId`] for unsafe workspace ids
    /// - [`VaultError::WorkspaceNotFound`] if the root is not a directory
    /// - [`VaultError::Io`] if any copy step fails; the partial snapshot
    ///   directory is removed before the error propagates
    #[instrument(skip(self, workspace_root))]
    pub fn create(
        &self,
        workspace_root: &Path,
        workspace_id: &str,
        label: Option<&str>,
    ) -> Result<SnapshotMetadata> {
        validate_workspace_id(workspace_id)?;
        let lock = self.workspace_lock(workspace_id);
        let _guard = lock.lock();
        self.create_locked(workspace_root, workspace_id, label)
    }

    /// Create a snapshot while the caller already holds the workspace lock
    pub(crate) fn create_locked(
        &self,
        workspace_root: &Path,
        workspace_id: &str,
        label: Option<&str>,
    ) -> Result<SnapshotMetadata> {
        let start = Instant::now();
        if !workspace_root.is_dir() {
            return Err(VaultError::WorkspaceNotFound(workspace_root.to_path_buf()));
        }

        let spec = IgnoreSpec::for_workspace(workspace_root)?;
        let mut scan = self.scanner(workspace_root.to_path_buf()).scan(&spec)?;
        // A root-level workspace file named like the metadata record would
        // collide with it inside the snapshot directory
        scan.entries.retain(|e| e.path != Path::new(META_FILE));
        if scan.truncated {
            warn!(
                "Capture of workspace '{}' truncated at {} files",
                workspace_id, self.max_file_count
            );
        }

        let label = sanitize_label(label);
        let created_at = Utc::now();
        let (snapshot_id, snapshot_dir) =
            self.reserve_snapshot_dir(workspace_id, &created_at, &label)?;

        let bytes = match self.copy_parallel(workspace_root, &snapshot_dir, &scan.entries) {
            Ok(bytes) => bytes,
            Err(e) => {
                // Leave no partial snapshot behind
                let _ = fs::remove_dir_all(&snapshot_dir);
                return Err(e);
            }
        };

        let metadata = SnapshotMetadata {
            workspace_id: workspace_id.to_string(),
            snapshot_id: snapshot_id.clone(),
            label,
            created_at,
            files_count: scan.entries.len(),
        };

        // Written last: until this record exists the snapshot is invisible
        let serialized = serde_json::to_vec_pretty(&metadata)?;
        utils::atomic_write(&snapshot_dir.join(META_FILE), &serialized)?;

        info!(
            "Created snapshot {} ({} files, {} bytes) in {:?}",
            snapshot_id,
            metadata.files_count,
            bytes,
            start.elapsed()
        );
        Ok(metadata)
    }

    /// List all valid snapshots of a workspace, newest first
    ///
    /// Ordering uses the `created_at` field from metadata (with the snapshot
    /// id as tiebreak), never directory-name comparison, so workspaces with
    /// ids of different lengths can share one store. Directories without a
    /// parseable metadata record are skipped.
    #[instrument(skip(self))]
    pub fn list(&self, workspace_id: &str) -> Result<Vec<SnapshotMetadata>> {
        validate_workspace_id(workspace_id)?;

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(metadata) = self.read_valid_metadata(&entry.path())? {
                if metadata.workspace_id == workspace_id {
                    snapshots.push(metadata);
                }
            }
        }

        snapshots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.snapshot_id.cmp(&a.snapshot_id))
        });
        debug!(
            "Listed {} snapshots for workspace '{}'",
            snapshots.len(),
            workspace_id
        );
        Ok(snapshots)
    }

    /// Delete a snapshot
    ///
    /// Fails with [`VaultError::InvalidId`] before any filesystem access if
    /// the id would resolve outside the store root, and with
    /// [`VaultError::SnapshotNotFound`] if no valid snapshot exists there.
    #[instrument(skip(self))]
    pub fn delete(&self, snapshot_id: &str) -> Result<()> {
        let snapshot_dir = self.resolve_id(snapshot_id)?;
        let metadata = self
            .read_valid_metadata(&snapshot_dir)?
            .ok_or_else(|| VaultError::SnapshotNotFound(snapshot_id.to_string()))?;

        let lock = self.workspace_lock(&metadata.workspace_id);
        let _guard = lock.lock();

        fs::remove_dir_all(&snapshot_dir)?;
        info!(
            "Deleted snapshot {} (workspace '{}')",
            snapshot_id, metadata.workspace_id
        );
        Ok(())
    }

    /// Load the metadata of a snapshot, enforcing confinement first
    pub fn metadata(&self, snapshot_id: &str) -> Result<SnapshotMetadata> {
        let snapshot_dir = self.resolve_id(snapshot_id)?;
        self.read_valid_metadata(&snapshot_dir)?
            .ok_or_else(|| VaultError::SnapshotNotFound(snapshot_id.to_string()))
    }

    /// Resolve a snapshot id to its directory, rejecting anything that is
    /// not a single normal path component directly under the store root
    pub(crate) fn resolve_id(&self, snapshot_id: &str) -> Result<PathBuf> {
        let mut components = Path::new(snapshot_id).components();
        let confined = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !confined {
            return Err(VaultError::InvalidId(snapshot_id.to_string()));
        }

        let dir = self.root.join(snapshot_id);
        if !dir.starts_with(&self.root) {
            return Err(VaultError::InvalidId(snapshot_id.to_string()));
        }
        Ok(dir)
    }

    /// Read a snapshot's metadata record, treating a missing or malformed
    /// record as "no valid snapshot here"
    pub(crate) fn read_valid_metadata(
        &self,
        snapshot_dir: &Path,
    ) -> Result<Option<SnapshotMetadata>> {
        let meta_path = snapshot_dir.join(META_FILE);
        let contents = match fs::read(&meta_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<SnapshotMetadata>(&contents) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) => {
                warn!("Malformed metadata record at {:?}: {}", meta_path, e);
                Ok(None)
            }
        }
    }

    /// A scanner configured with this store's enumeration limits
    pub(crate) fn scanner(&self, workspace_root: PathBuf) -> Scanner {
        Scanner::new(workspace_root)
            .with_max_file_size(self.max_file_size)
            .with_max_file_count(self.max_file_count)
    }

    /// The advisory lock serializing operations on one workspace
    pub(crate) fn workspace_lock(&self, workspace_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(workspace_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Copy a set of relative paths from one root to another on the bounded
    /// worker pool, returning the total bytes copied
    pub(crate) fn copy_parallel(
        &self,
        src_root: &Path,
        dest_root: &Path,
        entries: &[crate::types::FileEntry],
    ) -> Result<u64> {
        let copied: Result<Vec<u64>> = self.pool.install(|| {
            entries
                .par_iter()
                .map(|entry| {
                    utils::copy_preserving(
                        &src_root.join(&entry.path),
                        &dest_root.join(&entry.path),
                    )
                })
                .collect()
        });
        Ok(copied?.into_iter().sum())
    }

    /// Derive a unique snapshot id and reserve its directory
    ///
    /// `fs::create_dir` is the atomic arbiter: if two calls in the same
    /// second (even from different processes) derive the same id, the loser
    /// retries with a monotonic suffix spliced after the timestamp.
    fn reserve_snapshot_dir(
        &self,
        workspace_id: &str,
        created_at: &DateTime<Utc>,
        label: &str,
    ) -> Result<(String, PathBuf)> {
        let timestamp = created_at.format("%Y%m%d_%H%M%S");
        for attempt in 0u32..1000 {
            let snapshot_id = if attempt == 0 {
                format!("{}_{}_{}", workspace_id, timestamp, label)
            } else {
                format!("{}_{}-{:02}_{}", workspace_id, timestamp, attempt, label)
            };
            let dir = self.root.join(&snapshot_id);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((snapshot_id, dir)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(VaultError::internal(format!(
            "Could not reserve a unique snapshot id for workspace '{}'",
            workspace_id
        )))
    }
}
