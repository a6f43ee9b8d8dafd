//! Core data types shared across the snapshot engine
//!
//! ## Overview
//!
//! - **Enumeration**: [`FileEntry`], [`ScanResult`] — transient results of a
//!   workspace scan, never persisted on their own.
//! - **Snapshots**: [`SnapshotMetadata`] — the fixed-field record that makes
//!   a snapshot valid; written last during creation.
//! - **Operations**: [`RestoreOutcome`] — result of a completed restore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum length of a sanitized snapshot label
pub const MAX_LABEL_LEN: usize = 40;

/// Label applied to the automatic safety snapshot taken before a restore
pub const PRE_RESTORE_LABEL: &str = "pre-restore-auto";

/// A single capture-eligible file discovered by a workspace scan
///
/// The path is relative to the workspace root and uses forward slashes on
/// every platform so snapshots remain comparable across machines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    /// Relative path from the workspace root (forward-slash normalized)
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Result of enumerating a workspace
///
/// Entries are ordered lexically by relative path so repeated scans of an
/// unchanged tree produce identical, diffable output.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Files eligible for capture, lexically ordered
    pub entries: Vec<FileEntry>,
    /// True if enumeration stopped early because the file-count limit was hit
    pub truncated: bool,
    /// Symlinks whose resolved target escapes the workspace root (or cannot
    /// be resolved); excluded from `entries` but reported, never silently
    /// dropped
    pub anomalies: Vec<PathBuf>,
}

impl ScanResult {
    /// Total size in bytes of all enumerated files
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

/// Metadata record of a snapshot
///
/// Stored as a JSON file inside the snapshot directory. A snapshot directory
/// without a parseable record is treated as nonexistent by every operation:
/// the record is written last during creation, so its absence after a crash
/// marks the snapshot as incomplete garbage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotMetadata {
    /// Opaque id of the workspace this snapshot belongs to
    pub workspace_id: String,
    /// Unique snapshot id; also the snapshot's directory name in the store
    pub snapshot_id: String,
    /// Sanitized label (subset of `[A-Za-z0-9_-]`, at most 40 chars)
    pub label: String,
    /// Creation timestamp (RFC 3339 on disk, sortable)
    pub created_at: DateTime<Utc>,
    /// Number of files captured in the snapshot
    pub files_count: usize,
}

/// Result of a completed restore operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreOutcome {
    /// Id of the snapshot that was restored
    pub snapshot_id: String,
    /// Number of files written during the populate phase
    pub files_restored: usize,
    /// Metadata of the safety snapshot taken before any workspace mutation
    pub safety_snapshot: SnapshotMetadata,
    /// Time taken for the restore in milliseconds
    pub duration_ms: u64,
}

/// Sanitize a snapshot label to a bounded safe-character subset
///
/// Every character outside `[A-Za-z0-9_-]` becomes `_`, the result is
/// truncated to [`MAX_LABEL_LEN`] characters, and an absent or empty label
/// falls back to `"manual"`.
pub fn sanitize_label(label: Option<&str>) -> String {
    let raw = label.unwrap_or("").trim();
    if raw.is_empty() {
        return "manual".to_string();
    }
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_LABEL_LEN)
        .collect()
}

/// Validate a caller-supplied workspace id before it is embedded in
/// snapshot ids and metadata
///
/// Workspace ids participate in directory names, so anything outside
/// `[A-Za-z0-9._-]` (or an empty or dot-only id) is rejected up front.
pub fn validate_workspace_id(workspace_id: &str) -> crate::error::Result<()> {
    let ok = !workspace_id.is_empty()
        && workspace_id != "."
        && workspace_id != ".."
        && workspace_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(crate::error::VaultError::InvalidWorkspaceId(
            workspace_id.to_string(),
        ))
    }
}
