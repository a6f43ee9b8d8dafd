//! # Snapvault - Workspace snapshot engine
//!
//! A library for capturing immutable point-in-time copies of a project
//! workspace and restoring them safely.
//!
//! ## Overview
//!
//! Snapvault decides which files in a project tree are eligible for capture
//! (an ignore-pattern matcher with version-control exclusion semantics),
//! creates snapshots with a metadata record, lists and deletes them, and
//! restores a workspace to a prior snapshot behind a safety net:
//!
//! - **Ignore semantics**: built-in defaults plus a per-workspace override
//!   file, with last-match-wins evaluation and `!`-negation re-inclusion
//! - **Deterministic enumeration**: lexically ordered listings with explicit
//!   truncation signaling and symlink-escape anomaly reporting
//! - **Crash-safe captures**: the metadata record is written last, so an
//!   interrupted capture is invisible garbage, never a half-valid snapshot
//! - **Safe restore**: confinement and existence checks up front, an
//!   automatic `pre-restore-auto` recovery snapshot, and a staged populate
//!   phase that reads the entire target snapshot before mutating anything
//! - **Path confinement**: caller-supplied identifiers are rejected before
//!   any filesystem access if they would resolve outside their root
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snapvault::{RestoreCoordinator, SnapshotStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SnapshotStore::open(PathBuf::from("./.snapvault"))?);
//!
//! // Capture the workspace
//! let snapshot = store.create(&PathBuf::from("./project"), "ws1", Some("v1"))?;
//! println!("created {} ({} files)", snapshot.snapshot_id, snapshot.files_count);
//!
//! // ... the workspace changes ...
//!
//! // Restore it; a safety snapshot is taken automatically first
//! let coordinator = RestoreCoordinator::new(Arc::clone(&store));
//! let outcome = coordinator.restore(&PathBuf::from("./project"), "ws1", &snapshot.snapshot_id)?;
//! println!("restored {} files", outcome.files_restored);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Operations are synchronous and blocking on file I/O. Create, restore, and
//! delete serialize per workspace through an internal lock registry; within
//! one operation, file copies run on a bounded worker pool. Callers may
//! invoke the store from any number of threads.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, VaultError>`. Confinement
//! ([`VaultError::InvalidId`]) and existence
//! ([`VaultError::SnapshotNotFound`]) failures happen before side effects;
//! I/O failures abort the remaining steps of a multi-step operation and
//! carry the offending path. Enumeration truncation is a flag on
//! [`ScanResult`], not an error.
//!
//! ## Module Organization
//!
//! - [`ignore_rules`]: ignore-pattern compilation and matching
//! - [`scanner`]: deterministic workspace enumeration
//! - [`store`]: snapshot creation, listing, deletion
//! - [`restore`]: the safe restore protocol
//! - [`types`]: shared data structures
//! - [`error`]: error types and handling

// Public API modules
pub mod error;
pub mod ignore_rules;
pub mod restore;
pub mod scanner;
pub mod store;
pub mod types;

// Internal modules (not part of public API)
mod utils;

// Re-export main types for convenience
pub use error::{Result, VaultError};
pub use ignore_rules::IgnoreSpec;
pub use restore::RestoreCoordinator;
pub use scanner::Scanner;
pub use store::{SnapshotStore, SnapshotStoreBuilder};
pub use types::{FileEntry, RestoreOutcome, ScanResult, SnapshotMetadata};
