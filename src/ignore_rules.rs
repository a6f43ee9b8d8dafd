//! Ignore-pattern compilation and matching
//!
//! An [`IgnoreSpec`] decides which relative paths participate in workspace
//! enumeration. It compiles a fixed built-in default list plus an optional
//! per-workspace override file into one matcher with version-control
//! exclusion semantics:
//!
//! - blank lines and `#` comments are skipped
//! - a trailing `/` restricts a pattern to directories (and their contents)
//! - `*` stops at `/`, `**` crosses path segments
//! - a pattern without `/` matches the basename at any depth; with `/` it is
//!   anchored at the workspace root
//! - `!` negates, and the **last** matching rule wins, so overrides can
//!   re-include any default exclusion
//!
//! The spec is a plain value compiled per call from explicit inputs; there is
//! no process-wide cached state, so concurrent workspaces with different
//! override files never interfere.

use crate::error::{Result, VaultError};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;
use tracing::{debug, trace};

/// Built-in default exclusions: version-control metadata, dependency and
/// build output directories, and binary-ish file extensions.
pub const DEFAULT_RULES: &[&str] = &[
    ".git/",
    "node_modules/",
    "dist/",
    "build/",
    "target/",
    ".venv/",
    "venv/",
    "__pycache__/",
    "*.pyc",
    "*.log",
    "*.zip",
    "*.exe",
    "*.dll",
    "*.so",
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.woff",
    "*.woff2",
    "*.ttf",
    "*.eot",
    "*.mp3",
    "*.mp4",
    "*.pdf",
];

/// Name of the per-workspace override file read by [`IgnoreSpec::for_workspace`]
pub const OVERRIDE_FILE: &str = ".gitignore";

/// Compiled set of inclusion/exclusion rules for one workspace
///
/// Rule order is significant: defaults are merged first, user overrides are
/// appended after, and evaluation keeps the last matching rule's polarity.
#[derive(Debug)]
pub struct IgnoreSpec {
    matcher: Gitignore,
    rule_count: usize,
}

impl IgnoreSpec {
    /// Compile the built-in defaults plus optional override file contents
    pub fn compile(override_contents: Option<&str>) -> Result<Self> {
        let mut builder = GitignoreBuilder::new("");
        let mut rule_count = 0;

        for rule in DEFAULT_RULES {
            add_rule(&mut builder, rule)?;
            rule_count += 1;
        }

        if let Some(contents) = override_contents {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                add_rule(&mut builder, line)?;
                rule_count += 1;
            }
        }

        let matcher = builder
            .build()
            .map_err(|e| VaultError::InvalidPattern(e.to_string()))?;

        debug!("Compiled ignore spec with {} rules", rule_count);
        Ok(Self {
            matcher,
            rule_count,
        })
    }

    /// Compile the spec in effect for a workspace root
    ///
    /// Reads the workspace's override file if present; a missing file means
    /// defaults only.
    pub fn for_workspace(workspace_root: &Path) -> Result<Self> {
        let override_path = workspace_root.join(OVERRIDE_FILE);
        let contents = match std::fs::read_to_string(&override_path) {
            Ok(c) => {
                trace!("Loaded override file {:?}", override_path);
                Some(c)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Self::compile(contents.as_deref())
    }

    /// Check whether a relative path is excluded from capture
    ///
    /// Returns true when the path itself, or any of its parent directories,
    /// is matched by an exclusion rule that no later negation re-includes.
    pub fn matches(&self, relative_path: &Path, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(relative_path, is_dir)
            .is_ignore()
    }

    /// Number of compiled rules (defaults plus overrides)
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }
}

fn add_rule(builder: &mut GitignoreBuilder, rule: &str) -> Result<()> {
    builder
        .add_line(None, rule)
        .map_err(|e| VaultError::InvalidPattern(format!("{}: {}", rule, e)))?;
    Ok(())
}
