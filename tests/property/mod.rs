//! Property-based tests for engine invariants

use proptest::prelude::*;
use snapvault::types::sanitize_label;
use snapvault::{IgnoreSpec, Scanner};
use std::fs;
use tempfile::TempDir;

proptest! {
    /// Sanitized labels always reduce to the safe-character subset and the
    /// length bound, for any input including unicode.
    #[test]
    fn prop_sanitize_label_is_bounded_and_safe(label in ".*") {
        let sanitized = sanitize_label(Some(&label));
        prop_assert!(!sanitized.is_empty());
        prop_assert!(sanitized.len() <= 40);
        prop_assert!(sanitized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    /// Sanitization is idempotent: sanitizing a sanitized label is a no-op.
    #[test]
    fn prop_sanitize_label_idempotent(label in ".*") {
        let once = sanitize_label(Some(&label));
        prop_assert_eq!(sanitize_label(Some(&once)), once);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// For any generated tree and size limit, enumeration never returns a
    /// path the ignore spec excludes, never returns an oversized file, and
    /// is deterministic.
    #[test]
    fn prop_scan_respects_spec_and_limits(
        files in prop::collection::btree_map(
            "[a-z]{1,8}",
            (prop::sample::select(vec!["txt", "rs", "log", "pyc", "md"]), 0usize..64),
            1..12,
        ),
        max_size in 8u64..64,
    ) {
        let workspace = TempDir::new().unwrap();
        for (stem, (ext, len)) in &files {
            let name = format!("{}.{}", stem, ext);
            fs::write(workspace.path().join(name), "x".repeat(*len)).unwrap();
        }

        let spec = IgnoreSpec::compile(None).unwrap();
        let scanner = Scanner::new(workspace.path().to_path_buf())
            .with_max_file_size(max_size);
        let result = scanner.scan(&spec).unwrap();

        for entry in &result.entries {
            prop_assert!(!spec.matches(&entry.path, false), "{:?}", entry.path);
            prop_assert!(entry.size <= max_size);
        }

        let mut sorted = result.entries.clone();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        prop_assert_eq!(&result.entries, &sorted);

        let again = scanner.scan(&spec).unwrap();
        prop_assert_eq!(result.entries, again.entries);
    }
}
