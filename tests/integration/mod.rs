//! Integration tests exercising the full snapshot engine surface

use snapvault::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    workspace: TempDir,
    store_dir: TempDir,
    store: Arc<SnapshotStore>,
    coordinator: RestoreCoordinator,
}

impl Harness {
    fn new() -> Self {
        let workspace = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let store = Arc::new(SnapshotStore::open(store_dir.path().to_path_buf()).unwrap());
        let coordinator = RestoreCoordinator::new(Arc::clone(&store));
        Self {
            workspace,
            store_dir,
            store,
            coordinator,
        }
    }

    fn root(&self) -> &Path {
        self.workspace.path()
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap()
    }
}

/// The concrete scenario from the engine's contract: two captured files, one
/// ignored file, a mutation, a restore, and a safety snapshot of the mutated
/// state.
#[test]
fn test_capture_mutate_restore_scenario() {
    let h = Harness::new();
    h.write("a.txt", "1");
    h.write("b/c.txt", "2");
    h.write("node_modules/d.txt", "ignored");

    let v1 = h.store.create(h.root(), "ws1", Some("v1")).unwrap();
    assert_eq!(v1.files_count, 2);

    h.write("a.txt", "99");

    let outcome = h
        .coordinator
        .restore(h.root(), "ws1", &v1.snapshot_id)
        .unwrap();
    assert_eq!(h.read("a.txt"), "1");
    assert_eq!(h.read("b/c.txt"), "2");
    assert_eq!(outcome.files_restored, 2);

    // The safety snapshot captured the mutated state
    let listed = h.store.list("ws1").unwrap();
    assert_eq!(listed.len(), 2);
    let safety = listed
        .iter()
        .find(|m| m.label == "pre-restore-auto")
        .expect("safety snapshot must be listed");
    let captured_a = h
        .store_dir
        .path()
        .join(&safety.snapshot_id)
        .join("a.txt");
    assert_eq!(fs::read_to_string(captured_a).unwrap(), "99");

    // The ignored file survived the restore untouched
    assert_eq!(h.read("node_modules/d.txt"), "ignored");
}

#[test]
fn test_restore_is_byte_identical() {
    let h = Harness::new();
    h.write("src/main.rs", "fn main() {}\n");
    h.write("README.md", "# project\n");
    h.write("data/blob.bin", "\u{0}\u{1}\u{2}binary-ish");

    let snapshot = h.store.create(h.root(), "ws1", Some("baseline")).unwrap();

    let originals: Vec<(PathBuf, Vec<u8>)> = ["src/main.rs", "README.md", "data/blob.bin"]
        .iter()
        .map(|rel| {
            (
                PathBuf::from(rel),
                fs::read(h.root().join(rel)).unwrap(),
            )
        })
        .collect();

    h.coordinator
        .restore(h.root(), "ws1", &snapshot.snapshot_id)
        .unwrap();

    for (rel, content) in originals {
        assert_eq!(fs::read(h.root().join(&rel)).unwrap(), content, "{:?}", rel);
    }
}

#[test]
fn test_create_list_metadata_equality() {
    let h = Harness::new();
    h.write("a.txt", "a");

    let created = h.store.create(h.root(), "ws1", Some("tag")).unwrap();
    let listed = h.store.list("ws1").unwrap();

    assert_eq!(listed, vec![created.clone()]);
    assert_eq!(h.store.metadata(&created.snapshot_id).unwrap(), created);
}

#[test]
fn test_delete_then_restore_is_not_found() {
    let h = Harness::new();
    h.write("a.txt", "a");

    let snapshot = h.store.create(h.root(), "ws1", None).unwrap();
    h.store.delete(&snapshot.snapshot_id).unwrap();

    assert!(h.store.list("ws1").unwrap().is_empty());
    let err = h
        .coordinator
        .restore(h.root(), "ws1", &snapshot.snapshot_id)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_confinement_on_both_entry_points() {
    let h = Harness::new();
    h.write("a.txt", "a");

    for id in ["../../etc", "..", "nested/id"] {
        assert!(h.store.delete(id).unwrap_err().is_invalid_id());
        assert!(h
            .coordinator
            .restore(h.root(), "ws1", id)
            .unwrap_err()
            .is_invalid_id());
    }
    // No snapshot (not even a safety one) was created along the way
    assert!(h.store.list("ws1").unwrap().is_empty());
}

#[test]
fn test_override_negation_round_trip() {
    let h = Harness::new();
    h.write(".gitignore", "*.txt\n!keep.txt\n");
    h.write("keep.txt", "kept");
    h.write("drop.txt", "dropped");
    h.write("code.rs", "code");

    let snapshot = h.store.create(h.root(), "ws1", None).unwrap();
    let dir = h.store_dir.path().join(&snapshot.snapshot_id);

    assert!(dir.join("keep.txt").exists());
    assert!(dir.join("code.rs").exists());
    assert!(!dir.join("drop.txt").exists());
}

#[test]
fn test_snapshots_of_multiple_workspaces_share_one_store() {
    let h = Harness::new();
    let other_workspace = TempDir::new().unwrap();
    fs::write(other_workspace.path().join("x.txt"), "x").unwrap();
    h.write("a.txt", "a");

    h.store.create(h.root(), "ws", None).unwrap();
    h.store
        .create(other_workspace.path(), "ws-with-longer-id", None)
        .unwrap();
    h.store.create(h.root(), "ws", None).unwrap();

    assert_eq!(h.store.list("ws").unwrap().len(), 2);
    assert_eq!(h.store.list("ws-with-longer-id").unwrap().len(), 1);
}

#[test]
fn test_scan_limits_via_store_builder() {
    let h = Harness::new();
    for i in 0..10 {
        h.write(&format!("f{:02}.txt", i), "x");
    }

    let limited_store_dir = TempDir::new().unwrap();
    let store = SnapshotStoreBuilder::new()
        .max_file_count(4)
        .build(limited_store_dir.path().to_path_buf())
        .unwrap();

    let meta = store.create(h.root(), "ws1", None).unwrap();
    assert_eq!(meta.files_count, 4);
}

#[test]
fn test_restore_recreates_deleted_subtrees() {
    let h = Harness::new();
    h.write("deep/nested/tree/file.txt", "payload");

    let snapshot = h.store.create(h.root(), "ws1", None).unwrap();
    fs::remove_dir_all(h.root().join("deep")).unwrap();

    let outcome = h
        .coordinator
        .restore(h.root(), "ws1", &snapshot.snapshot_id)
        .unwrap();
    assert_eq!(outcome.files_restored, 1);
    assert_eq!(h.read("deep/nested/tree/file.txt"), "payload");
}

#[test]
fn test_empty_workspace_capture_and_restore() {
    let h = Harness::new();

    let snapshot = h.store.create(h.root(), "ws1", Some("empty")).unwrap();
    assert_eq!(snapshot.files_count, 0);

    h.write("late.txt", "late");
    let outcome = h
        .coordinator
        .restore(h.root(), "ws1", &snapshot.snapshot_id)
        .unwrap();

    assert_eq!(outcome.files_restored, 0);
    assert!(!h.root().join("late.txt").exists());
}

#[test]
fn test_mtime_preserved_through_capture() {
    let h = Harness::new();
    h.write("a.txt", "a");
    let src = h.root().join("a.txt");
    let old = filetime::FileTime::from_unix_time(1_400_000_000, 0);
    filetime::set_file_mtime(&src, old).unwrap();

    let snapshot = h.store.create(h.root(), "ws1", None).unwrap();
    let captured = h.store_dir.path().join(&snapshot.snapshot_id).join("a.txt");
    let meta = fs::metadata(captured).unwrap();
    assert_eq!(filetime::FileTime::from_last_modification_time(&meta), old);
}

#[test]
fn test_label_sanitization_in_ids() {
    let h = Harness::new();
    h.write("a.txt", "a");

    let meta = h
        .store
        .create(h.root(), "ws1", Some("release / über build!"))
        .unwrap();

    assert!(meta
        .label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    assert!(meta.label.len() <= 40);
    assert!(meta.snapshot_id.ends_with(&meta.label));
}

#[test]
fn test_concurrent_creates_serialize_per_workspace() {
    let h = Harness::new();
    h.write("a.txt", "a");

    let root = h.root().to_path_buf();
    let store = Arc::clone(&h.store);
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            let root = root.clone();
            std::thread::spawn(move || {
                store
                    .create(&root, "ws1", Some(&format!("t{}", i)))
                    .unwrap()
            })
        })
        .collect();

    let mut ids: Vec<String> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().snapshot_id)
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(h.store.list("ws1").unwrap().len(), 4);
}
