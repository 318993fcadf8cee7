use std::fs;

use rem::error::RemError;
use rem::fs::DiskFs;
use rem::migrate::migrate_legacy;
use rem::StackManager;
use tempfile::TempDir;

fn setup() -> (TempDir, DiskFs) {
    let dir = TempDir::new().unwrap();
    let fs = DiskFs::with_root(dir.path().to_str().unwrap()).unwrap();
    (dir, fs)
}

#[test]
fn test_migration_copies_legacy_files() {
    let (dir, fs) = setup();
    fs::create_dir_all(dir.path().join("content")).unwrap();
    fs::write(dir.path().join("content/A.txt"), "alpha").unwrap();
    fs::write(dir.path().join("content/B.txt"), "beta").unwrap();

    migrate_legacy(&fs).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("history/A.txt")).unwrap(),
        "alpha"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("history/B.txt")).unwrap(),
        "beta"
    );
    assert!(dir.path().join(".migration_complete").exists());

    // The legacy side is never deleted.
    assert!(dir.path().join("content/A.txt").exists());
    assert!(dir.path().join("content/B.txt").exists());
}

#[test]
fn test_migration_reinit_is_a_noop() {
    let (dir, fs) = setup();
    fs::create_dir_all(dir.path().join("content")).unwrap();
    fs::write(dir.path().join("content/A.txt"), "alpha").unwrap();

    migrate_legacy(&fs).unwrap();

    // Mutate the migrated copy, then run again: nothing may change.
    fs::write(dir.path().join("history/A.txt"), "edited").unwrap();
    migrate_legacy(&fs).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("history/A.txt")).unwrap(),
        "edited"
    );
}

#[test]
fn test_migration_conflict_modifies_nothing() {
    let (dir, fs) = setup();
    fs::create_dir_all(dir.path().join("content")).unwrap();
    fs::create_dir_all(dir.path().join("history")).unwrap();
    fs::write(dir.path().join("content/A.txt"), "alpha").unwrap();
    fs::write(dir.path().join("history/B.txt"), "beta").unwrap();

    let err = migrate_legacy(&fs).unwrap_err();
    assert!(matches!(err, RemError::MigrationConflict { .. }));

    assert_eq!(
        fs::read_to_string(dir.path().join("content/A.txt")).unwrap(),
        "alpha"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("history/B.txt")).unwrap(),
        "beta"
    );
    assert!(!dir.path().join("history/A.txt").exists());
    assert!(!dir.path().join(".migration_complete").exists());
}

#[test]
fn test_migration_without_legacy_dir() {
    let (dir, fs) = setup();
    migrate_legacy(&fs).unwrap();
    assert!(!dir.path().join(".migration_complete").exists());
}

#[test]
fn test_migrated_store_lists_migrated_items() {
    let (dir, fs) = setup();
    // A legacy store whose filenames already follow the timestamp format.
    fs::create_dir_all(dir.path().join("content")).unwrap();
    fs::write(
        dir.path().join("content/2024-03-01T09-15-30.123456Z.txt"),
        "Migrated note",
    )
    .unwrap();

    migrate_legacy(&fs).unwrap();
    let manager = StackManager::with_fs(fs).unwrap();

    let items = manager.list().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Migrated note");
    assert_eq!(items[0].id, "2024-03-01T09-15-30.123456Z");
}

#[test]
fn test_open_at_custom_root_skips_migration() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("content")).unwrap();
    fs::write(dir.path().join("content/A.txt"), "alpha").unwrap();

    let manager = StackManager::open_at(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(manager.size().unwrap(), 0);

    // Custom roots never trigger the legacy copy.
    assert!(!dir.path().join("history/A.txt").exists());
    assert!(!dir.path().join(".migration_complete").exists());
}
