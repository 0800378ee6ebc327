//! Atomic index rewrite crash scenarios
//!
//! Rewrites in a session, in order:
//! 1. empty index on create
//! 2. manifest on the first batch
//! 3. index after the first batch
//! 4. index after the second batch

use crate::crash::harness::write_with_crash_point;
use crate::crash::utils::{committed_values, verify, CrashFixture};

const INPUT: &str = "[[1], [2]]\n[[3]]\n";

/// Old index survives; the temp file is ignored.
#[test]
fn test_crash_before_index_rename() {
    let fixture = CrashFixture::new(10);
    let result = write_with_crash_point(
        Some("meta_before_rename:4"),
        &fixture.store,
        &fixture.config,
        INPUT,
    );

    assert!(result.crashed);
    assert!(fixture.store.join("index.json.tmp").exists());
    assert_eq!(committed_values(&fixture.store), vec![1.0, 2.0]);
    assert_eq!(verify(&fixture.store).uncommitted_rows(), 1);
}

/// New index is in place once the rename happened.
#[test]
fn test_crash_after_index_rename() {
    let fixture = CrashFixture::new(10);
    let result = write_with_crash_point(
        Some("meta_after_rename:4"),
        &fixture.store,
        &fixture.config,
        INPUT,
    );

    assert!(result.crashed);
    assert!(!fixture.store.join("index.json.tmp").exists());
    assert_eq!(committed_values(&fixture.store), vec![1.0, 2.0, 3.0]);
    assert!(verify(&fixture.store).is_clean());
}

/// Crash before the very first index exists: the store reads as empty.
#[test]
fn test_crash_during_create() {
    let fixture = CrashFixture::new(10);
    let result = write_with_crash_point(
        Some("meta_before_rename"),
        &fixture.store,
        &fixture.config,
        INPUT,
    );

    assert!(result.crashed);
    assert!(!fixture.store.join("index.json").exists());
    assert!(committed_values(&fixture.store).is_empty());

    // Leftovers are recognised as store files and replaced
    let result = write_with_crash_point(None, &fixture.store, &fixture.config, INPUT);
    assert!(!result.crashed, "stderr: {}", result.stderr);
    assert_eq!(committed_values(&fixture.store), vec![1.0, 2.0, 3.0]);
}

/// Crash while the manifest is written: no rows committed yet.
#[test]
fn test_crash_before_manifest_rename() {
    let fixture = CrashFixture::new(10);
    let result = write_with_crash_point(
        Some("meta_before_rename:2"),
        &fixture.store,
        &fixture.config,
        INPUT,
    );

    assert!(result.crashed);
    assert!(!fixture.store.join("store.json").exists());
    assert!(committed_values(&fixture.store).is_empty());
}
