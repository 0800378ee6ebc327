//! Writer and shard crash scenarios
//!
//! Input: three single-column batches, `[[1],[2]]`, `[[3]]`, `[[4]]`.

use crate::crash::harness::{read_lines, write_with_crash_point};
use crate::crash::utils::{committed_values, verify, CrashFixture};

const INPUT: &str = "[[1], [2]]\n[[3]]\n[[4]]\n";

#[test]
fn test_no_crash_baseline() {
    let fixture = CrashFixture::new(2);
    let result = write_with_crash_point(None, &fixture.store, &fixture.config, INPUT);

    assert!(!result.crashed, "stderr: {}", result.stderr);
    assert!(result.exit_status.map(|s| s.success()).unwrap_or(false));
    let summary: serde_json::Value = serde_json::from_str(&result.stdout).unwrap();
    assert_eq!(summary["rows"], 4);
    assert_eq!(summary["shards"], 2);

    assert_eq!(committed_values(&fixture.store), vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(read_lines(&fixture.store), vec!["[1.0]", "[2.0]", "[3.0]", "[4.0]"]);
    assert!(verify(&fixture.store).is_clean());
}

/// Second batch lands in a fresh shard, then the process dies before the
/// index names it.
#[test]
fn test_crash_after_shard_append_hides_rows() {
    let fixture = CrashFixture::new(2);
    let result = write_with_crash_point(
        Some("store_after_shard_append:2"),
        &fixture.store,
        &fixture.config,
        INPUT,
    );

    assert!(result.crashed);
    assert!(result.stderr.contains("store_after_shard_append"));
    assert_eq!(committed_values(&fixture.store), vec![1.0, 2.0]);

    let report = verify(&fixture.store);
    assert_eq!(report.total_rows, 2);
    assert_eq!(report.orphan_shards, vec![1]);
}

/// Same crash while appending to the already active shard.
#[test]
fn test_crash_after_shard_append_same_shard() {
    let fixture = CrashFixture::new(10);
    let result = write_with_crash_point(
        Some("store_after_shard_append:2"),
        &fixture.store,
        &fixture.config,
        INPUT,
    );

    assert!(result.crashed);
    assert_eq!(committed_values(&fixture.store), vec![1.0, 2.0]);

    let report = verify(&fixture.store);
    assert_eq!(report.shards.len(), 1);
    assert_eq!(report.shards[0].rows_on_disk, 3);
    assert_eq!(report.shards[0].uncommitted_rows, 1);
}

/// Payload written, header never updated.
#[test]
fn test_crash_before_header_update() {
    let fixture = CrashFixture::new(10);
    let result = write_with_crash_point(
        Some("shard_before_header_update:2"),
        &fixture.store,
        &fixture.config,
        INPUT,
    );

    assert!(result.crashed);
    assert_eq!(committed_values(&fixture.store), vec![1.0, 2.0]);

    let report = verify(&fixture.store);
    assert_eq!(report.shards[0].rows_on_disk, 2);
    assert_eq!(report.shards[0].trailing_bytes, 8);
    assert!(!report.is_clean());
}

/// A crashed store is replaced cleanly by the next writer.
#[test]
fn test_rewrite_after_crash() {
    let fixture = CrashFixture::new(2);
    let crashed = write_with_crash_point(
        Some("store_after_shard_append:3"),
        &fixture.store,
        &fixture.config,
        INPUT,
    );
    assert!(crashed.crashed);

    let result = write_with_crash_point(None, &fixture.store, &fixture.config, INPUT);
    assert!(!result.crashed, "stderr: {}", result.stderr);
    assert_eq!(committed_values(&fixture.store), vec![1.0, 2.0, 3.0, 4.0]);
    assert!(verify(&fixture.store).is_clean());
}
