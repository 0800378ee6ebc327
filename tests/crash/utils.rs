//! Shared fixtures for crash scenarios

use std::fs;
use std::path::{Path, PathBuf};

use ondiskxy::{ShardedReader, VerifyReport};
use tempfile::TempDir;

/// A temp directory holding a store path and a config capping shards at
/// `max_rows` rows.
pub struct CrashFixture {
    _dir: TempDir,
    pub store: PathBuf,
    pub config: PathBuf,
}

impl CrashFixture {
    pub fn new(max_rows: u64) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = dir.path().join("store");
        let config = dir.path().join("ondiskxy.json");
        fs::write(
            &config,
            format!(r#"{{"max_rows_per_file": {}}}"#, max_rows),
        )
        .expect("Failed to write config");

        Self {
            _dir: dir,
            store,
            config,
        }
    }
}

/// Every committed row of an f64 store, flattened.
pub fn committed_values(store: &Path) -> Vec<f64> {
    ShardedReader::open(store)
        .expect("store missing after crash")
        .read_all::<f64>()
        .expect("committed rows unreadable after crash")
        .into_vec()
}

pub fn verify(store: &Path) -> VerifyReport {
    ShardedReader::open(store)
        .expect("store missing after crash")
        .verify()
        .expect("verify failed after crash")
}
