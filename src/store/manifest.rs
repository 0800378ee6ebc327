//! Store manifest
//!
//! `store.json` records the schema and sizing a store was written with:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "created_at": "2026-02-04T11:30:00Z",
//!   "dtype": "f64",
//!   "width": 10,
//!   "rows_per_shard": 5,
//!   "max_file_size_mb": 100.0,
//!   "max_rows_per_file": 1000000
//! }
//! ```
//!
//! Written once, atomically, when the first non-empty batch fixes the schema.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::durable::write_file_atomic;
use crate::errors::{StoreError, StoreResult};
use crate::matrix::{DType, Schema};

pub const MANIFEST_FORMAT_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub format_version: u8,

    /// Creation timestamp (YYYY-MM-DDTHH:MM:SSZ)
    pub created_at: String,

    pub dtype: DType,
    pub width: usize,

    /// Row capacity fixed from the first row
    pub rows_per_shard: u64,

    pub max_file_size_mb: f64,
    pub max_rows_per_file: u64,
}

impl StoreManifest {
    pub fn new(schema: Schema, rows_per_shard: u64, config: &StoreConfig) -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            created_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            dtype: schema.dtype,
            width: schema.width,
            rows_per_shard,
            max_file_size_mb: config.max_file_size_mb,
            max_rows_per_file: config.max_rows_per_file,
        }
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.dtype, self.width)
    }

    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            StoreError::ManifestCorrupt(format!("failed to serialize manifest: {}", e))
        })
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        let manifest: Self = serde_json::from_str(json)
            .map_err(|e| StoreError::ManifestCorrupt(format!("failed to parse manifest: {}", e)))?;

        if manifest.format_version != MANIFEST_FORMAT_VERSION {
            return Err(StoreError::ManifestCorrupt(format!(
                "unsupported manifest version {}",
                manifest.format_version
            )));
        }
        if manifest.rows_per_shard == 0 {
            return Err(StoreError::ManifestCorrupt(
                "rows_per_shard must be > 0".into(),
            ));
        }
        Ok(manifest)
    }

    pub fn write_to_file(&self, path: &Path) -> StoreResult<()> {
        write_file_atomic(path, self.to_json()?.as_bytes())
    }

    /// Reads the manifest at `path`. `None` if the store has no manifest yet.
    pub fn read_from_file(path: &Path) -> StoreResult<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io_at("read manifest", path, e)),
        }
    }
}
