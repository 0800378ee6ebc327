//! Store configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to its
//! default. Unknown fields are rejected so typos do not silently fall back.
//!
//! ```json
//! {
//!   "max_file_size_mb": 100.0,
//!   "max_rows_per_file": 1000000,
//!   "read_chunk_rows": 1000
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{StoreError, StoreResult};
use crate::observability::{log_event_with_fields, Event};

fn default_max_file_size_mb() -> f64 {
    100.0
}
fn default_max_rows_per_file() -> u64 {
    1_000_000
}
fn default_read_chunk_rows() -> usize {
    1000
}

/// Tunables for shard sizing and streaming reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Target upper bound on shard size in MiB. Fractional values are allowed.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: f64,

    /// Hard cap on rows per shard
    #[serde(default = "default_max_rows_per_file")]
    pub max_rows_per_file: u64,

    /// Rows fetched per chunk when streaming a shard
    #[serde(default = "default_read_chunk_rows")]
    pub read_chunk_rows: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            max_rows_per_file: default_max_rows_per_file(),
            read_chunk_rows: default_read_chunk_rows(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from a JSON file and validate it.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config = Self::from_json(&content)?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", &path.display().to_string())],
        );

        Ok(config)
    }

    /// Parse and validate configuration JSON.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let config: StoreConfig = serde_json::from_str(json)
            .map_err(|e| StoreError::Config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder-style override of the shard size bound.
    pub fn with_max_file_size_mb(mut self, mb: f64) -> Self {
        self.max_file_size_mb = mb;
        self
    }

    /// Builder-style override of the per-shard row cap.
    pub fn with_max_rows_per_file(mut self, rows: u64) -> Self {
        self.max_rows_per_file = rows;
        self
    }

    /// Builder-style override of the streaming chunk size.
    pub fn with_read_chunk_rows(mut self, rows: usize) -> Self {
        self.read_chunk_rows = rows;
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        if !self.max_file_size_mb.is_finite() || self.max_file_size_mb <= 0.0 {
            return Err(StoreError::Config(format!(
                "max_file_size_mb must be a positive number, got {}",
                self.max_file_size_mb
            )));
        }

        if self.max_rows_per_file == 0 {
            return Err(StoreError::Config("max_rows_per_file must be > 0".into()));
        }

        if self.read_chunk_rows == 0 {
            return Err(StoreError::Config("read_chunk_rows must be > 0".into()));
        }

        Ok(())
    }
}
