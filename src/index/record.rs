//! Index record type
//!
//! Persisted as a 3-element JSON array `[shard_id, start_row, end_row]`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Global row range `start_row..end_row` (end exclusive) held by one shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u64; 3]", into = "[u64; 3]")]
pub struct IndexRecord {
    pub shard_id: u64,
    pub start_row: u64,
    pub end_row: u64,
}

impl IndexRecord {
    pub fn new(shard_id: u64, start_row: u64, end_row: u64) -> Self {
        Self {
            shard_id,
            start_row,
            end_row,
        }
    }

    /// Number of rows the record covers.
    pub fn rows(&self) -> u64 {
        self.end_row.saturating_sub(self.start_row)
    }

    /// Whether global row `row` falls in this record.
    pub fn contains(&self, row: u64) -> bool {
        self.start_row <= row && row < self.end_row
    }
}

impl From<[u64; 3]> for IndexRecord {
    fn from(raw: [u64; 3]) -> Self {
        Self::new(raw[0], raw[1], raw[2])
    }
}

impl From<IndexRecord> for [u64; 3] {
    fn from(record: IndexRecord) -> Self {
        [record.shard_id, record.start_row, record.end_row]
    }
}

impl fmt::Display for IndexRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shard {} rows {}..{}",
            self.shard_id, self.start_row, self.end_row
        )
    }
}
