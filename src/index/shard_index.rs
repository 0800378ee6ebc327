//! Ordered shard index
//!
//! Maps global row ranges to the shards that hold them. The on-disk index is
//! the durable source of truth: writers read it, mutate it and rewrite it in
//! full after every shard append; readers load it fresh on every call.
//!
//! # Invariants
//!
//! - Records ordered by `shard_id`, strictly ascending
//! - `records[0].start_row == 0`
//! - `records[i].end_row == records[i + 1].start_row` (no gaps, no overlaps)
//! - One record per shard; appends to the last shard extend it in place

use std::path::Path;

use super::record::IndexRecord;
use crate::durable::write_file_atomic;
use crate::errors::{StoreError, StoreResult};
use crate::observability::{log_event_with_fields, Event};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardIndex {
    records: Vec<IndexRecord>,
}

impl ShardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from records, checking every invariant.
    ///
    /// # Errors
    ///
    /// `IndexCorrupt` naming the first offending record.
    pub fn from_records(records: Vec<IndexRecord>) -> StoreResult<Self> {
        let mut expected_start = 0;
        let mut prev_id: Option<u64> = None;

        for (i, record) in records.iter().enumerate() {
            if record.end_row < record.start_row {
                return Err(StoreError::IndexCorrupt(format!(
                    "record {} ({}) ends before it starts",
                    i, record
                )));
            }
            if record.start_row != expected_start {
                return Err(StoreError::IndexCorrupt(format!(
                    "record {} ({}) starts at {}, expected {}",
                    i, record, record.start_row, expected_start
                )));
            }
            if let Some(prev) = prev_id {
                if record.shard_id <= prev {
                    return Err(StoreError::IndexCorrupt(format!(
                        "record {} ({}) does not follow shard {}",
                        i, record, prev
                    )));
                }
            }
            expected_start = record.end_row;
            prev_id = Some(record.shard_id);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of shards the index references.
    pub fn shard_count(&self) -> usize {
        self.records.len()
    }

    /// Total rows committed across all shards.
    pub fn total_rows(&self) -> u64 {
        self.records.last().map(|r| r.end_row).unwrap_or(0)
    }

    pub fn last(&self) -> Option<&IndexRecord> {
        self.records.last()
    }

    /// Records that `shard_id` now holds global rows `start_row..end_row`.
    ///
    /// Extends the last record when it belongs to the same shard, otherwise
    /// appends a new record.
    ///
    /// # Errors
    ///
    /// `IndexGap` if the range does not start where the index ends, or if a
    /// new record's shard id does not exceed the last one.
    pub fn append_or_extend(
        &mut self,
        shard_id: u64,
        start_row: u64,
        end_row: u64,
    ) -> StoreResult<()> {
        if end_row < start_row {
            return Err(StoreError::IndexGap(format!(
                "range {}..{} for shard {} is reversed",
                start_row, end_row, shard_id
            )));
        }

        let total = self.total_rows();
        if start_row != total {
            return Err(StoreError::IndexGap(format!(
                "shard {} range starts at {} but index ends at {}",
                shard_id, start_row, total
            )));
        }

        if let Some(last) = self.records.last_mut() {
            if last.shard_id == shard_id {
                last.end_row = end_row;
                return Ok(());
            }
            if shard_id < last.shard_id {
                return Err(StoreError::IndexGap(format!(
                    "shard {} cannot follow shard {}",
                    shard_id, last.shard_id
                )));
            }
        }

        self.records
            .push(IndexRecord::new(shard_id, start_row, end_row));
        Ok(())
    }

    /// Shard ids in ascending order. The sequence is finite and can be
    /// restarted by calling again or by cloning it.
    pub fn shard_ids_in_order(&self) -> ShardIds<'_> {
        ShardIds {
            inner: self.records.iter(),
        }
    }

    /// Returns the record holding global row `row`.
    pub fn locate(&self, row: u64) -> Option<&IndexRecord> {
        let pos = self.records.partition_point(|r| r.end_row <= row);
        self.records.get(pos).filter(|r| r.contains(row))
    }

    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(&self.records)
            .map_err(|e| StoreError::IndexCorrupt(format!("failed to serialize index: {}", e)))
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        let records: Vec<IndexRecord> = serde_json::from_str(json)
            .map_err(|e| StoreError::IndexCorrupt(format!("failed to parse index: {}", e)))?;
        Self::from_records(records)
    }

    /// Loads the index from `path`. A missing file is an empty index.
    pub fn load(path: &Path) -> StoreResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(StoreError::io_at("read index", path, e)),
        }
    }

    /// Rewrites the whole index at `path` atomically.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let json = self.to_json()?;
        write_file_atomic(path, json.as_bytes())?;

        log_event_with_fields(
            Event::IndexRewrite,
            &[
                ("records", &self.records.len().to_string()),
                ("total_rows", &self.total_rows().to_string()),
            ],
        );
        Ok(())
    }
}

/// Iterator over shard ids in index order.
#[derive(Debug, Clone)]
pub struct ShardIds<'a> {
    inner: std::slice::Iter<'a, IndexRecord>,
}

impl Iterator for ShardIds<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.inner.next().map(|r| r.shard_id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ShardIds<'_> {}
