//! Sharded store reader
//!
//! Reconstructs the logical matrix from the shards the index names. Every
//! call loads the index afresh, so a reader sees whatever a writer has
//! committed by then. Only rows the index commits are returned: rows a shard
//! holds past its index record are invisible.

use std::path::Path;

use serde::Serialize;

use super::layout::StoreLayout;
use super::manifest::StoreManifest;
use crate::config::StoreConfig;
use crate::errors::{StoreError, StoreResult};
use crate::index::{IndexRecord, ShardIndex};
use crate::matrix::{Element, Matrix, Schema};
use crate::observability::{log_event_with_fields, Event};
use crate::shard::{ShardChunks, ShardHandle};

#[derive(Debug, Clone)]
pub struct ShardedReader {
    layout: StoreLayout,
    chunk_rows: usize,
}

impl ShardedReader {
    /// Opens the store at `dir` for reading.
    ///
    /// # Errors
    ///
    /// `StoreNotFound` if `dir` is not a directory.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(StoreError::StoreNotFound(dir.to_path_buf()));
        }
        Ok(Self {
            layout: StoreLayout::new(dir),
            chunk_rows: StoreConfig::default().read_chunk_rows,
        })
    }

    /// Rows fetched per chunk by the streaming readers. Clamped to at least 1.
    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn chunk_rows(&self) -> usize {
        self.chunk_rows
    }

    pub fn index(&self) -> StoreResult<ShardIndex> {
        ShardIndex::load(&self.layout.index_path())
    }

    /// The store manifest, or `None` if nothing has been appended yet.
    pub fn manifest(&self) -> StoreResult<Option<StoreManifest>> {
        StoreManifest::read_from_file(&self.layout.manifest_path())
    }

    /// Committed row count.
    pub fn len(&self) -> StoreResult<u64> {
        Ok(self.index()?.total_rows())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads every committed row, shard by shard in index order.
    pub fn read_all<T: Element>(&self) -> StoreResult<Matrix<T>> {
        let width = self.check_element::<T>()?;
        let index = self.index()?;

        let mut out = Matrix::empty(width);
        for (shard_id, record) in index.shard_ids_in_order().zip(index.records()) {
            let mut handle = self.open_committed(shard_id, record)?;
            out.extend_rows(&handle.read_range(0, record.rows())?)?;
        }

        log_event_with_fields(
            Event::ReadComplete,
            &[
                ("path", &self.layout.root().display().to_string()),
                ("rows", &out.rows().to_string()),
                ("shards", &index.shard_count().to_string()),
            ],
        );
        Ok(out)
    }

    /// Lazily streams committed rows in chunks of at most `chunk_rows` rows.
    ///
    /// Each call starts again from row 0 against a fresh index.
    pub fn iter_chunks<T: Element>(&self) -> StoreResult<StoreChunks<T>> {
        self.check_element::<T>()?;
        let index = self.index()?;
        Ok(StoreChunks {
            reader: self.clone(),
            records: index.records().to_vec().into_iter(),
            current: None,
            done: false,
        })
    }

    /// Lazily streams committed rows one at a time.
    pub fn iter_rows<T: Element>(&self) -> StoreResult<StoreRows<T>> {
        Ok(StoreRows {
            chunks: self.iter_chunks()?,
            current: None,
            pos: 0,
        })
    }

    /// Reads global rows `start..end` (end exclusive), crossing shard
    /// boundaries as needed.
    ///
    /// # Errors
    ///
    /// `RowOutOfRange` if `start > end` or `end` exceeds the committed rows.
    pub fn read_range<T: Element>(&self, start: u64, end: u64) -> StoreResult<Matrix<T>> {
        let width = self.check_element::<T>()?;
        let index = self.index()?;
        let total = index.total_rows();
        if start > end || end > total {
            return Err(StoreError::RowOutOfRange {
                row: end.max(start),
                total,
            });
        }

        let mut out = Matrix::empty(width);
        let overlapping = index
            .records()
            .iter()
            .filter(|r| r.end_row > start && r.start_row < end);
        for record in overlapping {
            let local_start = start.max(record.start_row) - record.start_row;
            let local_end = end.min(record.end_row) - record.start_row;
            let mut handle = self.open_committed(record.shard_id, record)?;
            out.extend_rows(&handle.read_range(local_start, local_end)?)?;
        }
        Ok(out)
    }

    /// Reads one global row.
    pub fn read_row<T: Element>(&self, row: u64) -> StoreResult<Vec<T>> {
        let end = row.checked_add(1).ok_or(StoreError::RowOutOfRange {
            row,
            total: self.len()?,
        })?;
        Ok(self.read_range(row, end)?.into_vec())
    }

    /// Gathers arbitrary global rows in the order given. Duplicates are kept.
    ///
    /// Every index is range-checked before any shard is opened.
    pub fn read_rows<T: Element>(&self, rows: &[u64]) -> StoreResult<Matrix<T>> {
        let width = self.check_element::<T>()?;
        let index = self.index()?;
        let total = index.total_rows();
        if let Some(&row) = rows.iter().find(|&&row| row >= total) {
            return Err(StoreError::RowOutOfRange { row, total });
        }

        let mut out = Matrix::empty(width);
        let mut cached: Option<(u64, ShardHandle)> = None;

        for &row in rows {
            let record = index
                .locate(row)
                .ok_or(StoreError::RowOutOfRange { row, total })?;

            let handle = match cached.take() {
                Some((id, handle)) if id == record.shard_id => handle,
                _ => self.open_committed(record.shard_id, record)?,
            };
            let local = row - record.start_row;
            let cached_handle = cached.insert((record.shard_id, handle));
            out.extend_rows(&cached_handle.1.read_range(local, local + 1)?)?;
        }
        Ok(out)
    }

    /// Walks every indexed shard and checks it against the index.
    ///
    /// Fails on the first missing or corrupt shard. Rows on disk beyond what
    /// the index commits, and shard files the index does not name, are
    /// reported rather than treated as errors.
    pub fn verify(&self) -> StoreResult<VerifyReport> {
        let index = self.index()?;
        let manifest = self.manifest()?;
        let expected = manifest.as_ref().map(StoreManifest::schema);

        let mut shards = Vec::with_capacity(index.shard_count());
        for record in index.records() {
            let handle = self.open_committed(record.shard_id, record)?;
            if let Some(schema) = expected {
                if handle.schema() != schema {
                    let path = self.layout.shard_path(record.shard_id);
                    self.log_corruption(record, "schema differs from manifest");
                    return Err(StoreError::corrupt_shard(
                        &path,
                        format!("holds {}, manifest says {}", handle.schema(), schema),
                    ));
                }
            }

            shards.push(ShardReport {
                shard_id: record.shard_id,
                start_row: record.start_row,
                end_row: record.end_row,
                rows_on_disk: handle.row_count(),
                uncommitted_rows: handle.row_count() - record.rows(),
                trailing_bytes: handle.trailing_bytes()?,
            });
        }

        let indexed: Vec<u64> = index.shard_ids_in_order().collect();
        let orphan_shards: Vec<u64> = self
            .layout
            .shard_ids_on_disk()?
            .into_iter()
            .filter(|id| indexed.binary_search(id).is_err())
            .collect();

        let report = VerifyReport {
            schema: expected.map(|s| s.to_string()),
            total_rows: index.total_rows(),
            shards,
            orphan_shards,
        };

        if !report.is_clean() {
            log_event_with_fields(
                Event::UncommittedRows,
                &[
                    ("path", &self.layout.root().display().to_string()),
                    ("uncommitted_rows", &report.uncommitted_rows().to_string()),
                    ("orphan_shards", &report.orphan_shards.len().to_string()),
                ],
            );
        }
        log_event_with_fields(
            Event::VerifyComplete,
            &[
                ("path", &self.layout.root().display().to_string()),
                ("shards", &report.shards.len().to_string()),
                ("total_rows", &report.total_rows.to_string()),
            ],
        );
        Ok(report)
    }

    /// Checks `T` against the manifest and returns the store's row width
    /// (0 for a store with no rows yet).
    fn check_element<T: Element>(&self) -> StoreResult<usize> {
        match self.manifest()? {
            Some(manifest) if manifest.dtype != T::DTYPE => Err(StoreError::schema_mismatch(
                manifest.schema(),
                Schema::new(T::DTYPE, manifest.width),
            )),
            Some(manifest) => Ok(manifest.width),
            None => Ok(0),
        }
    }

    /// Opens a shard and checks it holds at least the rows its record commits.
    fn open_committed(&self, shard_id: u64, record: &IndexRecord) -> StoreResult<ShardHandle> {
        let handle = self.layout.shard(shard_id).open()?;
        if handle.row_count() < record.rows() {
            self.log_corruption(record, "shard shorter than index record");
            return Err(StoreError::corrupt_shard(
                &self.layout.shard_path(shard_id),
                format!(
                    "holds {} rows but the index commits {} ({})",
                    handle.row_count(),
                    record.rows(),
                    record
                ),
            ));
        }
        Ok(handle)
    }

    fn log_corruption(&self, record: &IndexRecord, reason: &str) {
        log_event_with_fields(
            Event::CorruptionDetected,
            &[
                ("shard_id", &record.shard_id.to_string()),
                ("reason", reason),
                ("path", &self.layout.root().display().to_string()),
            ],
        );
    }
}

/// Chunk stream over a whole store. Stops after the first error.
#[derive(Debug)]
pub struct StoreChunks<T: Element> {
    reader: ShardedReader,
    records: std::vec::IntoIter<IndexRecord>,
    current: Option<ShardChunks<T>>,
    done: bool,
}

impl<T: Element> StoreChunks<T> {
    fn fail(&mut self, err: StoreError) -> Option<StoreResult<Matrix<T>>> {
        self.done = true;
        self.current = None;
        Some(Err(err))
    }
}

impl<T: Element> Iterator for StoreChunks<T> {
    type Item = StoreResult<Matrix<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if let Some(chunks) = self.current.as_mut() {
                match chunks.next() {
                    Some(Ok(chunk)) => return Some(Ok(chunk)),
                    Some(Err(e)) => return self.fail(e),
                    None => self.current = None,
                }
            }

            let record = match self.records.next() {
                Some(record) => record,
                None => {
                    self.done = true;
                    return None;
                }
            };

            let chunks = self
                .reader
                .open_committed(record.shard_id, &record)
                .and_then(|handle| handle.into_chunks::<T>(self.reader.chunk_rows));
            match chunks {
                Ok(chunks) => self.current = Some(chunks.take_rows(record.rows())),
                Err(e) => return self.fail(e),
            }
        }
    }
}

/// Row stream over a whole store, flattened from [`StoreChunks`].
#[derive(Debug)]
pub struct StoreRows<T: Element> {
    chunks: StoreChunks<T>,
    current: Option<Matrix<T>>,
    pos: usize,
}

impl<T: Element> Iterator for StoreRows<T> {
    type Item = StoreResult<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.current.as_ref().and_then(|m| m.row(self.pos)) {
                self.pos += 1;
                return Some(Ok(row.to_vec()));
            }

            match self.chunks.next()? {
                Ok(chunk) => {
                    self.current = Some(chunk);
                    self.pos = 0;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Per-shard verification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardReport {
    pub shard_id: u64,
    pub start_row: u64,
    pub end_row: u64,
    pub rows_on_disk: u64,
    /// Rows the shard holds past its index record
    pub uncommitted_rows: u64,
    /// Bytes past the shard's committed payload (torn append)
    pub trailing_bytes: u64,
}

/// Result of [`ShardedReader::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub schema: Option<String>,
    pub total_rows: u64,
    pub shards: Vec<ShardReport>,
    /// Shard files on disk that the index does not name
    pub orphan_shards: Vec<u64>,
}

impl VerifyReport {
    pub fn uncommitted_rows(&self) -> u64 {
        self.shards.iter().map(|s| s.uncommitted_rows).sum()
    }

    /// No uncommitted rows, torn bytes or orphan shards.
    pub fn is_clean(&self) -> bool {
        self.orphan_shards.is_empty()
            && self
                .shards
                .iter()
                .all(|s| s.uncommitted_rows == 0 && s.trailing_bytes == 0)
    }
}
