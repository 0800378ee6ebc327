//! Sharded store writer
//!
//! Appends row batches to a store, splitting them across shards of at most
//! `rows_per_shard` rows and rewriting the index after every shard append.
//!
//! Per sub-batch the order is fixed:
//!
//! 1. Append rows to the active shard (payload + header fsynced)
//! 2. Rewrite the index (temp + fsync + rename)
//! 3. Advance the global row cursor
//!
//! A crash between 1 and 2 leaves rows in the shard that the index does not
//! commit. Readers never return them. A writer never appends behind them.

use std::path::Path;

use super::layout::StoreLayout;
use super::manifest::StoreManifest;
use crate::capacity::estimate_for_config;
use crate::config::StoreConfig;
use crate::crash_point::{maybe_crash, points};
use crate::errors::{StoreError, StoreResult};
use crate::index::ShardIndex;
use crate::matrix::{Element, Matrix, Schema};
use crate::observability::{log_event_with_fields, Event};
use crate::shard::ShardFile;

/// Single-session writer for one store directory.
///
/// Creating a writer destroys whatever store already lives at the location.
/// One writer per store at a time; nothing enforces this.
#[derive(Debug)]
pub struct ShardedWriter {
    layout: StoreLayout,
    config: StoreConfig,
    schema: Option<Schema>,
    rows_per_shard: Option<u64>,
    active_shard_id: u64,
    global_row_cursor: u64,
}

impl ShardedWriter {
    /// Creates an empty store at `dir`, replacing any existing store.
    ///
    /// # Arguments
    ///
    /// * `dir` - Store directory; created if missing
    /// * `config` - Shard sizing limits, validated before anything is touched
    ///
    /// # Errors
    ///
    /// - `Config` if `config` is invalid
    /// - `NotAStore` if `dir` holds files that do not belong to a store
    pub fn create(dir: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let layout = StoreLayout::new(dir.as_ref());
        let root = layout.root().display().to_string();

        if layout.reset()? {
            log_event_with_fields(Event::StoreDestroyed, &[("path", &root)]);
        }
        ShardIndex::new().save(&layout.index_path())?;

        log_event_with_fields(
            Event::StoreCreated,
            &[
                ("path", &root),
                ("max_file_size_mb", &config.max_file_size_mb.to_string()),
                ("max_rows_per_file", &config.max_rows_per_file.to_string()),
            ],
        );

        Ok(Self {
            layout,
            config,
            schema: None,
            rows_per_shard: None,
            active_shard_id: 0,
            global_row_cursor: 0,
        })
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Schema fixed by the first non-empty batch.
    pub fn schema(&self) -> Option<Schema> {
        self.schema
    }

    /// Row capacity per shard, fixed by the first non-empty batch.
    pub fn rows_per_shard(&self) -> Option<u64> {
        self.rows_per_shard
    }

    pub fn active_shard_id(&self) -> u64 {
        self.active_shard_id
    }

    /// Rows committed so far in this session.
    pub fn rows_written(&self) -> u64 {
        self.global_row_cursor
    }

    /// Appends `batch` to the store.
    ///
    /// An empty batch is a no-op. The first non-empty batch fixes the schema
    /// and the rows-per-shard limit; every later batch must match it.
    ///
    /// # Errors
    ///
    /// - `SchemaMismatch` if the batch differs from the fixed schema. Nothing
    ///   is written.
    /// - `InvalidRow` if the first batch has zero-byte rows. Nothing is
    ///   written.
    /// - Any shard or index error. Sub-batches committed before the failure
    ///   remain readable.
    pub fn append<T: Element>(&mut self, batch: &Matrix<T>) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let incoming = batch.schema();
        if let Some(schema) = self.schema {
            if schema != incoming {
                return Err(StoreError::schema_mismatch(schema, incoming));
            }
        }

        let rows_per_shard = match self.rows_per_shard {
            Some(rows) => rows,
            None => self.initialize(incoming)?,
        };

        if batch.rows() as u64 <= rows_per_shard {
            return self.append_sub_batch(batch, rows_per_shard);
        }

        let step = usize::try_from(rows_per_shard).unwrap_or(usize::MAX);
        let mut offset = 0;
        while offset < batch.rows() {
            let end = offset.saturating_add(step).min(batch.rows());
            self.append_sub_batch(&batch.slice_rows(offset, end), rows_per_shard)?;
            offset = end;
        }
        Ok(())
    }

    /// Fixes schema and capacity from the first batch and writes the manifest.
    fn initialize(&mut self, schema: Schema) -> StoreResult<u64> {
        let row_bytes = schema.row_bytes() as u64;
        let rows_per_shard = estimate_for_config(row_bytes, &self.config)?;

        StoreManifest::new(schema, rows_per_shard, &self.config)
            .write_to_file(&self.layout.manifest_path())?;
        log_event_with_fields(
            Event::ManifestWritten,
            &[
                ("path", &self.layout.manifest_path().display().to_string()),
                ("schema", &schema.to_string()),
            ],
        );

        self.schema = Some(schema);
        self.rows_per_shard = Some(rows_per_shard);

        log_event_with_fields(
            Event::CapacityEstimated,
            &[
                ("row_bytes", &row_bytes.to_string()),
                ("rows_per_shard", &rows_per_shard.to_string()),
            ],
        );
        Ok(rows_per_shard)
    }

    fn append_sub_batch<T: Element>(
        &mut self,
        rows: &Matrix<T>,
        rows_per_shard: u64,
    ) -> StoreResult<()> {
        let count = rows.rows() as u64;
        let index_path = self.layout.index_path();
        let mut index = ShardIndex::load(&index_path)?;

        let committed = index
            .last()
            .filter(|record| record.shard_id == self.active_shard_id)
            .map(|record| record.rows())
            .unwrap_or(0);
        let mut shard = self.layout.shard(self.active_shard_id);
        let current = check_committed(&shard, committed)?;

        if current + count > rows_per_shard {
            let from = self.active_shard_id;
            self.active_shard_id += 1;
            shard = self.layout.shard(self.active_shard_id);
            check_committed(&shard, 0)?;

            log_event_with_fields(
                Event::ShardRollover,
                &[
                    ("from", &from.to_string()),
                    ("to", &self.active_shard_id.to_string()),
                    ("rows_in_previous", &current.to_string()),
                ],
            );
        }

        let shard_rows = shard.append(rows)?;

        maybe_crash(points::STORE_AFTER_SHARD_APPEND);

        let start = self.global_row_cursor;
        let end = start + count;
        index.append_or_extend(self.active_shard_id, start, end)?;
        index.save(&index_path)?;
        self.global_row_cursor = end;

        log_event_with_fields(
            Event::ShardAppend,
            &[
                ("shard_id", &self.active_shard_id.to_string()),
                ("rows", &count.to_string()),
                ("shard_rows", &shard_rows.to_string()),
                ("total_rows", &end.to_string()),
            ],
        );
        Ok(())
    }
}

/// Returns the shard's row count after checking it matches what the index
/// commits for it.
fn check_committed(shard: &ShardFile, committed: u64) -> StoreResult<u64> {
    let stored = shard.row_count_or_zero()?;
    if stored != committed {
        log_event_with_fields(
            Event::CorruptionDetected,
            &[
                ("shard_id", &shard.id().to_string()),
                ("stored", &stored.to_string()),
                ("committed", &committed.to_string()),
            ],
        );
        return Err(StoreError::corrupt_shard(
            shard.path(),
            format!(
                "holds {} rows but the index commits {}",
                stored, committed
            ),
        ));
    }
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexRecord;
    use crate::matrix::DType;
    use tempfile::TempDir;

    fn rows(start: usize, n: usize, width: usize) -> Matrix<f64> {
        let data = (start * width..(start + n) * width).map(|v| v as f64).collect();
        Matrix::from_vec(n, width, data).unwrap()
    }

    fn capped(rows: u64) -> StoreConfig {
        StoreConfig::default().with_max_rows_per_file(rows)
    }

    fn index_of(dir: &Path) -> ShardIndex {
        ShardIndex::load(&dir.join("index.json")).unwrap()
    }

    #[test]
    fn test_create_writes_empty_index() {
        let dir = TempDir::new().unwrap();
        let writer = ShardedWriter::create(dir.path(), StoreConfig::default()).unwrap();

        assert!(index_of(dir.path()).is_empty());
        assert!(!dir.path().join("store.json").exists());
        assert_eq!(writer.rows_per_shard(), None);
        assert_eq!(writer.schema(), None);
        assert_eq!(writer.rows_written(), 0);
    }

    #[test]
    fn test_rollover_at_capacity() {
        let dir = TempDir::new().unwrap();
        let mut writer = ShardedWriter::create(dir.path(), capped(5)).unwrap();

        writer.append(&rows(0, 2, 10)).unwrap();
        writer.append(&rows(2, 3, 10)).unwrap();
        writer.append(&rows(5, 4, 10)).unwrap();

        assert_eq!(writer.rows_per_shard(), Some(5));
        assert_eq!(writer.active_shard_id(), 1);
        assert_eq!(writer.rows_written(), 9);
        assert_eq!(
            index_of(dir.path()).records(),
            &[IndexRecord::new(0, 0, 5), IndexRecord::new(1, 5, 9)]
        );
    }

    #[test]
    fn test_overflowing_sub_batch_moves_whole() {
        let dir = TempDir::new().unwrap();
        let mut writer = ShardedWriter::create(dir.path(), capped(5)).unwrap();

        writer.append(&rows(0, 4, 2)).unwrap();
        writer.append(&rows(4, 3, 2)).unwrap();

        assert_eq!(
            index_of(dir.path()).records(),
            &[IndexRecord::new(0, 0, 4), IndexRecord::new(1, 4, 7)]
        );
    }

    #[test]
    fn test_large_batch_split() {
        let dir = TempDir::new().unwrap();
        let mut writer = ShardedWriter::create(dir.path(), capped(4)).unwrap();

        writer.append(&rows(0, 10, 3)).unwrap();

        assert_eq!(
            index_of(dir.path()).records(),
            &[
                IndexRecord::new(0, 0, 4),
                IndexRecord::new(1, 4, 8),
                IndexRecord::new(2, 8, 10),
            ]
        );
        assert_eq!(writer.active_shard_id(), 2);
    }

    #[test]
    fn test_schema_mismatch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut writer = ShardedWriter::create(dir.path(), StoreConfig::default()).unwrap();

        writer.append(&rows(0, 3, 10)).unwrap();
        let before = index_of(dir.path());

        let err = writer.append(&rows(0, 1, 9)).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { .. }));

        let ints = Matrix::from_vec(1, 10, vec![0i64; 10]).unwrap();
        let err = writer.append(&ints).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { .. }));

        assert_eq!(index_of(dir.path()), before);
        assert_eq!(writer.rows_written(), 3);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut writer = ShardedWriter::create(dir.path(), StoreConfig::default()).unwrap();

        writer.append(&Matrix::<f64>::empty(10)).unwrap();

        assert_eq!(writer.rows_per_shard(), None);
        assert!(index_of(dir.path()).is_empty());
        assert!(!dir.path().join("slice-0.shard").exists());
    }

    #[test]
    fn test_zero_width_first_batch_rejected() {
        let dir = TempDir::new().unwrap();
        let mut writer = ShardedWriter::create(dir.path(), StoreConfig::default()).unwrap();

        let batch = Matrix::<f64>::from_vec(3, 0, Vec::new()).unwrap();
        assert!(matches!(
            writer.append(&batch),
            Err(StoreError::InvalidRow(_))
        ));
        assert!(!dir.path().join("slice-0.shard").exists());
        assert!(!dir.path().join("store.json").exists());
    }

    #[test]
    fn test_manifest_written_on_first_batch() {
        let dir = TempDir::new().unwrap();
        let mut writer = ShardedWriter::create(dir.path(), capped(7)).unwrap();
        writer.append(&rows(0, 1, 4)).unwrap();

        let manifest = StoreManifest::read_from_file(&dir.path().join("store.json"))
            .unwrap()
            .unwrap();
        assert_eq!(manifest.schema(), Schema::new(DType::F64, 4));
        assert_eq!(manifest.rows_per_shard, 7);
    }

    #[test]
    fn test_capacity_fixed_from_first_row() {
        // 1 KiB limit, 8-byte rows: 128 rows per shard
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::default().with_max_file_size_mb(1.0 / 1024.0);
        let mut writer = ShardedWriter::create(dir.path(), config).unwrap();

        writer.append(&rows(0, 200, 1)).unwrap();

        assert_eq!(writer.rows_per_shard(), Some(128));
        assert_eq!(
            index_of(dir.path()).records(),
            &[IndexRecord::new(0, 0, 128), IndexRecord::new(1, 128, 200)]
        );
    }

    #[test]
    fn test_reopen_destroys_previous_store() {
        let dir = TempDir::new().unwrap();
        {
            let mut writer = ShardedWriter::create(dir.path(), capped(2)).unwrap();
            writer.append(&rows(0, 5, 2)).unwrap();
        }
        assert!(dir.path().join("slice-2.shard").exists());

        let writer = ShardedWriter::create(dir.path(), capped(2)).unwrap();
        assert_eq!(writer.rows_written(), 0);
        assert!(index_of(dir.path()).is_empty());
        assert!(!dir.path().join("slice-0.shard").exists());
        assert!(!dir.path().join("store.json").exists());
    }

    #[test]
    fn test_invalid_config_rejected_before_reset() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.json"), "[]").unwrap();

        let err = ShardedWriter::create(dir.path(), capped(0)).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
        assert!(dir.path().join("index.json").exists());
    }

    #[test]
    fn test_uncommitted_rows_block_append() {
        let dir = TempDir::new().unwrap();
        let mut writer = ShardedWriter::create(dir.path(), capped(10)).unwrap();
        writer.append(&rows(0, 2, 2)).unwrap();

        // Rows land in the shard without an index update
        ShardFile::new(0, dir.path().join("slice-0.shard"))
            .append(&rows(2, 1, 2))
            .unwrap();

        let err = writer.append(&rows(2, 1, 2)).unwrap_err();
        assert!(matches!(err, StoreError::CorruptShard { .. }));
        assert_eq!(index_of(dir.path()).total_rows(), 2);
    }
}
