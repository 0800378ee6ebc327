//! Single-file shard container
//!
//! A shard holds exactly one named, row-resizable dataset. Appending grows
//! the dataset in place:
//!
//! 1. Write the new rows after the last committed row
//! 2. fsync the payload
//! 3. Rewrite the header with the new row count
//! 4. fsync the header
//!
//! A crash between steps 2 and 3 leaves bytes past the committed payload.
//! Reads ignore them (they only return the header's row count); a later
//! append refuses to run on such a file.
//!
//! Handles are scoped: every operation on `ShardFile` opens the file, does its
//! work, and drops the handle before returning, on success and error paths
//! alike. Chunk iterators own their handle until they are dropped.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::header::ShardHeader;
use crate::crash_point::{maybe_crash, points};
use crate::durable::fsync_dir;
use crate::errors::{StoreError, StoreResult};
use crate::matrix::{decode_elements, encode_elements, Element, Matrix, Schema};
use crate::observability::{log_event_with_fields, Event};

/// A shard file identified by its id and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFile {
    id: u64,
    path: PathBuf,
}

impl ShardFile {
    pub fn new(id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Opens the shard for reading.
    ///
    /// # Errors
    ///
    /// `ShardNotFound` if the file is absent, `CorruptShard` if the header is
    /// invalid or the payload is shorter than the header claims.
    pub fn open(&self) -> StoreResult<ShardHandle> {
        let file = File::open(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::ShardNotFound {
                    shard_id: self.id,
                    path: self.path.clone(),
                }
            } else {
                StoreError::io_at("open shard", &self.path, e)
            }
        })?;
        ShardHandle::from_existing(self, file, false)
    }

    /// Creates the shard with a zero-row dataset shaped for `schema`, or opens
    /// an existing shard for append.
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` if an existing shard holds a different dtype or width.
    pub fn create_or_open(&self, schema: Schema) -> StoreResult<ShardHandle> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| StoreError::io_at("open shard for append", &self.path, e))?;

        let len = file
            .metadata()
            .map_err(|e| StoreError::io_at("stat shard", &self.path, e))?
            .len();

        if len > 0 {
            let handle = ShardHandle::from_existing(self, file, true)?;
            if handle.schema() != schema {
                return Err(StoreError::schema_mismatch(handle.schema(), schema));
            }
            return Ok(handle);
        }

        let header = ShardHeader::new(schema)?;
        file.write_all(&header.encode())
            .map_err(|e| StoreError::io_at("write shard header", &self.path, e))?;
        file.sync_all()
            .map_err(|e| StoreError::io_at("fsync shard", &self.path, e))?;
        if let Some(parent) = self.path.parent() {
            fsync_dir(parent)?;
        }

        log_event_with_fields(
            Event::ShardCreated,
            &[
                ("shard_id", &self.id.to_string()),
                ("path", &self.path.display().to_string()),
                ("schema", &schema.to_string()),
            ],
        );

        Ok(ShardHandle {
            path: self.path.clone(),
            file,
            header,
            writable: true,
        })
    }

    /// Committed row count of an existing shard.
    pub fn row_count(&self) -> StoreResult<u64> {
        Ok(self.open()?.row_count())
    }

    /// Committed row count, or 0 if the shard does not exist yet.
    pub fn row_count_or_zero(&self) -> StoreResult<u64> {
        match self.row_count() {
            Err(StoreError::ShardNotFound { .. }) => Ok(0),
            other => other,
        }
    }

    /// Appends `rows`, creating the shard if needed. Returns the new row count.
    pub fn append<T: Element>(&self, rows: &Matrix<T>) -> StoreResult<u64> {
        self.create_or_open(rows.schema())?.append(rows)
    }

    /// Reads every committed row.
    pub fn read_all<T: Element>(&self) -> StoreResult<Matrix<T>> {
        self.open()?.read_all()
    }

    /// Reads committed rows `start..end`.
    pub fn read_range<T: Element>(&self, start: u64, end: u64) -> StoreResult<Matrix<T>> {
        self.open()?.read_range(start, end)
    }

    /// Lazily yields the committed rows in chunks of at most `chunk_rows`.
    ///
    /// Each call starts again from the first row.
    pub fn iter_chunks<T: Element>(&self, chunk_rows: usize) -> StoreResult<ShardChunks<T>> {
        self.open()?.into_chunks(chunk_rows)
    }
}

/// An open shard. The file is closed when the handle is dropped.
#[derive(Debug)]
pub struct ShardHandle {
    path: PathBuf,
    file: File,
    header: ShardHeader,
    writable: bool,
}

impl ShardHandle {
    fn from_existing(shard: &ShardFile, mut file: File, writable: bool) -> StoreResult<Self> {
        let header = ShardHeader::decode(&mut file, &shard.path)?;

        let len = file
            .metadata()
            .map_err(|e| StoreError::io_at("stat shard", &shard.path, e))?
            .len();
        let committed_end = payload_end(&header, &shard.path)?;
        if len < committed_end {
            return Err(StoreError::corrupt_shard(
                &shard.path,
                format!(
                    "file holds {} bytes but header accounts for {} rows ({} bytes)",
                    len, header.row_count, committed_end
                ),
            ));
        }

        Ok(Self {
            path: shard.path.clone(),
            file,
            header,
            writable,
        })
    }

    pub fn schema(&self) -> Schema {
        self.header.schema()
    }

    pub fn row_count(&self) -> u64 {
        self.header.row_count
    }

    /// Bytes on disk past the committed payload.
    pub fn trailing_bytes(&self) -> StoreResult<u64> {
        let len = self
            .file
            .metadata()
            .map_err(|e| StoreError::io_at("stat shard", &self.path, e))?
            .len();
        Ok(len.saturating_sub(payload_end(&self.header, &self.path)?))
    }

    /// Grows the dataset by `rows.rows()` and copies `rows` into the new
    /// region. Data and header are durable when this returns.
    ///
    /// Returns the new committed row count.
    pub fn append<T: Element>(&mut self, rows: &Matrix<T>) -> StoreResult<u64> {
        if !self.writable {
            return Err(StoreError::InvalidArgument(format!(
                "shard {} was opened read-only",
                self.path.display()
            )));
        }
        if rows.schema() != self.schema() {
            return Err(StoreError::schema_mismatch(self.schema(), rows.schema()));
        }
        if rows.is_empty() {
            return Ok(self.header.row_count);
        }

        let expected_len = payload_end(&self.header, &self.path)?;
        let actual_len = self
            .file
            .metadata()
            .map_err(|e| StoreError::io_at("stat shard", &self.path, e))?
            .len();
        if actual_len != expected_len {
            return Err(StoreError::corrupt_shard(
                &self.path,
                format!(
                    "cannot resize: file holds {} bytes, header accounts for {}",
                    actual_len, expected_len
                ),
            ));
        }

        let payload = encode_elements(rows.as_slice());
        self.file
            .seek(SeekFrom::Start(expected_len))
            .map_err(|e| StoreError::io_at("seek shard", &self.path, e))?;
        self.file
            .write_all(&payload)
            .map_err(|e| StoreError::io_at("write shard rows", &self.path, e))?;
        self.file
            .sync_data()
            .map_err(|e| StoreError::io_at("fsync shard rows", &self.path, e))?;

        maybe_crash(points::SHARD_BEFORE_HEADER_UPDATE);

        let mut header = self.header.clone();
        header.row_count = header
            .row_count
            .checked_add(rows.rows() as u64)
            .ok_or_else(|| StoreError::corrupt_shard(&self.path, "row count overflows u64"))?;
        let new_end = payload_end(&header, &self.path)?;
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| StoreError::io_at("seek shard", &self.path, e))?;
        self.file
            .write_all(&header.encode())
            .map_err(|e| StoreError::io_at("write shard header", &self.path, e))?;
        self.file
            .sync_all()
            .map_err(|e| StoreError::io_at("fsync shard header", &self.path, e))?;

        let written_len = self
            .file
            .metadata()
            .map_err(|e| StoreError::io_at("stat shard", &self.path, e))?
            .len();
        if written_len != new_end {
            return Err(StoreError::corrupt_shard(
                &self.path,
                format!(
                    "resize to {} rows expected {} bytes, file holds {}",
                    header.row_count, new_end, written_len
                ),
            ));
        }

        self.header = header;
        Ok(self.header.row_count)
    }

    pub fn read_all<T: Element>(&mut self) -> StoreResult<Matrix<T>> {
        let rows = self.header.row_count;
        self.read_range(0, rows)
    }

    /// Reads committed rows `start..end` (end exclusive).
    pub fn read_range<T: Element>(&mut self, start: u64, end: u64) -> StoreResult<Matrix<T>> {
        self.check_dtype::<T>()?;
        if start > end || end > self.header.row_count {
            return Err(StoreError::RowOutOfRange {
                row: end.max(start),
                total: self.header.row_count,
            });
        }

        let count = usize::try_from(end - start).map_err(|_| {
            StoreError::corrupt_shard(&self.path, "row range exceeds addressable memory")
        })?;
        let buf_len = usize::try_from(self.header.row_bytes())
            .ok()
            .and_then(|row_bytes| row_bytes.checked_mul(count))
            .ok_or_else(|| {
                StoreError::corrupt_shard(&self.path, "row range exceeds addressable memory")
            })?;
        let offset = self
            .header
            .row_offset(start)
            .ok_or_else(|| overflow(&self.path, &self.header))?;
        let mut buf = vec![0u8; buf_len];
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| StoreError::io_at("seek shard", &self.path, e))?;
        self.file.read_exact(&mut buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                StoreError::corrupt_shard(
                    &self.path,
                    format!("payload ends before row {}", end),
                )
            } else {
                StoreError::io_at("read shard rows", &self.path, e)
            }
        })?;

        Matrix::from_vec(count, self.header.width as usize, decode_elements(&buf))
    }

    /// Converts the handle into a chunk iterator over all committed rows.
    pub fn into_chunks<T: Element>(self, chunk_rows: usize) -> StoreResult<ShardChunks<T>> {
        self.check_dtype::<T>()?;
        if chunk_rows == 0 {
            return Err(StoreError::InvalidArgument("chunk size must be > 0".into()));
        }
        let end = self.header.row_count;
        Ok(ShardChunks {
            handle: self,
            next: 0,
            end,
            chunk_rows: chunk_rows as u64,
            done: false,
            _marker: PhantomData,
        })
    }

    fn check_dtype<T: Element>(&self) -> StoreResult<()> {
        if T::DTYPE != self.header.dtype {
            return Err(StoreError::schema_mismatch(
                self.schema(),
                Schema::new(T::DTYPE, self.header.width as usize),
            ));
        }
        Ok(())
    }
}

/// Byte offset one past the committed payload. A row count whose payload
/// cannot be addressed is `CorruptShard`.
fn payload_end(header: &ShardHeader, path: &Path) -> StoreResult<u64> {
    header.payload_end().ok_or_else(|| overflow(path, header))
}

fn overflow(path: &Path, header: &ShardHeader) -> StoreError {
    StoreError::corrupt_shard(
        path,
        format!("row count {} overflows file size", header.row_count),
    )
}

/// Lazy front-to-back chunk reader over one shard.
///
/// Yields at most `chunk_rows` rows per item. Stops after the first error.
#[derive(Debug)]
pub struct ShardChunks<T: Element> {
    handle: ShardHandle,
    next: u64,
    end: u64,
    chunk_rows: u64,
    done: bool,
    _marker: PhantomData<T>,
}

impl<T: Element> ShardChunks<T> {
    /// Restricts iteration to the first `rows` rows.
    pub fn take_rows(mut self, rows: u64) -> Self {
        self.end = self.end.min(rows);
        self
    }
}

impl<T: Element> Iterator for ShardChunks<T> {
    type Item = StoreResult<Matrix<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next >= self.end {
            return None;
        }
        let stop = (self.next + self.chunk_rows).min(self.end);
        let result = self.handle.read_range(self.next, stop);
        match result {
            Ok(chunk) => {
                self.next = stop;
                Some(Ok(chunk))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
