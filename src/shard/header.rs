//! Shard file header
//!
//! ```text
//! +---------------------+
//! | Magic "ODXS"        | 4 bytes
//! +---------------------+
//! | Format Version      | u16 LE
//! +---------------------+
//! | DType Code          | u8
//! +---------------------+
//! | Reserved            | u8 (0)
//! +---------------------+
//! | Width               | u32 LE
//! +---------------------+
//! | Row Count           | u64 LE
//! +---------------------+
//! | Name Length         | u16 LE
//! +---------------------+
//! | Dataset Name        | UTF-8
//! +---------------------+
//! | Checksum            | u32 LE
//! +---------------------+
//! ```
//!
//! The checksum covers every header byte before it. The row-major payload
//! follows the header directly.

use std::io::Read;
use std::path::Path;

use super::checksum::{compute_checksum, verify_checksum};
use crate::errors::{StoreError, StoreResult};
use crate::matrix::{DType, Schema};

pub const SHARD_MAGIC: [u8; 4] = *b"ODXS";
pub const SHARD_FORMAT_VERSION: u16 = 1;

/// Name of the single dataset held by every shard
pub const DATASET_NAME: &str = "X";

/// Bytes before the variable-length dataset name
const FIXED_PREFIX_LEN: usize = 4 + 2 + 1 + 1 + 4 + 8 + 2;

/// Offset of the row count field
const ROW_COUNT_OFFSET: usize = 4 + 2 + 1 + 1 + 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardHeader {
    pub dtype: DType,
    pub width: u32,
    pub row_count: u64,
    pub name: String,
}

impl ShardHeader {
    /// Header for a freshly created, zero-row shard.
    pub fn new(schema: Schema) -> StoreResult<Self> {
        let width = u32::try_from(schema.width).map_err(|_| {
            StoreError::InvalidArgument(format!("row width {} exceeds u32", schema.width))
        })?;
        Ok(Self {
            dtype: schema.dtype,
            width,
            row_count: 0,
            name: DATASET_NAME.to_string(),
        })
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.dtype, self.width as usize)
    }

    /// Serialized header length in bytes.
    pub fn encoded_len(&self) -> u64 {
        (FIXED_PREFIX_LEN + self.name.len() + 4) as u64
    }

    pub fn row_bytes(&self) -> u64 {
        self.width as u64 * self.dtype.size() as u64
    }

    /// Byte offset where row `row` begins, or `None` if it does not fit in
    /// a `u64`.
    pub fn row_offset(&self, row: u64) -> Option<u64> {
        row.checked_mul(self.row_bytes())?
            .checked_add(self.encoded_len())
    }

    /// Byte offset one past the last committed row.
    pub fn payload_end(&self) -> Option<u64> {
        self.row_offset(self.row_count)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len() as usize);
        buf.extend_from_slice(&SHARD_MAGIC);
        buf.extend_from_slice(&SHARD_FORMAT_VERSION.to_le_bytes());
        buf.push(self.dtype.code());
        buf.push(0);
        buf.extend_from_slice(&self.width.to_le_bytes());
        buf.extend_from_slice(&self.row_count.to_le_bytes());
        buf.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        buf.extend_from_slice(self.name.as_bytes());
        let checksum = compute_checksum(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }

    /// Reads and validates a header from the start of `reader`.
    ///
    /// `path` is only used for error context. Every structural problem,
    /// including a file too short to hold a header, is `CorruptShard`.
    pub fn decode<R: Read>(reader: &mut R, path: &Path) -> StoreResult<Self> {
        let mut prefix = [0u8; FIXED_PREFIX_LEN];
        reader.read_exact(&mut prefix).map_err(|e| {
            StoreError::corrupt_shard(path, format!("truncated header: {}", e))
        })?;

        if prefix[0..4] != SHARD_MAGIC {
            return Err(StoreError::corrupt_shard(path, "bad magic"));
        }

        let version = u16::from_le_bytes([prefix[4], prefix[5]]);
        if version != SHARD_FORMAT_VERSION {
            return Err(StoreError::corrupt_shard(
                path,
                format!("unsupported format version {}", version),
            ));
        }

        let name_len = u16::from_le_bytes([prefix[20], prefix[21]]) as usize;
        let mut rest = vec![0u8; name_len + 4];
        reader.read_exact(&mut rest).map_err(|e| {
            StoreError::corrupt_shard(path, format!("truncated header name: {}", e))
        })?;

        let mut covered = Vec::with_capacity(FIXED_PREFIX_LEN + name_len);
        covered.extend_from_slice(&prefix);
        covered.extend_from_slice(&rest[..name_len]);
        let stored = u32::from_le_bytes([
            rest[name_len],
            rest[name_len + 1],
            rest[name_len + 2],
            rest[name_len + 3],
        ]);
        if !verify_checksum(&covered, stored) {
            return Err(StoreError::corrupt_shard(path, "header checksum mismatch"));
        }

        let dtype = DType::from_code(prefix[6]).ok_or_else(|| {
            StoreError::corrupt_shard(path, format!("unknown dtype code {}", prefix[6]))
        })?;

        let width = u32::from_le_bytes([prefix[8], prefix[9], prefix[10], prefix[11]]);
        let mut count = [0u8; 8];
        count.copy_from_slice(&prefix[ROW_COUNT_OFFSET..ROW_COUNT_OFFSET + 8]);
        let row_count = u64::from_le_bytes(count);

        let name = String::from_utf8(rest[..name_len].to_vec())
            .map_err(|_| StoreError::corrupt_shard(path, "dataset name is not UTF-8"))?;

        Ok(Self {
            dtype,
            width,
            row_count,
            name,
        })
    }
}
