//! Store error types
//!
//! Every failure surfaces to the caller unchanged. There is no local recovery
//! and no retry: the store fails loudly instead of masking inconsistency.
//!
//! Error codes:
//! - ODXY_SCHEMA_MISMATCH (ERROR)
//! - ODXY_INVALID_ROW (ERROR)
//! - ODXY_SHARD_NOT_FOUND (FATAL)
//! - ODXY_CORRUPT_SHARD (FATAL)
//! - ODXY_INDEX_GAP (FATAL)
//! - ODXY_INDEX_CORRUPT (FATAL)
//! - ODXY_MANIFEST_CORRUPT (FATAL)
//! - ODXY_ROW_OUT_OF_RANGE (ERROR)
//! - ODXY_STORE_NOT_FOUND (ERROR)
//! - ODXY_NOT_A_STORE (ERROR)
//! - ODXY_INVALID_ARGUMENT (ERROR)
//! - ODXY_CONFIG (ERROR)
//! - ODXY_IO (ERROR)

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Severity of a store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation failed; the store is still consistent
    Error,
    /// On-disk state disagrees with itself; the store needs inspection
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Errors raised by the shard container, index, writer and reader.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Row width or element type differs from the store's fixed schema
    #[error("schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },

    /// A sample row cannot be used to estimate shard capacity
    #[error("invalid row: {0}")]
    InvalidRow(String),

    /// The index references a shard file that is absent on disk
    #[error("shard {shard_id} not found at {}", .path.display())]
    ShardNotFound { shard_id: u64, path: PathBuf },

    /// A shard's header or length disagrees with its contents
    #[error("corrupt shard {}: {reason}", .path.display())]
    CorruptShard { path: PathBuf, reason: String },

    /// An index update would break row contiguity
    #[error("index gap: {0}")]
    IndexGap(String),

    /// The persisted index cannot be parsed or violates its invariants
    #[error("index corrupt: {0}")]
    IndexCorrupt(String),

    /// The store manifest cannot be parsed
    #[error("manifest corrupt: {0}")]
    ManifestCorrupt(String),

    /// A requested global row lies outside the store
    #[error("row {row} out of range (store holds {total} rows)")]
    RowOutOfRange { row: u64, total: u64 },

    /// The store directory does not exist
    #[error("store not found: {}", .0.display())]
    StoreNotFound(PathBuf),

    /// The directory exists but holds files that are not a store
    #[error("refusing to overwrite {}: not a store directory", .0.display())]
    NotAStore(PathBuf),

    /// Caller supplied an argument the store cannot act on
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration failed to load or validate
    #[error("config error: {0}")]
    Config(String),

    /// Underlying filesystem failure
    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Wraps an I/O error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    /// Wraps an I/O error that occurred on a specific path.
    pub fn io_at(action: &str, path: &Path, source: io::Error) -> Self {
        Self::io(format!("{} {}", action, path.display()), source)
    }

    pub fn schema_mismatch(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        StoreError::SchemaMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn corrupt_shard(path: &Path, reason: impl Into<String>) -> Self {
        StoreError::CorruptShard {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::SchemaMismatch { .. } => "ODXY_SCHEMA_MISMATCH",
            StoreError::InvalidRow(_) => "ODXY_INVALID_ROW",
            StoreError::ShardNotFound { .. } => "ODXY_SHARD_NOT_FOUND",
            StoreError::CorruptShard { .. } => "ODXY_CORRUPT_SHARD",
            StoreError::IndexGap(_) => "ODXY_INDEX_GAP",
            StoreError::IndexCorrupt(_) => "ODXY_INDEX_CORRUPT",
            StoreError::ManifestCorrupt(_) => "ODXY_MANIFEST_CORRUPT",
            StoreError::RowOutOfRange { .. } => "ODXY_ROW_OUT_OF_RANGE",
            StoreError::StoreNotFound(_) => "ODXY_STORE_NOT_FOUND",
            StoreError::NotAStore(_) => "ODXY_NOT_A_STORE",
            StoreError::InvalidArgument(_) => "ODXY_INVALID_ARGUMENT",
            StoreError::Config(_) => "ODXY_CONFIG",
            StoreError::Io { .. } => "ODXY_IO",
        }
    }

    /// Returns the severity for this error.
    pub fn severity(&self) -> Severity {
        match self {
            StoreError::ShardNotFound { .. }
            | StoreError::CorruptShard { .. }
            | StoreError::IndexGap(_)
            | StoreError::IndexCorrupt(_)
            | StoreError::ManifestCorrupt(_) => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Returns whether the store's on-disk state is inconsistent.
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
