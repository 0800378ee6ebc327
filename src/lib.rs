//! ondiskxy - a sharded, append-only numeric matrix store
//!
//! A growing two-dimensional matrix is appended batch by batch, split across
//! fixed-capacity shard files, and tracked by an index mapping global row
//! ranges to shards.
//!
//! ```ignore
//! use ondiskxy::{Matrix, ShardedReader, ShardedWriter, StoreConfig};
//!
//! let mut writer = ShardedWriter::create("data/x", StoreConfig::default())?;
//! writer.append(&Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]])?)?;
//!
//! let all = ShardedReader::open("data/x")?.read_all::<f64>()?;
//! ```

pub mod capacity;
pub mod cli;
pub mod config;
pub mod crash_point;
pub mod durable;
pub mod errors;
pub mod index;
pub mod matrix;
pub mod observability;
pub mod shard;
pub mod store;

pub use config::StoreConfig;
pub use errors::{StoreError, StoreResult};
pub use index::{IndexRecord, ShardIndex};
pub use matrix::{DType, Element, Matrix, Schema};
pub use store::{filter_by_index, ShardedReader, ShardedWriter, StoreManifest, VerifyReport};
