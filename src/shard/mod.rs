//! Shard container subsystem
//!
//! A shard is one file holding a contiguous slice of the store's rows as a
//! single row-resizable dataset.
//!
//! # Design Principles
//!
//! - Append-only (rows are never rewritten)
//! - Header checksum verified on every open
//! - Payload and header fsynced before an append returns
//! - Handles scoped per operation

mod checksum;
mod container;
mod header;

pub use checksum::compute_checksum;
pub use container::{ShardChunks, ShardFile, ShardHandle};
pub use header::{ShardHeader, DATASET_NAME, SHARD_FORMAT_VERSION, SHARD_MAGIC};
