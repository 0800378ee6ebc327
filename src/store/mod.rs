//! Sharded append-only store
//!
//! A store is a directory of shard files plus an index naming which global
//! rows each shard holds.
//!
//! # Design Principles
//!
//! - Append-only: rows are never rewritten
//! - The index is the commit point; readers return only what it names
//! - One writer per store, any number of readers on a quiet store
//! - Every failure surfaces to the caller

mod filter;
mod layout;
mod manifest;
mod reader;
mod writer;

pub use filter::filter_by_index;
pub use layout::{
    parse_shard_file_name, shard_file_name, StoreLayout, INDEX_FILE_NAME, MANIFEST_FILE_NAME,
};
pub use manifest::{StoreManifest, MANIFEST_FORMAT_VERSION};
pub use reader::{ShardReport, ShardedReader, StoreChunks, StoreRows, VerifyReport};
pub use writer::ShardedWriter;
