//! Shard index subsystem
//!
//! A persisted, ordered list of `(shard_id, start_row, end_row)` records
//! describing which global row range lives in which shard.
//!
//! # Design Principles
//!
//! - Durable source of truth for readers
//! - Full rewrite on every update, made atomic by temp file + rename
//! - Human-inspectable JSON

mod record;
mod shard_index;

pub use record::IndexRecord;
pub use shard_index::{ShardIds, ShardIndex};
