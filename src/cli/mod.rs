//! CLI module for ondiskxy
//!
//! Provides command-line interface for:
//! - write: Create a store from JSON batches on stdin
//! - read: Stream rows as JSON lines
//! - info: Show manifest and index
//! - verify: Check shards against the index
//! - filter: Copy selected rows into a new store

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{filter, info, read, run, run_command, verify, write};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_batches, write_json_line, write_json_pretty};
