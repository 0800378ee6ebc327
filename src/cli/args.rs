//! CLI argument definitions using clap
//!
//! Commands:
//! - ondiskxy write --store <dir> [--dtype f64] [--config <path>]
//! - ondiskxy read --store <dir>
//! - ondiskxy info --store <dir>
//! - ondiskxy verify --store <dir>
//! - ondiskxy filter --source <dir> --target <dir> --rows <i,j,...> [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::matrix::DType;

/// ondiskxy - sharded append-only matrix store
#[derive(Parser, Debug)]
#[command(name = "ondiskxy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a store from JSON batches on stdin, one batch per line
    Write {
        /// Store directory (replaced if it already holds a store)
        #[arg(long)]
        store: PathBuf,

        /// Element type of every row
        #[arg(long, default_value = "f64")]
        dtype: DType,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print every committed row as a JSON array, one per line
    Read {
        #[arg(long)]
        store: PathBuf,
    },

    /// Print manifest, index records and row count
    Info {
        #[arg(long)]
        store: PathBuf,
    },

    /// Check every indexed shard against the index
    Verify {
        #[arg(long)]
        store: PathBuf,
    },

    /// Copy selected rows into a new store
    Filter {
        #[arg(long)]
        source: PathBuf,

        #[arg(long)]
        target: PathBuf,

        /// Global row indices, comma separated, in output order
        #[arg(long, value_delimiter = ',')]
        rows: Vec<u64>,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
