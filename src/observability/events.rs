//! Observable store events
//!
//! Events are explicit and typed. Each maps to a stable string and a default
//! severity.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Store lifecycle
    /// A writer session created an empty store
    StoreCreated,
    /// A pre-existing store was destroyed by overwrite-on-open
    StoreDestroyed,
    /// Configuration loaded from file
    ConfigLoaded,

    // Writer
    /// Rows-per-shard fixed from the first row
    CapacityEstimated,
    /// A new shard file was created
    ShardCreated,
    /// The active shard was full; writes moved to the next shard
    ShardRollover,
    /// A sub-batch was appended to a shard
    ShardAppend,
    /// The index was rewritten
    IndexRewrite,
    /// The store manifest was written
    ManifestWritten,

    // Reader
    /// A full read completed
    ReadComplete,
    /// A verification pass completed
    VerifyComplete,
    /// Rows exist on disk past what the index commits
    UncommittedRows,

    // Utilities
    /// A filtered copy completed
    FilterComplete,

    // Failures
    /// Shard or index corruption detected
    CorruptionDetected,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreCreated => "STORE_CREATED",
            Event::StoreDestroyed => "STORE_DESTROYED",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::CapacityEstimated => "CAPACITY_ESTIMATED",
            Event::ShardCreated => "SHARD_CREATED",
            Event::ShardRollover => "SHARD_ROLLOVER",
            Event::ShardAppend => "SHARD_APPEND",
            Event::IndexRewrite => "INDEX_REWRITE",
            Event::ManifestWritten => "MANIFEST_WRITTEN",

            Event::ReadComplete => "READ_COMPLETE",
            Event::VerifyComplete => "VERIFY_COMPLETE",
            Event::UncommittedRows => "UNCOMMITTED_ROWS",

            Event::FilterComplete => "FILTER_COMPLETE",

            Event::CorruptionDetected => "CORRUPTION_DETECTED",
        }
    }

    /// Severity the event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::ShardAppend | Event::IndexRewrite => Severity::Trace,
            Event::UncommittedRows => Severity::Warn,
            Event::CorruptionDetected => Severity::Fatal,
            _ => Severity::Info,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
