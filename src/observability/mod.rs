//! Observability for the store
//!
//! Structured JSON line logging of typed store events.
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes what the store does
//! 2. No background threads
//! 3. Logging failures are swallowed, never surfaced as store errors
//!
//! # Usage
//!
//! ```ignore
//! use ondiskxy::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ShardRollover, &[("from", "0"), ("to", "1")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{min_severity, Logger, Severity, LOG_LEVEL_ENV};

/// Log a store event at its default severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a store event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
