//! Crash scenarios, one module per subsystem

pub mod metadata;
pub mod writer;
