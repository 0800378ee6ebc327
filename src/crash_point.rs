//! Crash point injection for testing durability
//!
//! When `ODXY_CRASH_POINT` names a point that execution reaches, the process
//! terminates immediately via `std::process::abort()`: no cleanup, no
//! unwinding, no catching.
//!
//! `<name>:<n>` fires on the n-th time the point is reached (1-based), so a
//! crash can land after earlier appends have committed.
//!
//! # Usage
//!
//! ```ignore
//! use ondiskxy::crash_point::{maybe_crash, points};
//!
//! maybe_crash(points::STORE_AFTER_SHARD_APPEND);
//! ```
//!
//! ```bash
//! ODXY_CRASH_POINT=store_after_shard_append ondiskxy write --store /tmp/s < rows.jsonl
//! ODXY_CRASH_POINT=store_after_shard_append:3 ondiskxy write --store /tmp/s < rows.jsonl
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Environment variable naming the active crash point
pub const CRASH_POINT_ENV: &str = "ODXY_CRASH_POINT";

#[derive(Debug, PartialEq, Eq)]
struct CrashSpec {
    name: String,
    hit: u64,
}

static CRASH_POINT: OnceLock<Option<CrashSpec>> = OnceLock::new();
static HITS: AtomicU64 = AtomicU64::new(0);

fn parse_spec(raw: &str) -> Option<CrashSpec> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.rsplit_once(':') {
        Some((name, hit)) => {
            let hit = hit.parse().ok().filter(|&n| n > 0)?;
            Some(CrashSpec {
                name: name.to_string(),
                hit,
            })
        }
        None => Some(CrashSpec {
            name: raw.to_string(),
            hit: 1,
        }),
    }
}

#[inline]
fn get_crash_point() -> Option<&'static CrashSpec> {
    CRASH_POINT
        .get_or_init(|| std::env::var(CRASH_POINT_ENV).ok().and_then(|v| parse_spec(&v)))
        .as_ref()
}

/// Aborts the process if the named crash point is enabled and has been
/// reached the configured number of times.
///
/// No-op when `ODXY_CRASH_POINT` is unset or names another point.
#[inline]
pub fn maybe_crash(name: &str) {
    let Some(spec) = get_crash_point() else {
        return;
    };
    if spec.name != name {
        return;
    }
    if HITS.fetch_add(1, Ordering::SeqCst) + 1 >= spec.hit {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    // Shard container
    pub const SHARD_BEFORE_HEADER_UPDATE: &str = "shard_before_header_update";

    // Writer
    pub const STORE_AFTER_SHARD_APPEND: &str = "store_after_shard_append";

    // Atomic metadata rewrite (index and manifest)
    pub const META_BEFORE_RENAME: &str = "meta_before_rename";
    pub const META_AFTER_RENAME: &str = "meta_after_rename";

    pub fn all() -> &'static [&'static str] {
        &[
            SHARD_BEFORE_HEADER_UPDATE,
            STORE_AFTER_SHARD_APPEND,
            META_BEFORE_RENAME,
            META_AFTER_RENAME,
        ]
    }
}
