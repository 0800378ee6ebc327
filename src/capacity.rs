//! Shard capacity estimation
//!
//! `rows_per_shard = clamp(floor(max_file_size_mb * 1 MiB / row_bytes), 1, max_rows_per_file)`
//!
//! Estimated once per writer session from the first row written.

use crate::config::StoreConfig;
use crate::errors::{StoreError, StoreResult};

/// Bytes per megabyte as used for shard sizing (MiB)
pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Computes the rows-per-shard limit for rows of `row_bytes` bytes.
///
/// # Errors
///
/// `InvalidRow` if `row_bytes == 0`.
pub fn estimate_rows_per_shard(
    row_bytes: u64,
    max_file_size_mb: f64,
    max_rows_per_file: u64,
) -> StoreResult<u64> {
    if row_bytes == 0 {
        return Err(StoreError::InvalidRow(
            "sample row is zero bytes; cannot size shards".into(),
        ));
    }

    let upper = max_rows_per_file.max(1);
    let by_size = (max_file_size_mb * BYTES_PER_MB / row_bytes as f64).floor();

    // Saturating float-to-int casts: NaN -> 0, overflow -> u64::MAX
    let by_size = by_size as u64;

    Ok(by_size.clamp(1, upper))
}

/// Same as [`estimate_rows_per_shard`], taking limits from a config.
pub fn estimate_for_config(row_bytes: u64, config: &StoreConfig) -> StoreResult<u64> {
    estimate_rows_per_shard(row_bytes, config.max_file_size_mb, config.max_rows_per_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capped_by_max_rows() {
        // 10 x f64 = 80 bytes; 100 MiB fits far more than 5 rows
        assert_eq!(estimate_rows_per_shard(80, 100.0, 5).unwrap(), 5);
    }

    #[test]
    fn test_limited_by_size() {
        // 1 MiB / 1024 bytes = 1024 rows
        assert_eq!(estimate_rows_per_shard(1024, 1.0, 1_000_000).unwrap(), 1024);
        // floor, not round
        assert_eq!(estimate_rows_per_shard(1000, 1.0, 1_000_000).unwrap(), 1048);
    }

    #[test]
    fn test_clamped_to_one_row() {
        assert_eq!(estimate_rows_per_shard(80, 0.000_01, 1_000_000).unwrap(), 1);
    }

    #[test]
    fn test_zero_byte_row_rejected() {
        assert!(matches!(
            estimate_rows_per_shard(0, 100.0, 10),
            Err(StoreError::InvalidRow(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(estimate_for_config(80, &config).unwrap(), 1_000_000);
        assert_eq!(estimate_for_config(8000, &config).unwrap(), 13107);
    }
}
