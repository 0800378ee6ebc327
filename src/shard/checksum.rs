//! CRC32 checksum over shard headers
//!
//! Every header read validates its checksum; a mismatch is a corrupt shard.

use crc32fast::Hasher;

/// Computes a CRC32 (IEEE) checksum over the provided bytes.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
