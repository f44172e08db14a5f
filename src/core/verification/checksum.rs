//! Checksum calculation for artifact verification

use sha2::{Digest, Sha256};

/// Calculate the hex-encoded SHA-256 checksum of raw bytes
///
/// # Examples
///
/// ```
/// use pulse::core::verification::checksum::calculate_checksum_bytes;
///
/// let checksum = calculate_checksum_bytes(b"StartDate\tStartTime\n");
/// assert_eq!(checksum.len(), 64);
/// ```
pub fn calculate_checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compare a checksum against the checksum of `data`, ignoring hex case
pub fn verify_checksum_bytes(data: &[u8], expected: &str) -> bool {
    calculate_checksum_bytes(data).eq_ignore_ascii_case(expected)
}
