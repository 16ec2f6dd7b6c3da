//! 8-bit byte-sum checksums.
//!
//! ACPI, SMBIOS and PIR tables all carry a checksum byte chosen so that
//! the sum of every byte in the checksummed range is zero modulo 256.

use crate::error::{DecodeError, DecodeResult};

/// Sum of `bytes` modulo 256
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Check whether `bytes` sums to zero
#[inline]
pub fn is_valid(bytes: &[u8]) -> bool {
    checksum(bytes) == 0
}

/// Fail with [`DecodeError::ChecksumMismatch`] unless `bytes` sums to zero
pub fn verify(bytes: &[u8]) -> DecodeResult<()> {
    match checksum(bytes) {
        0 => Ok(()),
        sum => Err(DecodeError::ChecksumMismatch { sum }),
    }
}

/// Rewrite `bytes[at]` so that `bytes` sums to zero
///
/// # Panics
///
/// Panics if `at` is out of bounds.
pub fn fixup(bytes: &mut [u8], at: usize) {
    bytes[at] = 0;
    bytes[at] = checksum(bytes).wrapping_neg();
}
