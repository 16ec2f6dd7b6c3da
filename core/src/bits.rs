//! # Bit Ranges
//!
//! Extraction of inclusive bit ranges from scalar values. Bit 0 is the
//! least significant bit. Ranges are fixed by table layouts, so an invalid
//! range is a programming error and panics.

/// Extract bits `hi..=lo` of `value`, shifted down to bit 0
///
/// # Panics
///
/// Panics if `hi < lo` or `hi > 63`.
#[inline]
pub const fn extract(value: u64, hi: u32, lo: u32) -> u64 {
    assert!(hi < 64 && lo <= hi, "invalid bit range");
    let width = hi - lo + 1;
    let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
    (value >> lo) & mask
}

/// Extract the single bit `n`
#[inline]
pub const fn bit(value: u64, n: u32) -> u64 {
    extract(value, n, n)
}

/// Check whether bit `n` is set
#[inline]
pub const fn flag(value: u64, n: u32) -> bool {
    bit(value, n) != 0
}
