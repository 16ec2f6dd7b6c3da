//! Decode status flags.

use bitflags::bitflags;

bitflags! {
    /// Problems found while decoding a table in best-effort mode
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DecodeStatus: u32 {
        /// Byte sum over the table is not zero
        const CHECKSUM_MISMATCH = 1 << 0;
        /// Declared length exceeds the bytes supplied
        const LENGTH_TRUNCATED = 1 << 1;
        /// Body decoding stopped before the end of the table
        const BODY_INCOMPLETE = 1 << 2;
        /// At least one record was re-decoded by a catch-all
        const RECORD_FALLBACK = 1 << 3;
    }
}

impl DecodeStatus {
    /// Check whether the table decoded without any problem
    #[inline]
    pub fn is_clean(self) -> bool {
        self.is_empty()
    }
}
