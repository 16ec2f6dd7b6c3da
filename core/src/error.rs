//! Decoding errors.

use core::fmt;
use firmtab_hal::HalError;

/// Result type for decoding operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors that can occur while decoding firmware tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A read needed more bytes than the cursor had left
    BufferUnderrun {
        /// Absolute position of the failed read
        offset: usize,
        /// Bytes requested
        needed: usize,
        /// Bytes remaining
        available: usize,
    },
    /// A declared length is zero, too small, or overruns its region
    MalformedLength {
        /// Absolute position of the record or table
        offset: usize,
        /// Declared length
        length: usize,
        /// Bytes actually available
        available: usize,
    },
    /// A record was given the same field name twice
    DuplicateFieldName {
        /// Record kind
        record: &'static str,
        /// Offending field
        field: &'static str,
    },
    /// The byte sum over a checksummed region is not zero
    ChecksumMismatch {
        /// Actual byte sum
        sum: u8,
    },
    /// No table or anchor was found
    NotFound,
    /// The byte source failed
    Hal(HalError),
}

impl From<HalError> for DecodeError {
    fn from(err: HalError) -> Self {
        Self::Hal(err)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferUnderrun {
                offset,
                needed,
                available,
            } => write!(
                f,
                "buffer underrun at {:#x}: needed {} bytes, {} available",
                offset, needed, available
            ),
            Self::MalformedLength {
                offset,
                length,
                available,
            } => write!(
                f,
                "malformed length {} at {:#x} ({} bytes available)",
                length, offset, available
            ),
            Self::DuplicateFieldName { record, field } => {
                write!(f, "duplicate field '{}' in {}", field, record)
            }
            Self::ChecksumMismatch { sum } => write!(f, "checksum mismatch (sum {:#04x})", sum),
            Self::NotFound => write!(f, "not found"),
            Self::Hal(err) => write!(f, "byte source: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_display() {
        let err = DecodeError::BufferUnderrun {
            offset: 0x24,
            needed: 4,
            available: 2,
        };
        assert_eq!(format!("{}", err), "buffer underrun at 0x24: needed 4 bytes, 2 available");
        assert_eq!(
            format!("{}", DecodeError::ChecksumMismatch { sum: 1 }),
            "checksum mismatch (sum 0x01)"
        );
        assert_eq!(
            format!("{}", DecodeError::from(HalError::InvalidAddress)),
            "byte source: address range not readable"
        );
    }
}
