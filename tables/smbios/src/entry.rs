//! # Entry Points
//!
//! The entry point structure tells where the structure table lives and
//! which SMBIOS version it follows.
//!
//! | Anchor | Size | Table address |
//! |--------|------|---------------|
//! | `_SM_` (with `_DMI_` at 0x10) | 31 bytes | 32-bit, exact length |
//! | `_SM3_` | 24 bytes | 64-bit, maximum size |

use core::fmt;
use firmtab_core::locate::{ScanSpec, SizeField};
use firmtab_core::{checksum, ByteCursor, DecodeError, DecodeResult, FieldRecord, Hint};
use static_assertions::const_assert_eq;

/// 2.x anchor
pub const ANCHOR_V2: &[u8; 4] = b"_SM_";
/// Intermediate anchor inside the 2.x entry point
pub const INTERMEDIATE_ANCHOR: &[u8; 5] = b"_DMI_";
/// 3.x anchor
pub const ANCHOR_V3: &[u8; 5] = b"_SM3_";

/// SMBIOS specification version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SmbiosVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl SmbiosVersion {
    /// Create new version
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Check whether this version is `major.minor` or later
    #[inline]
    pub fn at_least(self, major: u8, minor: u8) -> bool {
        self >= Self::new(major, minor)
    }
}

impl fmt::Display for SmbiosVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

// =============================================================================
// 2.x ENTRY POINT
// =============================================================================

/// 32-bit entry point (`_SM_`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint2 {
    /// Checksum byte over `length` bytes
    pub checksum: u8,
    /// Entry point length
    pub length: u8,
    /// Major version
    pub major_version: u8,
    /// Minor version
    pub minor_version: u8,
    /// Size of the largest structure
    pub max_structure_size: u16,
    /// Entry point revision
    pub entry_point_revision: u8,
    /// Revision specific bytes
    pub formatted_area: [u8; 5],
    /// `_DMI_`
    pub intermediate_anchor: [u8; 5],
    /// Checksum over the intermediate entry point
    pub intermediate_checksum: u8,
    /// Size of the structure table
    pub structure_table_length: u16,
    /// Physical address of the structure table
    pub structure_table_address: u32,
    /// Number of structures
    pub number_structures: u16,
    /// BCD encoded version
    pub bcd_revision: u8,
}

impl EntryPoint2 {
    /// Encoded size
    pub const LEN: usize = 0x1F;

    /// Start of the intermediate (`_DMI_`) entry point
    pub const INTERMEDIATE_OFFSET: usize = 0x10;

    /// Locator parameters
    pub const SCAN: ScanSpec = ScanSpec {
        signature: ANCHOR_V2,
        size_field: SizeField::U8(5),
        header_len: Self::LEN,
        record_stride: None,
        alignment: 16,
    };

    /// Decode the entry point
    pub fn decode(bytes: &[u8]) -> DecodeResult<Self> {
        let mut c = ByteCursor::new(bytes);
        let anchor: [u8; 4] = c.read()?;
        if &anchor != ANCHOR_V2 {
            return Err(DecodeError::NotFound);
        }
        Ok(Self {
            checksum: c.read()?,
            length: c.read()?,
            major_version: c.read()?,
            minor_version: c.read()?,
            max_structure_size: c.read()?,
            entry_point_revision: c.read()?,
            formatted_area: c.read()?,
            intermediate_anchor: c.read()?,
            intermediate_checksum: c.read()?,
            structure_table_length: c.read()?,
            structure_table_address: c.read()?,
            number_structures: c.read()?,
            bcd_revision: c.read()?,
        })
    }

    /// Field record form
    pub fn to_record(&self) -> FieldRecord {
        let mut record = FieldRecord::new("EntryPoint");
        record
            .add_hinted("anchor_string", *ANCHOR_V2, Hint::Ascii)
            .add("checksum", self.checksum)
            .add_hinted("length", self.length, Hint::Decimal)
            .add_hinted("major_version", self.major_version, Hint::Decimal)
            .add_hinted("minor_version", self.minor_version, Hint::Decimal)
            .add_hinted("max_structure_size", self.max_structure_size, Hint::Decimal)
            .add("entry_point_revision", self.entry_point_revision)
            .add("formatted_area", self.formatted_area)
            .add_hinted("intermediate_anchor_string", self.intermediate_anchor, Hint::Ascii)
            .add("intermediate_checksum", self.intermediate_checksum)
            .add_hinted("structure_table_length", self.structure_table_length, Hint::Decimal)
            .add("structure_table_address", self.structure_table_address)
            .add_hinted("number_structures", self.number_structures, Hint::Decimal)
            .add("bcd_revision", self.bcd_revision);
        record
    }
}

const_assert_eq!(4 + 1 + 1 + 1 + 1 + 2 + 1 + 5 + 5 + 1 + 2 + 4 + 2 + 1, EntryPoint2::LEN);

// =============================================================================
// 3.x ENTRY POINT
// =============================================================================

/// 64-bit entry point (`_SM3_`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint3 {
    /// Checksum byte over `length` bytes
    pub checksum: u8,
    /// Entry point length
    pub length: u8,
    /// Major version
    pub major_version: u8,
    /// Minor version
    pub minor_version: u8,
    /// Specification document revision
    pub docrev: u8,
    /// Entry point revision
    pub entry_point_revision: u8,
    /// Upper bound of the structure table size
    pub structure_table_max_size: u32,
    /// Physical address of the structure table
    pub structure_table_address: u64,
}

impl EntryPoint3 {
    /// Encoded size
    pub const LEN: usize = 0x18;

    /// Locator parameters
    pub const SCAN: ScanSpec = ScanSpec {
        signature: ANCHOR_V3,
        size_field: SizeField::U8(6),
        header_len: Self::LEN,
        record_stride: None,
        alignment: 16,
    };

    /// Decode the entry point
    pub fn decode(bytes: &[u8]) -> DecodeResult<Self> {
        let mut c = ByteCursor::new(bytes);
        let anchor: [u8; 5] = c.read()?;
        if &anchor != ANCHOR_V3 {
            return Err(DecodeError::NotFound);
        }
        let entry = Self {
            checksum: c.read()?,
            length: c.read()?,
            major_version: c.read()?,
            minor_version: c.read()?,
            docrev: c.read()?,
            entry_point_revision: c.read()?,
            structure_table_max_size: {
                c.skip(1)?;
                c.read()?
            },
            structure_table_address: c.read()?,
        };
        Ok(entry)
    }

    /// Field record form
    pub fn to_record(&self) -> FieldRecord {
        let mut record = FieldRecord::new("EntryPoint3");
        record
            .add_hinted("anchor_string", *ANCHOR_V3, Hint::Ascii)
            .add("checksum", self.checksum)
            .add_hinted("length", self.length, Hint::Decimal)
            .add_hinted("major_version", self.major_version, Hint::Decimal)
            .add_hinted("minor_version", self.minor_version, Hint::Decimal)
            .add_hinted("docrev", self.docrev, Hint::Decimal)
            .add("entry_point_revision", self.entry_point_revision)
            .add_hinted("structure_table_max_size", self.structure_table_max_size, Hint::Decimal)
            .add("structure_table_address", self.structure_table_address);
        record
    }
}

const_assert_eq!(5 + 1 + 1 + 1 + 1 + 1 + 1 + 1 + 4 + 8, EntryPoint3::LEN);

// =============================================================================
// EITHER
// =============================================================================

/// A decoded entry point of either generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// `_SM_`
    V2(EntryPoint2),
    /// `_SM3_`
    V3(EntryPoint3),
}

impl EntryPoint {
    /// Decode whichever entry point `bytes` starts with
    pub fn decode(bytes: &[u8]) -> DecodeResult<Self> {
        if bytes.starts_with(ANCHOR_V3) {
            EntryPoint3::decode(bytes).map(Self::V3)
        } else {
            EntryPoint2::decode(bytes).map(Self::V2)
        }
    }

    /// Bytes to read at an address whose anchor is `anchor`
    pub fn size_for_anchor(anchor: &[u8]) -> Option<usize> {
        if anchor.starts_with(ANCHOR_V3) {
            Some(EntryPoint3::LEN)
        } else if anchor.starts_with(ANCHOR_V2) {
            Some(EntryPoint2::LEN)
        } else {
            None
        }
    }

    /// Specification version
    pub fn version(&self) -> SmbiosVersion {
        match self {
            Self::V2(ep) => SmbiosVersion::new(ep.major_version, ep.minor_version),
            Self::V3(ep) => SmbiosVersion::new(ep.major_version, ep.minor_version),
        }
    }

    /// Physical address of the structure table
    pub fn table_address(&self) -> u64 {
        match self {
            Self::V2(ep) => ep.structure_table_address.into(),
            Self::V3(ep) => ep.structure_table_address,
        }
    }

    /// Structure table size (exact for 2.x, an upper bound for 3.x)
    pub fn table_length(&self) -> usize {
        match self {
            Self::V2(ep) => ep.structure_table_length.into(),
            Self::V3(ep) => ep.structure_table_max_size as usize,
        }
    }

    /// Check the entry point checksums against the raw bytes
    ///
    /// The 2.x intermediate entry point carries its own checksum, which
    /// must hold as well.
    pub fn verify(&self, bytes: &[u8]) -> DecodeResult<()> {
        let length = match self {
            Self::V2(ep) => usize::from(ep.length),
            Self::V3(ep) => usize::from(ep.length),
        };
        let whole = bytes.get(..length).ok_or(DecodeError::MalformedLength {
            offset: 5,
            length,
            available: bytes.len(),
        })?;
        checksum::verify(whole)?;
        if let Self::V2(_) = self {
            let intermediate = bytes
                .get(EntryPoint2::INTERMEDIATE_OFFSET..EntryPoint2::LEN)
                .ok_or(DecodeError::BufferUnderrun {
                    offset: EntryPoint2::INTERMEDIATE_OFFSET,
                    needed: EntryPoint2::LEN - EntryPoint2::INTERMEDIATE_OFFSET,
                    available: bytes.len().saturating_sub(EntryPoint2::INTERMEDIATE_OFFSET),
                })?;
            checksum::verify(intermediate)?;
        }
        Ok(())
    }

    /// Field record form
    pub fn to_record(&self) -> FieldRecord {
        match self {
            Self::V2(ep) => ep.to_record(),
            Self::V3(ep) => ep.to_record(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn entry_v2(address: u32, length: u16, minor: u8) -> Vec<u8> {
        let mut bytes = alloc::vec![0u8; EntryPoint2::LEN];
        bytes[0..4].copy_from_slice(ANCHOR_V2);
        bytes[5] = EntryPoint2::LEN as u8;
        bytes[6] = 2;
        bytes[7] = minor;
        bytes[0x10..0x15].copy_from_slice(INTERMEDIATE_ANCHOR);
        bytes[0x16..0x18].copy_from_slice(&length.to_le_bytes());
        bytes[0x18..0x1C].copy_from_slice(&address.to_le_bytes());
        checksum::fixup(&mut bytes[EntryPoint2::INTERMEDIATE_OFFSET..], 5);
        checksum::fixup(&mut bytes, 4);
        bytes
    }

    #[test]
    fn test_decode_v2() {
        let bytes = entry_v2(0x000F_0800, 0x1A0, 8);
        let ep = EntryPoint::decode(&bytes).unwrap();
        assert_eq!(ep.version(), SmbiosVersion::new(2, 8));
        assert_eq!(ep.table_address(), 0xF0800);
        assert_eq!(ep.table_length(), 0x1A0);
        assert_eq!(ep.verify(&bytes), Ok(()));
        assert_eq!(ep.to_record().get_bytes("intermediate_anchor_string"), Some(&b"_DMI_"[..]));
    }

    #[test]
    fn test_intermediate_checksum_checked() {
        let mut bytes = entry_v2(0x000F_0800, 0x1A0, 8);
        // Compensated inside the outer sum only
        bytes[0x15] = bytes[0x15].wrapping_add(1);
        bytes[0x04] = bytes[0x04].wrapping_sub(1);
        let ep = EntryPoint::decode(&bytes).unwrap();
        assert!(matches!(ep.verify(&bytes), Err(DecodeError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_decode_v3() {
        let mut bytes = alloc::vec![0u8; EntryPoint3::LEN];
        bytes[0..5].copy_from_slice(ANCHOR_V3);
        bytes[6] = EntryPoint3::LEN as u8;
        bytes[7] = 3;
        bytes[8] = 4;
        bytes[12..16].copy_from_slice(&0x2000u32.to_le_bytes());
        bytes[16..24].copy_from_slice(&0x1_0000_0000u64.to_le_bytes());
        checksum::fixup(&mut bytes, 5);

        let ep = EntryPoint::decode(&bytes).unwrap();
        assert_eq!(ep.version(), SmbiosVersion::new(3, 4));
        assert_eq!(ep.table_address(), 0x1_0000_0000);
        assert_eq!(ep.table_length(), 0x2000);
        assert_eq!(ep.verify(&bytes), Ok(()));
    }

    #[test]
    fn test_version_ordering_is_numeric() {
        assert!(SmbiosVersion::new(2, 10).at_least(2, 4));
        assert!(!SmbiosVersion::new(2, 3).at_least(2, 4));
        assert!(SmbiosVersion::new(3, 0).at_least(2, 6));
    }

    #[test]
    fn test_unknown_anchor() {
        assert_eq!(EntryPoint::decode(&[0u8; 31]), Err(DecodeError::NotFound));
        assert_eq!(EntryPoint::size_for_anchor(b"_SM3_"), Some(24));
        assert_eq!(EntryPoint::size_for_anchor(b"_DMI_"), None);
    }
}
