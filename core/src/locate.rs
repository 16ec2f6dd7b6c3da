//! # Table Locator
//!
//! Finds tables that firmware leaves in legacy BIOS memory (RSDP, SMBIOS
//! entry points, `$PIR`) by scanning for a signature at a fixed alignment.
//! A signature hit only counts when the declared size is plausible and the
//! bytes it covers sum to zero; otherwise the scan continues. Ranges are
//! searched in the order given and the first accepted hit wins.

use crate::checksum;
use crate::error::DecodeResult;
use crate::signature_str;
use alloc::vec::Vec;
use firmtab_hal::{HalError, MemorySource, PhysAddr};

/// Where the checksummed size of a candidate comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeField {
    /// `u8` at the given offset from the signature
    U8(usize),
    /// Little-endian `u16` at the given offset
    U16(usize),
    /// Constant size
    Fixed(usize),
}

/// What to scan for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSpec {
    /// Anchor bytes
    pub signature: &'static [u8],
    /// Size of the checksummed structure
    pub size_field: SizeField,
    /// Fixed part that every accepted structure must contain
    pub header_len: usize,
    /// Size of the records that follow the header, if any
    pub record_stride: Option<usize>,
    /// Scan step; anchors only appear at multiples of it
    pub alignment: usize,
}

/// A physical range to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    /// Start of the range
    pub base: PhysAddr,
    /// Length in bytes
    pub len: usize,
    /// Whether a table found here sits where the standard says it should
    pub compliant: bool,
}

impl ScanRange {
    /// A range where tables are expected
    pub const fn compliant(base: u64, len: usize) -> Self {
        Self {
            base: PhysAddr::new(base),
            len,
            compliant: true,
        }
    }

    /// A range some firmware uses although it should not
    pub const fn legacy(base: u64, len: usize) -> Self {
        Self {
            base: PhysAddr::new(base),
            len,
            compliant: false,
        }
    }
}

/// An accepted signature hit inside a scanned snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Offset of the signature in the snapshot
    pub offset: usize,
    /// Checksummed size
    pub size: usize,
}

/// A table found in physical memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// Physical address of the signature
    pub address: PhysAddr,
    /// Checksummed size
    pub size: usize,
    /// Whether the table sat in a compliant range
    pub compliant: bool,
    /// Snapshot of the checksummed bytes
    pub bytes: Vec<u8>,
}

impl ScanSpec {
    fn declared_size(&self, candidate: &[u8]) -> Option<usize> {
        match self.size_field {
            SizeField::U8(at) => candidate.get(at).map(|&b| usize::from(b)),
            SizeField::U16(at) => candidate
                .get(at..at + 2)
                .map(|b| usize::from(u16::from_le_bytes([b[0], b[1]]))),
            SizeField::Fixed(size) => Some(size),
        }
    }

    fn accepts(&self, candidate: &[u8], size: usize) -> bool {
        size >= self.header_len
            && size <= candidate.len()
            && self
                .record_stride
                .map_or(true, |stride| (size - self.header_len) % stride == 0)
            && checksum::is_valid(&candidate[..size])
    }
}

/// Scan a snapshot for the first accepted hit
pub fn scan(bytes: &[u8], spec: &ScanSpec) -> Option<Hit> {
    let step = spec.alignment.max(1);
    (0..bytes.len())
        .step_by(step)
        .filter(|&offset| bytes[offset..].starts_with(spec.signature))
        .find_map(|offset| {
            let candidate = &bytes[offset..];
            match spec.declared_size(candidate) {
                Some(size) if spec.accepts(candidate, size) => Some(Hit { offset, size }),
                size => {
                    log::trace!(
                        "Rejected {} candidate at offset {:#x} (size {:?})",
                        signature_str(spec.signature),
                        offset,
                        size
                    );
                    None
                }
            }
        })
}

/// Scan `ranges` in order and return the first accepted table
///
/// Ranges the memory source cannot back are skipped; other source
/// failures abort the search.
pub fn locate<M: MemorySource + ?Sized>(
    memory: &M,
    spec: &ScanSpec,
    ranges: &[ScanRange],
) -> DecodeResult<Option<Located>> {
    for range in ranges {
        let bytes = match memory.read_memory(range.base, range.len) {
            Ok(bytes) => bytes,
            Err(HalError::InvalidAddress) => {
                log::debug!("Skipping unreadable range {}+{:#x}", range.base, range.len);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        // Alignment is of the physical address, not of the range offset
        let step = spec.alignment.max(1) as u64;
        let skip = range.base.align_up(step).offset_from(range.base).unwrap_or(0) as usize;
        let window = bytes.get(skip..).unwrap_or(&[]);

        if let Some(hit) = scan(window, spec) {
            let offset = skip + hit.offset;
            let address = range.base.add(offset as u64);
            log::debug!(
                "Found {} at {} ({} bytes{})",
                signature_str(spec.signature),
                address,
                hit.size,
                if range.compliant { "" } else { ", non-compliant location" }
            );
            return Ok(Some(Located {
                address,
                size: hit.size,
                compliant: range.compliant,
                bytes: bytes[offset..offset + hit.size].to_vec(),
            }));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use firmtab_hal::{HalResult, MemoryImage};

    const SPEC: ScanSpec = ScanSpec {
        signature: b"$TBL",
        size_field: SizeField::U8(4),
        header_len: 8,
        record_stride: Some(4),
        alignment: 16,
    };

    /// `$TBL`, size, checksum, padding, then `records` 4-byte records
    fn table(records: usize) -> Vec<u8> {
        let size = 8 + records * 4;
        let mut bytes = alloc::vec![0u8; size];
        bytes[..4].copy_from_slice(b"$TBL");
        bytes[4] = size as u8;
        for (i, b) in bytes[8..].iter_mut().enumerate() {
            *b = i as u8 + 1;
        }
        checksum::fixup(&mut bytes, 5);
        bytes
    }

    fn place(image: &mut [u8], at: usize, bytes: &[u8]) {
        image[at..at + bytes.len()].copy_from_slice(bytes);
    }

    #[test]
    fn test_scan_accepts_valid_table() {
        let mut image = alloc::vec![0u8; 256];
        place(&mut image, 0x40, &table(2));
        assert_eq!(scan(&image, &SPEC), Some(Hit { offset: 0x40, size: 16 }));
    }

    #[test]
    fn test_scan_skips_bad_checksum_and_continues() {
        let mut image = alloc::vec![0u8; 256];
        let mut bad = table(2);
        bad[9] ^= 0xFF;
        place(&mut image, 0x20, &bad);
        place(&mut image, 0x80, &table(1));
        assert_eq!(scan(&image, &SPEC), Some(Hit { offset: 0x80, size: 12 }));
    }

    #[test]
    fn test_scan_ignores_unaligned_signature() {
        let mut image = alloc::vec![0u8; 256];
        place(&mut image, 0x24, &table(1));
        assert_eq!(scan(&image, &SPEC), None);
    }

    #[test]
    fn test_scan_rejects_bad_sizes() {
        // Size not header plus whole records
        let mut image = alloc::vec![0u8; 64];
        let mut odd = table(1);
        odd[4] = 10;
        checksum::fixup(&mut odd[..10], 5);
        place(&mut image, 0, &odd);
        assert_eq!(scan(&image, &SPEC), None);

        // Size running past the snapshot
        let mut image = alloc::vec![0u8; 32];
        let long = table(8);
        place(&mut image, 16, &long[..16]);
        assert_eq!(scan(&image, &SPEC), None);
    }

    #[test]
    fn test_locate_prefers_earlier_range() {
        let mut image = MemoryImage::new()
            .with_zeroed(PhysAddr::new(0xE0000), 0x100)
            .with_zeroed(PhysAddr::new(0xF0000), 0x100);
        image.write(PhysAddr::new(0xE0010), &table(1)).unwrap();
        image.write(PhysAddr::new(0xF0030), &table(2)).unwrap();

        let ranges = [ScanRange::compliant(0xF0000, 0x100), ScanRange::legacy(0xE0000, 0x100)];
        let found = locate(&image, &SPEC, &ranges).unwrap().unwrap();
        assert_eq!(found.address, PhysAddr::new(0xF0030));
        assert!(found.compliant);
        assert_eq!(found.bytes, table(2));

        let legacy_first = [ranges[1], ranges[0]];
        let found = locate(&image, &SPEC, &legacy_first).unwrap().unwrap();
        assert_eq!(found.address, PhysAddr::new(0xE0010));
        assert!(!found.compliant);
    }

    #[test]
    fn test_locate_skips_unbacked_ranges() {
        let mut image = MemoryImage::new().with_zeroed(PhysAddr::new(0xE0000), 0x100);
        image.write(PhysAddr::new(0xE0000), &table(0)).unwrap();
        let ranges = [ScanRange::compliant(0xF0000, 0x100), ScanRange::legacy(0xE0000, 0x100)];
        let found = locate(&image, &SPEC, &ranges).unwrap().unwrap();
        assert_eq!(found.size, 8);
        assert!(!found.compliant);

        let empty = MemoryImage::new();
        assert_eq!(locate(&empty, &SPEC, &ranges), Ok(None));
    }

    #[test]
    fn test_locate_aligns_to_physical_address() {
        let mut image = MemoryImage::new().with_zeroed(PhysAddr::new(0xE0000), 0x100);
        // Range-relative offset 0x10 but not 16-byte aligned in memory
        image.write(PhysAddr::new(0xE0018), &table(0)).unwrap();
        image.write(PhysAddr::new(0xE0020), &table(1)).unwrap();

        let ranges = [ScanRange::compliant(0xE0008, 0xF8)];
        let found = locate(&image, &SPEC, &ranges).unwrap().unwrap();
        assert_eq!(found.address, PhysAddr::new(0xE0020));
        assert_eq!(found.bytes, table(1));
    }

    struct Denied;

    impl MemorySource for Denied {
        fn read_memory(&self, _: PhysAddr, _: usize) -> HalResult<Vec<u8>> {
            Err(HalError::PermissionDenied)
        }
    }

    #[test]
    fn test_locate_propagates_source_failure() {
        let ranges = [ScanRange::compliant(0xF0000, 0x100)];
        assert_eq!(
            locate(&Denied, &SPEC, &ranges),
            Err(DecodeError::Hal(HalError::PermissionDenied))
        );
    }
}
