//! # Root Tables
//!
//! RSDP, RSDT and XSDT, plus the legacy BIOS search for the RSDP.

use crate::TableHeader;
use firmtab_core::locate::{self, Located, ScanRange, ScanSpec, SizeField};
use firmtab_core::{checksum, ByteCursor, DecodeConfig, DecodeResult, FieldRecord, Hint, Value};
use alloc::vec::Vec;
use firmtab_hal::{HalError, MemorySource, PhysAddr};

/// RSDP anchor
pub const RSDP_SIGNATURE: &[u8; 8] = b"RSD PTR ";

/// Bytes covered by the original checksum
pub const RSDP_V1_LEN: usize = 20;

/// Size of the revision 2 structure
pub const RSDP_V2_LEN: usize = 36;

/// Largest extended length accepted from a revision 2 structure
const RSDP_MAX_LEN: usize = 0x1000;

/// Location of the EBDA segment in the BIOS data area
const EBDA_POINTER: u64 = 0x40E;

/// Size of the EBDA window searched
const EBDA_SEARCH_LEN: usize = 1024;

/// RSDP search parameters
pub const RSDP_SCAN: ScanSpec = ScanSpec {
    signature: RSDP_SIGNATURE,
    size_field: SizeField::Fixed(RSDP_V1_LEN),
    header_len: RSDP_V1_LEN,
    record_stride: None,
    alignment: 16,
};

/// Decode a Root System Description Pointer
///
/// Fields added by revision 2 are absent for older structures. Both
/// checksums are verified and reported as flags.
pub fn decode_rsdp(bytes: &[u8]) -> DecodeResult<FieldRecord> {
    let mut cursor = ByteCursor::new(bytes);
    let mut record = FieldRecord::new("RSDP");
    record.read_hinted::<[u8; 8]>(&mut cursor, "signature", Hint::Ascii)?;
    record.read::<u8>(&mut cursor, "checksum")?;
    record.read_hinted::<[u8; 6]>(&mut cursor, "oemid", Hint::Ascii)?;
    let revision = record.read::<u8>(&mut cursor, "revision")?;
    record.read::<u32>(&mut cursor, "rsdt_address")?;
    record.add("checksum_valid", checksum::is_valid(&bytes[..RSDP_V1_LEN]));

    if revision >= 2 {
        let length = record.read_hinted::<u32>(&mut cursor, "length", Hint::Decimal)?;
        record.read::<u64>(&mut cursor, "xsdt_address")?;
        record.read::<u8>(&mut cursor, "extended_checksum")?;
        cursor.skip(3)?;
        let extended = bytes.get(..length as usize).map(checksum::is_valid);
        record.add("extended_checksum_valid", extended);
    } else {
        for name in ["length", "xsdt_address", "extended_checksum", "extended_checksum_valid"] {
            record.add(name, Value::Absent);
        }
    }
    record.finish(&mut cursor);
    Ok(record)
}

pub(crate) fn decode_rsdt(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    _: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    record.add("tables", Value::ints(cursor.read_all::<u32>()));
    Ok(())
}

pub(crate) fn decode_xsdt(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    _: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    record.add("tables", Value::ints(cursor.read_all::<u64>()));
    Ok(())
}

/// Search legacy BIOS memory for the RSDP
///
/// The first KiB of the EBDA is searched first, then `0xE0000..0x100000`.
/// For revision 2 structures the returned bytes cover the declared length,
/// unless that length is implausible or fails the extended checksum, in
/// which case only the first 20 bytes are kept.
pub fn locate_rsdp<M: MemorySource + ?Sized>(memory: &M) -> DecodeResult<Option<Located>> {
    let mut ranges = Vec::with_capacity(2);
    match memory.read_memory(PhysAddr::new(EBDA_POINTER), 2) {
        Ok(bytes) => {
            let segment = ByteCursor::new(&bytes).read::<u16>()?;
            if segment != 0 {
                ranges.push(ScanRange::compliant(PhysAddr::from_segment(segment).as_u64(), EBDA_SEARCH_LEN));
            }
        }
        Err(HalError::InvalidAddress) => log::debug!("No BIOS data area, skipping EBDA search"),
        Err(err) => return Err(err.into()),
    }
    ranges.push(ScanRange::compliant(0xE0000, 0x20000));

    let Some(mut found) = locate::locate(memory, &RSDP_SCAN, &ranges)? else {
        return Ok(None);
    };

    let revision = found.bytes.get(15).copied().unwrap_or(0);
    if revision >= 2 {
        match extended_rsdp(memory, found.address) {
            Some(bytes) => {
                found.size = bytes.len();
                found.bytes = bytes;
            }
            None => log::warn!(
                "RSDP at {}: unusable extended structure, keeping the first {} bytes",
                found.address,
                RSDP_V1_LEN
            ),
        }
    }
    Ok(Some(found))
}

/// Read the revision 2 structure at `address`, if its declared length is
/// plausible and the extended checksum holds
fn extended_rsdp<M: MemorySource + ?Sized>(memory: &M, address: PhysAddr) -> Option<Vec<u8>> {
    let head = memory.read_memory(address, RSDP_V2_LEN).ok()?;
    let length = ByteCursor::new(&head).peek_at::<u32>(20).ok()? as usize;
    if !(RSDP_V2_LEN..=RSDP_MAX_LEN).contains(&length) {
        log::debug!("RSDP at {}: declared length {} out of range", address, length);
        return None;
    }
    let bytes = memory.read_memory(address, length).ok()?;
    checksum::is_valid(&bytes).then_some(bytes)
}
