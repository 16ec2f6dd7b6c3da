//! # firmtab PIR - PCI Interrupt Routing Table
//!
//! The `$PIR` table describes how the PCI interrupt pins of each slot are
//! wired to the interrupt router. Legacy BIOSes leave it in the `0xF0000`
//! segment; some place it at `0xE0000`, which is searched as well but
//! reported as non-compliant.
//!
//! ## Layout
//!
//! ```text
//! +--------------------+----------+----------+-----+
//! | 32-byte header     | slot 0   | slot 1   | ... |
//! +--------------------+----------+----------+-----+
//!                       16 bytes   16 bytes
//! ```
//!
//! `table_size` covers the header and every slot entry, and the bytes it
//! covers sum to zero.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

use alloc::vec::Vec;
use firmtab_core::locate::{self, ScanRange, ScanSpec, SizeField};
use firmtab_core::{
    checksum, dispatch, ByteCursor, Candidate, DecodeConfig, DecodeError, DecodeResult, DecodeStatus, Discriminant,
    FieldRecord, Hint, Registry, Selector, Value,
};
use firmtab_hal::{MemorySource, PhysAddr};
use static_assertions::const_assert_eq;

/// Table anchor
pub const PIR_SIGNATURE: &[u8; 4] = b"$PIR";

/// Header size
pub const HEADER_LEN: usize = 32;

/// Slot entry size
pub const SLOT_LEN: usize = 16;

/// Offset of `table_size` in the header
const TABLE_SIZE_OFFSET: usize = 6;

/// Locator parameters
pub const PIR_SCAN: ScanSpec = ScanSpec {
    signature: PIR_SIGNATURE,
    size_field: SizeField::U16(TABLE_SIZE_OFFSET),
    header_len: HEADER_LEN,
    record_stride: Some(SLOT_LEN),
    alignment: 16,
};

/// Ranges searched, in order
pub const PIR_RANGES: [ScanRange; 2] = [
    ScanRange::compliant(0xF0000, 0x10000),
    ScanRange::legacy(0xE0000, 0x10000),
];

// =============================================================================
// HEADER
// =============================================================================

/// `$PIR` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PirHeader {
    /// `$PIR`
    pub signature: [u8; 4],
    /// Table version (major in the high byte)
    pub version: u16,
    /// Header plus slot entries
    pub table_size: u16,
    /// Bus of the interrupt router
    pub router_bus: u8,
    /// Device and function of the interrupt router
    pub router_devfn: u8,
    /// IRQs reserved for PCI
    pub exclusive_irqs: u16,
    /// Vendor ID of a compatible router
    pub compatible_vendor_id: u16,
    /// Device ID of a compatible router
    pub compatible_device_id: u16,
    /// Router miniport data
    pub miniport_data: u32,
    /// Checksum byte
    pub checksum: u8,
}

const_assert_eq!(4 + 2 + 2 + 1 + 1 + 2 + 2 + 2 + 4 + 11 + 1, HEADER_LEN);

impl PirHeader {
    /// Decode a header
    pub fn decode(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        Ok(Self {
            signature: c.read()?,
            version: c.read()?,
            table_size: c.read()?,
            router_bus: c.read()?,
            router_devfn: c.read()?,
            exclusive_irqs: c.read()?,
            compatible_vendor_id: c.read()?,
            compatible_device_id: c.read()?,
            miniport_data: c.read()?,
            checksum: {
                c.skip(11)?;
                c.read()?
            },
        })
    }

    /// Field record form
    pub fn to_record(&self) -> FieldRecord {
        let devfn = u64::from(self.router_devfn);
        let mut record = FieldRecord::new("PirHeader");
        record
            .add_hinted("signature", self.signature, Hint::Ascii)
            .add("version", self.version)
            .add_hinted("table_size", self.table_size, Hint::Decimal)
            .add("pci_interrupt_router_bus", self.router_bus)
            .add("pci_interrupt_router_dev_func", self.router_devfn)
            .add_bits("pci_interrupt_router_device", "pci_interrupt_router_dev_func", devfn, 7, 3)
            .add_bits("pci_interrupt_router_function", "pci_interrupt_router_dev_func", devfn, 2, 0)
            .add("pci_exclusive_irq_bitmap", self.exclusive_irqs)
            .add("pci_exclusive_irqs", Value::ints(irqs(self.exclusive_irqs)))
            .add("compatible_pci_interrupt_router_vendor_id", self.compatible_vendor_id)
            .add("compatible_pci_interrupt_router_device_id", self.compatible_device_id)
            .add("miniport_data", self.miniport_data)
            .add("checksum", self.checksum);
        record
    }
}

/// IRQ numbers set in a bitmap
fn irqs(bitmap: u16) -> impl Iterator<Item = u8> {
    (0..16u8).filter(move |&irq| bitmap & (1 << irq) != 0)
}

// =============================================================================
// SLOT ENTRIES
// =============================================================================

/// Link value and IRQ bitmap field names, INTA# to INTD#
const PINS: [(&str, &str); 4] = [
    ("link_value_inta", "irq_bitmap_inta"),
    ("link_value_intb", "irq_bitmap_intb"),
    ("link_value_intc", "irq_bitmap_intc"),
    ("link_value_intd", "irq_bitmap_intd"),
];

fn slot_header(c: &ByteCursor<'_>) -> DecodeResult<Discriminant> {
    // Every entry has the same size; peeking the bus keeps short tails an error
    c.peek::<u8>()?;
    Ok(Discriminant::new(0, SLOT_LEN))
}

fn decode_slot(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("SlotEntry");
    record.read::<u8>(c, "pci_bus_num")?;
    let device = u64::from(record.read::<u8>(c, "pci_device_num")?);
    record.add_bits("device", "pci_device_num", device, 7, 3);
    for (link, bitmap) in PINS {
        record.read_hinted::<u8>(c, link, Hint::Hex)?;
        record.read_hinted::<u16>(c, bitmap, Hint::Hex)?;
    }
    record.read_hinted::<u8>(c, "slot_num", Hint::Decimal)?;
    c.skip(1)?;
    Ok(record)
}

/// Slot entries have no type code; one decoder takes them all
pub static SLOTS: Registry<DecodeConfig> = Registry::new(
    "PIR",
    slot_header,
    &[Candidate {
        name: "SlotEntry",
        selector: Selector::Any,
        decode: decode_slot,
    }],
);

// =============================================================================
// TABLE
// =============================================================================

/// Where a located table was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Physical address of the header
    pub address: PhysAddr,
    /// Whether the table sat in the `0xF0000` segment
    pub compliant: bool,
}

/// A decoded PCI interrupt routing table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PirTable {
    /// Fixed header
    pub header: PirHeader,
    /// Slot entries in table order
    pub slots: Vec<FieldRecord>,
    /// Location, when the table was found by scanning memory
    pub placement: Option<Placement>,
    /// Problems tolerated while decoding
    pub status: DecodeStatus,
    /// Errors that cut the slot list short
    pub errors: Vec<DecodeError>,
}

impl PirTable {
    /// Decode a table from its bytes
    pub fn decode(bytes: &[u8], config: &DecodeConfig) -> DecodeResult<Self> {
        let header = PirHeader::decode(&mut ByteCursor::new(bytes))?;
        if &header.signature != PIR_SIGNATURE {
            return Err(DecodeError::NotFound);
        }

        let size = usize::from(header.table_size);
        if size < HEADER_LEN || size > bytes.len() || (size - HEADER_LEN) % SLOT_LEN != 0 {
            return Err(DecodeError::MalformedLength {
                offset: TABLE_SIZE_OFFSET,
                length: size,
                available: bytes.len(),
            });
        }
        let table = &bytes[..size];

        let mut status = DecodeStatus::empty();
        let sum = checksum::checksum(table);
        if config.verify_checksums && sum != 0 {
            if config.is_strict() {
                return Err(DecodeError::ChecksumMismatch { sum });
            }
            log::warn!("$PIR: checksum mismatch (sum {:#04x})", sum);
            status |= DecodeStatus::CHECKSUM_MISMATCH;
        }

        let mut slots = Vec::new();
        let mut errors = Vec::new();
        let mut cursor = ByteCursor::with_base(&table[HEADER_LEN..], HEADER_LEN);
        if let Err(err) = dispatch::dispatch_into(&mut cursor, &SLOTS, config, &mut slots) {
            if config.is_strict() {
                return Err(err);
            }
            status |= DecodeStatus::BODY_INCOMPLETE;
            errors.push(err);
        }

        Ok(Self {
            header,
            slots,
            placement: None,
            status,
            errors,
        })
    }

    /// Scan the BIOS segments for the table and decode it
    pub fn locate<M: MemorySource + ?Sized>(memory: &M, config: &DecodeConfig) -> DecodeResult<Option<Self>> {
        let Some(found) = locate::locate(memory, &PIR_SCAN, &PIR_RANGES)? else {
            log::debug!("No $PIR table found");
            return Ok(None);
        };
        if !found.compliant {
            log::warn!("$PIR table at {} lies outside the 0xF0000 segment", found.address);
        }

        let mut table = Self::decode(&found.bytes, config)?;
        table.placement = Some(Placement {
            address: found.address,
            compliant: found.compliant,
        });
        Ok(Some(table))
    }

    /// Check whether the table sits where legacy software looks for it
    ///
    /// Tables decoded from bytes have no placement and report `false`.
    pub fn is_compliant(&self) -> bool {
        self.placement.is_some_and(|p| p.compliant)
    }

    /// Header and slots as one record
    pub fn to_record(&self) -> FieldRecord {
        FieldRecord::new("PIR")
            .with("header", self.header.to_record())
            .with("structures", self.slots.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use firmtab_hal::MemoryImage;

    fn slot(bus: u8, device: u8, slot_num: u8) -> [u8; SLOT_LEN] {
        let mut entry = [0u8; SLOT_LEN];
        entry[0] = bus;
        entry[1] = device << 3;
        entry[2] = 0x60;
        entry[3..5].copy_from_slice(&0xDEB8u16.to_le_bytes());
        entry[5] = 0x61;
        entry[6..8].copy_from_slice(&0xDEB8u16.to_le_bytes());
        entry[14] = slot_num;
        entry
    }

    fn pir(slots: &[[u8; SLOT_LEN]]) -> Vec<u8> {
        let size = HEADER_LEN + slots.len() * SLOT_LEN;
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(PIR_SIGNATURE);
        bytes[4..6].copy_from_slice(&0x0100u16.to_le_bytes());
        bytes[6..8].copy_from_slice(&(size as u16).to_le_bytes());
        bytes[9] = 0x1F << 3;
        bytes[10..12].copy_from_slice(&0x0C20u16.to_le_bytes());
        bytes[12..14].copy_from_slice(&0x8086u16.to_le_bytes());
        bytes[14..16].copy_from_slice(&0x122Eu16.to_le_bytes());
        for s in slots {
            bytes.extend_from_slice(s);
        }
        checksum::fixup(&mut bytes, 31);
        bytes
    }

    fn memory_with(tables: &[(u64, Vec<u8>)]) -> MemoryImage {
        let mut memory = MemoryImage::new()
            .with_zeroed(PhysAddr::new(0xE0000), 0x10000)
            .with_zeroed(PhysAddr::new(0xF0000), 0x10000);
        for (address, bytes) in tables {
            memory.write(PhysAddr::new(*address), bytes).unwrap();
        }
        memory
    }

    #[test]
    fn test_decode_header_and_slots() {
        let bytes = pir(&[slot(0, 2, 0), slot(1, 0, 3)]);
        let table = PirTable::decode(&bytes, &DecodeConfig::strict()).unwrap();
        assert_eq!(table.header.table_size, 64);
        assert_eq!(table.slots.len(), 2);
        assert_eq!(table.slots[0].get_u64("device"), Some(2));
        assert_eq!(table.slots[0].get_u64("irq_bitmap_inta"), Some(0xDEB8));
        assert_eq!(table.slots[1].get_u64("slot_num"), Some(3));
        assert!(!table.slots[0].contains("data"));

        let header = table.header.to_record();
        assert_eq!(header.get_u64("pci_interrupt_router_device"), Some(0x1F));
        assert_eq!(header.get_ints("pci_exclusive_irqs"), Some(&[5, 10, 11][..]));
        assert!(!table.is_compliant());
    }

    #[test]
    fn test_locate_compliant() {
        let memory = memory_with(&[(0xF4A00, pir(&[slot(0, 1, 1)]))]);
        let table = PirTable::locate(&memory, &DecodeConfig::strict()).unwrap().unwrap();
        assert_eq!(
            table.placement,
            Some(Placement {
                address: PhysAddr::new(0xF4A00),
                compliant: true,
            })
        );
        assert!(table.is_compliant());
    }

    #[test]
    fn test_bad_checksum_rejected_and_scan_continues() {
        let mut bad = pir(&[slot(0, 1, 1)]);
        bad[31] = bad[31].wrapping_add(1);
        let good = pir(&[slot(0, 1, 1), slot(0, 2, 2)]);
        let memory = memory_with(&[(0xF0000, bad), (0xF0050, good)]);

        let table = PirTable::locate(&memory, &DecodeConfig::strict()).unwrap().unwrap();
        assert_eq!(table.placement.map(|p| p.address), Some(PhysAddr::new(0xF0050)));
        assert_eq!(table.slots.len(), 2);
    }

    #[test]
    fn test_legacy_range_is_not_compliant() {
        let memory = memory_with(&[(0xE8000, pir(&[slot(0, 4, 4)]))]);
        let table = PirTable::locate(&memory, &DecodeConfig::default()).unwrap().unwrap();
        assert_eq!(table.placement.map(|p| p.compliant), Some(false));
        assert!(!table.is_compliant());
    }

    #[test]
    fn test_size_not_a_slot_multiple() {
        let mut bytes = pir(&[slot(0, 1, 1)]);
        bytes[6..8].copy_from_slice(&40u16.to_le_bytes());
        checksum::fixup(&mut bytes[..40], 31);
        assert_eq!(
            PirTable::decode(&bytes, &DecodeConfig::default()),
            Err(DecodeError::MalformedLength {
                offset: 6,
                length: 40,
                available: 48,
            })
        );
        assert_eq!(locate::scan(&bytes, &PIR_SCAN), None);
    }

    #[test]
    fn test_checksum_mismatch_best_effort() {
        let mut bytes = pir(&[slot(0, 1, 1)]);
        bytes[HEADER_LEN + 14] = 9;
        assert_eq!(
            PirTable::decode(&bytes, &DecodeConfig::strict()),
            Err(DecodeError::ChecksumMismatch { sum: 8 })
        );
        let table = PirTable::decode(&bytes, &DecodeConfig::best_effort()).unwrap();
        assert_eq!(table.status, DecodeStatus::CHECKSUM_MISMATCH);
        assert_eq!(table.slots[0].get_u64("slot_num"), Some(9));
    }

    #[test]
    fn test_to_record() {
        let table = PirTable::decode(&pir(&[slot(0, 1, 1)]), &DecodeConfig::strict()).unwrap();
        let record = table.to_record();
        assert_eq!(record.get_record("header").and_then(|h| h.get_u64("version")), Some(0x0100));
        assert_eq!(record.get_records("structures").map(<[FieldRecord]>::len), Some(1));
    }
}
