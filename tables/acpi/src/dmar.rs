//! # DMAR
//!
//! DMA Remapping table: remapping hardware units and reserved regions,
//! each carrying a list of device scopes, each scope carrying a PCI path.

use crate::common::{begin_word, byte_header, unknown_word, word_header};
use crate::TableHeader;
use alloc::vec::Vec;
use firmtab_core::dispatch::{self, Candidate, Registry, Selector};
use firmtab_core::{ByteCursor, DecodeConfig, DecodeResult, Discriminant, FieldRecord, Hint};

/// DMA Remapping Hardware Unit Definition
pub const DRHD: u32 = 0;
/// Reserved Memory Region Reporting
pub const RMRR: u32 = 1;
/// Root Port ATS Capability Reporting
pub const ATSR: u32 = 2;
/// Remapping Hardware Static Affinity
pub const RHSA: u32 = 3;

fn scope_type_name(value: u64) -> &'static str {
    match value {
        1 => "PCI Endpoint Device",
        2 => "PCI Sub-hierarchy",
        3 => "IOAPIC",
        4 => "MSI Capable HPET",
        5 => "ACPI Namespace Device",
        _ => "Reserved",
    }
}

// =============================================================================
// DEVICE SCOPES
// =============================================================================

fn device_scope(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("DeviceScope");
    record.read_named::<u8>(c, "type", scope_type_name)?;
    record.read_hinted::<u8>(c, "length", Hint::Decimal)?;
    c.skip(2)?;
    record.read::<u8>(c, "enumeration_id")?;
    record.read::<u8>(c, "start_bus_number")?;

    let mut paths = Vec::new();
    while c.remaining() >= 2 {
        let mut path = FieldRecord::new("DeviceScopePath");
        path.read::<u8>(c, "pci_device")?;
        path.read::<u8>(c, "pci_function")?;
        paths.push(path);
    }
    record.add("paths", paths);
    Ok(record)
}

/// Device scopes share one layout whatever their type
pub static DEVICE_SCOPES: Registry<DecodeConfig> = Registry::new(
    "DMAR device scope",
    byte_header,
    &[Candidate {
        name: "DeviceScope",
        selector: Selector::Any,
        decode: device_scope,
    }],
);

// =============================================================================
// REMAPPING STRUCTURES
// =============================================================================

fn drhd(c: &mut ByteCursor<'_>, _: &Discriminant, config: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_word(c, "DRHD")?;
    let flags = record.read::<u8>(c, "flags")?;
    record.add_flag("include_pci_all", "flags", flags.into(), 0);
    c.skip(1)?;
    record.read::<u16>(c, "segment_number")?;
    record.read::<u64>(c, "register_base_address")?;
    dispatch::dispatch_to_field(&mut record, "device_scopes", c, &DEVICE_SCOPES, config)?;
    Ok(record)
}

fn rmrr(c: &mut ByteCursor<'_>, _: &Discriminant, config: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_word(c, "RMRR")?;
    c.skip(2)?;
    record.read::<u16>(c, "segment_number")?;
    record.read::<u64>(c, "base_address")?;
    record.read::<u64>(c, "limit_address")?;
    dispatch::dispatch_to_field(&mut record, "device_scopes", c, &DEVICE_SCOPES, config)?;
    Ok(record)
}

fn atsr(c: &mut ByteCursor<'_>, _: &Discriminant, config: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_word(c, "ATSR")?;
    let flags = record.read::<u8>(c, "flags")?;
    record.add_flag("all_ports", "flags", flags.into(), 0);
    c.skip(1)?;
    record.read::<u16>(c, "segment_number")?;
    dispatch::dispatch_to_field(&mut record, "device_scopes", c, &DEVICE_SCOPES, config)?;
    Ok(record)
}

fn rhsa(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_word(c, "RHSA")?;
    c.skip(4)?;
    record.read::<u64>(c, "register_base_address")?;
    record.read::<u32>(c, "proximity_domain")?;
    Ok(record)
}

/// Remapping structures, tried in order
pub static SUBTABLES: Registry<DecodeConfig> = Registry::new(
    "DMAR",
    word_header,
    &[
        Candidate {
            name: "DRHD",
            selector: Selector::Kind(DRHD),
            decode: drhd,
        },
        Candidate {
            name: "RMRR",
            selector: Selector::Kind(RMRR),
            decode: rmrr,
        },
        Candidate {
            name: "ATSR",
            selector: Selector::Kind(ATSR),
            decode: atsr,
        },
        Candidate {
            name: "RHSA",
            selector: Selector::Kind(RHSA),
            decode: rhsa,
        },
        Candidate {
            name: "Unknown",
            selector: Selector::Any,
            decode: unknown_word,
        },
    ],
);

pub(crate) fn decode_body(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    config: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    record.read_hinted::<u8>(cursor, "host_address_width", Hint::Decimal)?;
    let flags = record.read::<u8>(cursor, "flags")?;
    record.add_flag("intr_remap", "flags", flags.into(), 0);
    cursor.skip(10)?;
    dispatch::dispatch_to_field(record, "remapping_structures", cursor, &SUBTABLES, config)
}
