//! # SRAT
//!
//! System Resource Affinity Table: processor and memory proximity domains.

use crate::common::{begin_byte, byte_header, join_u64, unknown_byte};
use crate::TableHeader;
use firmtab_core::dispatch::{self, Candidate, Registry, Selector};
use firmtab_core::{ByteCursor, DecodeConfig, DecodeResult, Discriminant, FieldRecord};

/// Processor Local APIC/SAPIC Affinity
pub const LOCAL_APIC_AFFINITY: u32 = 0;
/// Memory Affinity
pub const MEMORY_AFFINITY: u32 = 1;
/// Processor Local x2APIC Affinity
pub const LOCAL_X2APIC_AFFINITY: u32 = 2;

fn local_apic_affinity(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "LocalApicAffinity")?;
    let domain_low = record.read::<u8>(c, "proximity_domain_7_0")?;
    record.read::<u8>(c, "apic_id")?;
    let flags = record.read::<u32>(c, "flags")?;
    record.add_flag("enabled", "flags", flags.into(), 0);
    record.read::<u8>(c, "local_sapic_eid")?;
    let domain_high: [u8; 3] = c.read()?;
    record.add("proximity_domain_31_8", domain_high);
    let high = u32::from_le_bytes([domain_high[0], domain_high[1], domain_high[2], 0]);
    record.add("proximity_domain", (high << 8) | u32::from(domain_low));
    record.read::<u32>(c, "clock_domain")?;
    Ok(record)
}

fn memory_affinity(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "MemoryAffinity")?;
    record.read::<u32>(c, "proximity_domain")?;
    c.skip(2)?;
    let base_low = record.read::<u32>(c, "base_address_low")?;
    let base_high = record.read::<u32>(c, "base_address_high")?;
    record.add("base_address", join_u64(base_low, base_high));
    let len_low = record.read::<u32>(c, "length_low")?;
    let len_high = record.read::<u32>(c, "length_high")?;
    record.add("range_length", join_u64(len_low, len_high));
    c.skip(4)?;
    let flags = u64::from(record.read::<u32>(c, "flags")?);
    record
        .add_flag("enabled", "flags", flags, 0)
        .add_flag("hot_pluggable", "flags", flags, 1)
        .add_flag("nonvolatile", "flags", flags, 2);
    c.skip(8)?;
    Ok(record)
}

fn local_x2apic_affinity(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "x2ApicAffinity")?;
    c.skip(2)?;
    record.read::<u32>(c, "proximity_domain")?;
    record.read::<u32>(c, "x2apic_id")?;
    let flags = record.read::<u32>(c, "flags")?;
    record.add_flag("enabled", "flags", flags.into(), 0);
    record.read::<u32>(c, "clock_domain")?;
    c.skip(4)?;
    Ok(record)
}

/// Affinity structures, tried in order
pub static SUBTABLES: Registry<DecodeConfig> = Registry::new(
    "SRAT",
    byte_header,
    &[
        Candidate {
            name: "LocalApicAffinity",
            selector: Selector::Kind(LOCAL_APIC_AFFINITY),
            decode: local_apic_affinity,
        },
        Candidate {
            name: "MemoryAffinity",
            selector: Selector::Kind(MEMORY_AFFINITY),
            decode: memory_affinity,
        },
        Candidate {
            name: "x2ApicAffinity",
            selector: Selector::Kind(LOCAL_X2APIC_AFFINITY),
            decode: local_x2apic_affinity,
        },
        Candidate {
            name: "Unknown",
            selector: Selector::Any,
            decode: unknown_byte,
        },
    ],
);

pub(crate) fn decode_body(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    config: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    // Table revision (always 1) and reserved
    cursor.skip(4)?;
    cursor.skip(8)?;
    dispatch::dispatch_to_field(record, "subtables", cursor, &SUBTABLES, config)
}
