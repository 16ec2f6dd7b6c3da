//! # MADT (`APIC`)
//!
//! Multiple APIC Description Table: local interrupt controller address
//! followed by interrupt controller structures.

use crate::common::{begin_byte, byte_header, unknown_byte};
use crate::TableHeader;
use alloc::vec::Vec;
use firmtab_core::dispatch::{self, Candidate, Registry, Selector};
use firmtab_core::{bits, ByteCursor, DecodeConfig, DecodeResult, Discriminant, FieldRecord, Value};

// =============================================================================
// SUBTABLE TYPES
// =============================================================================

/// Processor Local APIC
pub const LOCAL_APIC: u32 = 0x0;
/// I/O APIC
pub const IO_APIC: u32 = 0x1;
/// Interrupt Source Override
pub const INTERRUPT_SOURCE_OVERRIDE: u32 = 0x2;
/// Non-maskable Interrupt Source
pub const NMI_SOURCE: u32 = 0x3;
/// Local APIC NMI
pub const LOCAL_APIC_NMI: u32 = 0x4;
/// Local APIC Address Override
pub const LOCAL_APIC_ADDRESS_OVERRIDE: u32 = 0x5;
/// Processor Local x2APIC
pub const LOCAL_X2APIC: u32 = 0x9;
/// Local x2APIC NMI
pub const LOCAL_X2APIC_NMI: u32 = 0xA;
/// GIC CPU Interface
pub const GICC: u32 = 0xB;
/// GIC Distributor
pub const GICD: u32 = 0xC;

fn polarity_name(value: u64) -> &'static str {
    match value {
        0b00 => "Conforms to bus specifications",
        0b01 => "Active high",
        0b11 => "Active low",
        _ => "Reserved",
    }
}

fn trigger_mode_name(value: u64) -> &'static str {
    match value {
        0b00 => "Conforms to bus specifications",
        0b01 => "Edge-triggered",
        0b11 => "Level-triggered",
        _ => "Reserved",
    }
}

/// MPS INTI flags: polarity in bits 1:0, trigger mode in bits 3:2
fn read_inti_flags(record: &mut FieldRecord, cursor: &mut ByteCursor<'_>) -> DecodeResult<()> {
    let flags = u64::from(record.read::<u16>(cursor, "flags")?);
    record
        .add_named("polarity", bits::extract(flags, 1, 0), polarity_name)
        .add_named("trigger_mode", bits::extract(flags, 3, 2), trigger_mode_name);
    Ok(())
}

// =============================================================================
// SUBTABLE DECODERS
// =============================================================================

fn local_apic(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "LocalApic")?;
    record.read::<u8>(c, "proc_id")?;
    record.read::<u8>(c, "apic_id")?;
    let flags = record.read::<u32>(c, "flags")?;
    record.add_flag("enabled", "flags", flags.into(), 0);
    Ok(record)
}

fn io_apic(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "IOApic")?;
    record.read::<u8>(c, "io_apic_id")?;
    c.skip(1)?;
    record.read::<u32>(c, "io_apic_addr")?;
    record.read::<u32>(c, "global_system_interrupt_base")?;
    Ok(record)
}

fn interrupt_source_override(
    c: &mut ByteCursor<'_>,
    _: &Discriminant,
    _: &DecodeConfig,
) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "InterruptSourceOverride")?;
    record.read::<u8>(c, "bus")?;
    record.read::<u8>(c, "source")?;
    record.read::<u32>(c, "global_system_interrupt")?;
    read_inti_flags(&mut record, c)?;
    Ok(record)
}

fn nmi_source(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "NmiInterruptSource")?;
    read_inti_flags(&mut record, c)?;
    record.read::<u32>(c, "global_system_interrupt")?;
    Ok(record)
}

fn local_apic_nmi(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "LocalApicNmi")?;
    record.read::<u8>(c, "proc_id")?;
    read_inti_flags(&mut record, c)?;
    record.read::<u8>(c, "lint")?;
    Ok(record)
}

fn local_apic_address_override(
    c: &mut ByteCursor<'_>,
    _: &Discriminant,
    _: &DecodeConfig,
) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "LocalApicAddressOverride")?;
    c.skip(2)?;
    record.read::<u64>(c, "local_apic_address")?;
    Ok(record)
}

fn local_x2apic(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "x2Apic")?;
    c.skip(2)?;
    record.read::<u32>(c, "x2apicid")?;
    let flags = record.read::<u32>(c, "flags")?;
    record.add_flag("enabled", "flags", flags.into(), 0);
    record.read::<u32>(c, "uid")?;
    Ok(record)
}

fn local_x2apic_nmi(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "x2ApicNmi")?;
    read_inti_flags(&mut record, c)?;
    record.read::<u32>(c, "uid")?;
    record.read::<u8>(c, "lint")?;
    c.skip(3)?;
    Ok(record)
}

fn gicc(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "GIC")?;
    c.skip(2)?;
    record.read::<u32>(c, "gic_id")?;
    record.read::<u32>(c, "uid")?;
    let flags = u64::from(record.read::<u32>(c, "flags")?);
    record
        .add_flag("enabled", "flags", flags, 0)
        .add_flag("performance_interrupt_mode", "flags", flags, 1);
    record.read::<u32>(c, "parking_protocol_version")?;
    record.read::<u32>(c, "performance_interrupt_gsiv")?;
    record.read::<u64>(c, "parked_address")?;
    record.read::<u64>(c, "physical_base_address")?;
    Ok(record)
}

fn gicd(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(c, "GICDistributor")?;
    c.skip(2)?;
    record.read::<u32>(c, "gic_id")?;
    record.read::<u64>(c, "physical_base_address")?;
    record.read::<u32>(c, "system_vector_base")?;
    c.skip(4)?;
    Ok(record)
}

/// Interrupt controller structures, tried in order
pub static SUBTABLES: Registry<DecodeConfig> = Registry::new(
    "MADT",
    byte_header,
    &[
        Candidate {
            name: "LocalApic",
            selector: Selector::Kind(LOCAL_APIC),
            decode: local_apic,
        },
        Candidate {
            name: "IOApic",
            selector: Selector::Kind(IO_APIC),
            decode: io_apic,
        },
        Candidate {
            name: "InterruptSourceOverride",
            selector: Selector::Kind(INTERRUPT_SOURCE_OVERRIDE),
            decode: interrupt_source_override,
        },
        Candidate {
            name: "NmiInterruptSource",
            selector: Selector::Kind(NMI_SOURCE),
            decode: nmi_source,
        },
        Candidate {
            name: "LocalApicNmi",
            selector: Selector::Kind(LOCAL_APIC_NMI),
            decode: local_apic_nmi,
        },
        Candidate {
            name: "LocalApicAddressOverride",
            selector: Selector::Kind(LOCAL_APIC_ADDRESS_OVERRIDE),
            decode: local_apic_address_override,
        },
        Candidate {
            name: "x2Apic",
            selector: Selector::Kind(LOCAL_X2APIC),
            decode: local_x2apic,
        },
        Candidate {
            name: "x2ApicNmi",
            selector: Selector::Kind(LOCAL_X2APIC_NMI),
            decode: local_x2apic_nmi,
        },
        Candidate {
            name: "GIC",
            selector: Selector::Kind(GICC),
            decode: gicc,
        },
        Candidate {
            name: "GICDistributor",
            selector: Selector::Kind(GICD),
            decode: gicd,
        },
        Candidate {
            name: "Unknown",
            selector: Selector::Any,
            decode: unknown_byte,
        },
    ],
);

// =============================================================================
// TABLE BODY
// =============================================================================

/// Map enabled processors from `from` to `to` for subtables of `kind`
fn processor_map(
    subtables: &[FieldRecord],
    kind: &str,
    from: &'static str,
    to: &'static str,
) -> Vec<FieldRecord> {
    subtables
        .iter()
        .filter(|s| s.kind() == kind && s.get_bool("enabled") == Some(true))
        .filter_map(|s| {
            let mut entry = FieldRecord::new("Mapping");
            entry.add(from, s.get(from)?.clone()).add(to, s.get(to)?.clone());
            Some(entry)
        })
        .collect()
}

pub(crate) fn decode_body(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    config: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    record.read::<u32>(cursor, "local_apic_address")?;
    let flags = record.read::<u32>(cursor, "flags")?;
    record.add_flag("pcat_compat", "flags", flags.into(), 0);

    let result = dispatch::dispatch_to_field(record, "interrupt_controller_structures", cursor, &SUBTABLES, config);

    let subtables = record.get_records("interrupt_controller_structures").unwrap_or(&[]);
    let procid_apicid = processor_map(subtables, "LocalApic", "proc_id", "apic_id");
    let uid_x2apicid = processor_map(subtables, "x2Apic", "uid", "x2apicid");
    record
        .add("procid_apicid", Value::Records(procid_apicid))
        .add("uid_x2apicid", Value::Records(uid_x2apicid));
    result
}
