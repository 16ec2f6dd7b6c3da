//! # Platform Device Tables
//!
//! MCFG, HPET, SPCR, WDDT and the opaque licensing tables.

use crate::gas::decode_gas;
use crate::TableHeader;
use alloc::vec::Vec;
use firmtab_core::{bits, ByteCursor, DecodeConfig, DecodeResult, FieldRecord, Hint, Value};

// =============================================================================
// MCFG
// =============================================================================

/// Size of one configuration space allocation entry
const MCFG_ENTRY_LEN: usize = 16;

pub(crate) fn decode_mcfg(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    _: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    cursor.skip(8)?;
    let mut allocations = Vec::with_capacity(cursor.remaining() / MCFG_ENTRY_LEN);
    while cursor.remaining() >= MCFG_ENTRY_LEN {
        let mut entry = FieldRecord::new("ResourceAllocation");
        entry.read::<u64>(cursor, "address")?;
        entry.read::<u16>(cursor, "segment")?;
        entry.read::<u8>(cursor, "start_bus")?;
        entry.read::<u8>(cursor, "end_bus")?;
        cursor.skip(4)?;
        allocations.push(entry);
    }
    record.add("resources", allocations);
    Ok(())
}

// =============================================================================
// HPET
// =============================================================================

fn page_protection_name(value: u64) -> &'static str {
    match value {
        0 => "No Guarantee for page protection",
        1 => "4KB page protected",
        2 => "64KB page protected",
        _ => "Reserved",
    }
}

pub(crate) fn decode_hpet(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    _: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    let id = u64::from(record.read::<u32>(cursor, "event_timer_block_id")?);
    record
        .add_bits("pci_vid", "event_timer_block_id", id, 31, 16)
        .add_flag("legacy_replacement_irq_routing_capable", "event_timer_block_id", id, 15)
        .add_bits("count_size_cap_counter_size", "event_timer_block_id", id, 13, 13)
        .add_bits("num_comparators", "event_timer_block_id", id, 12, 8)
        .add_bits("hardware_rev_id", "event_timer_block_id", id, 7, 0);
    record.add("base_address", decode_gas(cursor)?);
    record.read_hinted::<u8>(cursor, "hpet_number", Hint::Decimal)?;
    record.read_hinted::<u16>(cursor, "main_counter_min_clock_tick_in_periodic_mode", Hint::Decimal)?;
    let capabilities = u64::from(record.read::<u8>(cursor, "capabilities")?);
    record
        .add_named("page_protection", bits::extract(capabilities, 3, 0), page_protection_name)
        .add_bits("oem_attributes", "capabilities", capabilities, 7, 4);
    Ok(())
}

// =============================================================================
// SPCR
// =============================================================================

/// Baud rate the firmware used for console redirection
fn baud_rate(code: u8) -> Option<u32> {
    match code {
        3 => Some(9600),
        4 => Some(19200),
        6 => Some(57600),
        7 => Some(115_200),
        _ => None,
    }
}

pub(crate) fn decode_spcr(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    _: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    record.read_hinted::<u8>(cursor, "interface_type", Hint::Decimal)?;
    cursor.skip(3)?;
    record.add("base_address", decode_gas(cursor)?);
    record.read::<u8>(cursor, "int_type")?;
    record.read::<u8>(cursor, "irq")?;
    record.read::<u32>(cursor, "global_sys_int")?;
    let baud = record.read_hinted::<u8>(cursor, "baud_rate", Hint::Decimal)?;
    record.add_hinted("baud_rate_decode", baud_rate(baud), Hint::Decimal);
    record.read_hinted::<u8>(cursor, "parity", Hint::Decimal)?;
    record.read_hinted::<u8>(cursor, "stop_bits", Hint::Decimal)?;
    let flow = u64::from(record.read::<u8>(cursor, "flow_control")?);
    record
        .add_flag("dcd", "flow_control", flow, 0)
        .add_flag("rts_cts", "flow_control", flow, 1)
        .add_flag("xon_xoff", "flow_control", flow, 2);
    record.read_hinted::<u8>(cursor, "terminal_type", Hint::Decimal)?;
    cursor.skip(1)?;
    record.read::<u16>(cursor, "pci_did")?;
    record.read::<u16>(cursor, "pci_vid")?;
    record.read::<u8>(cursor, "pci_bus")?;
    record.read::<u8>(cursor, "pci_dev")?;
    record.read::<u8>(cursor, "pci_func")?;
    record.read::<u32>(cursor, "pci_flags")?;
    record.read::<u8>(cursor, "pci_segment")?;
    cursor.skip(4)?;
    Ok(())
}

// =============================================================================
// WDDT
// =============================================================================

pub(crate) fn decode_wddt(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    _: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    record.read::<u16>(cursor, "tco_spec_version")?;
    record.read::<u16>(cursor, "tco_description_table_version")?;
    record.read::<u16>(cursor, "pci_vid")?;
    record.add("tco_base_address", decode_gas(cursor)?);
    record.read_hinted::<u16>(cursor, "timer_min_count", Hint::Decimal)?;
    record.read_hinted::<u16>(cursor, "timer_max_count", Hint::Decimal)?;
    record.read_hinted::<u16>(cursor, "timer_count_period", Hint::Decimal)?;
    let status = u64::from(record.read::<u16>(cursor, "status")?);
    record
        .add_flag("wdt_available", "status", status, 0)
        .add_flag("wdt_active", "status", status, 1)
        .add_flag("owned_by_os", "status", status, 2)
        .add_flag("user_reset_event", "status", status, 11)
        .add_flag("wdt_event", "status", status, 12)
        .add_flag("power_fail_event", "status", status, 13)
        .add_flag("unknown_reset_event", "status", status, 14);
    let capability = u64::from(record.read::<u16>(cursor, "capability")?);
    record
        .add_flag("auto_reset", "capability", capability, 0)
        .add_flag("alert_support", "capability", capability, 1)
        .add_flag("platform_directed_shutdown", "capability", capability, 2)
        .add_flag("immediate_shutdown", "capability", capability, 3)
        .add_flag("bios_handoff_support", "capability", capability, 4);
    Ok(())
}

// =============================================================================
// LICENSING TABLES
// =============================================================================

/// MSDM and SLIC carry a vendor licensing blob
pub(crate) fn decode_licensing(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    _: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    record.add_hinted("software_licensing_structure", Value::Bytes(cursor.rest().to_vec()), Hint::Dump);
    Ok(())
}
