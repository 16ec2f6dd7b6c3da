//! # PMTT and MPST
//!
//! Platform memory topology (socket, memory controller, DIMM, each level
//! nested in the one above) and memory power states.

use crate::TableHeader;
use alloc::vec::Vec;
use firmtab_core::dispatch::{self, Candidate, Registry, Selector};
use firmtab_core::{ByteCursor, DecodeConfig, DecodeResult, Discriminant, FieldRecord, Hint, Value};

// =============================================================================
// PMTT
// =============================================================================

/// Socket
pub const SOCKET: u32 = 0;
/// Memory controller
pub const MEMORY_CONTROLLER: u32 = 1;
/// Physical component (DIMM)
pub const DIMM: u32 = 2;

fn memory_type_name(value: u64) -> &'static str {
    match value {
        0b00 => "Volatile memory",
        0b01 => "Both volatile and non-volatile memory",
        0b10 => "Non-volatile memory",
        _ => "Reserved",
    }
}

/// `type: u8, reserved: u8, length: u16`
fn pmtt_header(cursor: &ByteCursor<'_>) -> DecodeResult<Discriminant> {
    let kind = cursor.peek::<u8>()?;
    let length = cursor.peek_at::<u16>(2)?;
    Ok(Discriminant::new(kind.into(), length.into()))
}

/// Header and flags shared by every PMTT subtable
fn common(c: &mut ByteCursor<'_>) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("SubtableCommon");
    record.read_hinted::<u8>(c, "type", Hint::Decimal)?;
    c.skip(1)?;
    record.read_hinted::<u16>(c, "length", Hint::Decimal)?;
    let flags = u64::from(record.read::<u16>(c, "flags")?);
    record
        .add_flag("top_level_aggregator_device", "flags", flags, 0)
        .add_flag("physical_topology_element", "flags", flags, 1)
        .add_hinted(
            "component_memory_type",
            firmtab_core::bits::extract(flags, 3, 2),
            Hint::Named(memory_type_name),
        );
    c.skip(2)?;
    Ok(record)
}

fn socket(c: &mut ByteCursor<'_>, _: &Discriminant, config: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("Socket");
    record.add("subtable_common", common(c)?);
    record.read::<u16>(c, "socket_identifier")?;
    c.skip(2)?;
    dispatch::dispatch_to_field(&mut record, "resources", c, &CONTROLLERS, config)?;
    Ok(record)
}

fn memory_controller(c: &mut ByteCursor<'_>, _: &Discriminant, config: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("MemoryController");
    record.add("subtable_common", common(c)?);
    record.read_hinted::<u32>(c, "read_latency", Hint::Decimal)?;
    record.read_hinted::<u32>(c, "write_latency", Hint::Decimal)?;
    record.read_hinted::<u32>(c, "read_bandwidth", Hint::Decimal)?;
    record.read_hinted::<u32>(c, "write_bandwidth", Hint::Decimal)?;
    record.read::<u16>(c, "optimal_access_unit")?;
    record.read::<u16>(c, "optimal_access_alignment")?;
    c.skip(2)?;
    let domains = record.read_hinted::<u16>(c, "number_proximity_domains", Hint::Decimal)?;
    record.add("domains", Value::ints(c.read_n::<u32>(domains.into())?));
    dispatch::dispatch_to_field(&mut record, "subtables", c, &DIMMS, config)?;
    Ok(record)
}

fn dimm(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("DIMM");
    record.add("subtable_common", common(c)?);
    record.read::<u16>(c, "physical_component_id")?;
    c.skip(2)?;
    record.read_hinted::<u32>(c, "dimm_size", Hint::Unit("MB"))?;
    record.read::<u32>(c, "smbios_handle")?;
    Ok(record)
}

fn unknown(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("Unknown");
    record.read_hinted::<u8>(c, "type", Hint::Decimal)?;
    c.skip(1)?;
    record.read_hinted::<u16>(c, "length", Hint::Decimal)?;
    record.add_hinted("data", c.rest(), Hint::Dump);
    Ok(record)
}

/// Top level of the topology
pub static SOCKETS: Registry<DecodeConfig> = Registry::new(
    "PMTT",
    pmtt_header,
    &[
        Candidate {
            name: "Socket",
            selector: Selector::Kind(SOCKET),
            decode: socket,
        },
        Candidate {
            name: "MemoryController",
            selector: Selector::Kind(MEMORY_CONTROLLER),
            decode: memory_controller,
        },
        Candidate {
            name: "DIMM",
            selector: Selector::Kind(DIMM),
            decode: dimm,
        },
        Candidate {
            name: "Unknown",
            selector: Selector::Any,
            decode: unknown,
        },
    ],
);

/// Resources nested in a socket
pub static CONTROLLERS: Registry<DecodeConfig> = Registry::new(
    "PMTT socket",
    pmtt_header,
    &[
        Candidate {
            name: "MemoryController",
            selector: Selector::Kind(MEMORY_CONTROLLER),
            decode: memory_controller,
        },
        Candidate {
            name: "Unknown",
            selector: Selector::Any,
            decode: unknown,
        },
    ],
);

/// Components nested in a memory controller
pub static DIMMS: Registry<DecodeConfig> = Registry::new(
    "PMTT controller",
    pmtt_header,
    &[
        Candidate {
            name: "DIMM",
            selector: Selector::Kind(DIMM),
            decode: dimm,
        },
        Candidate {
            name: "Unknown",
            selector: Selector::Any,
            decode: unknown,
        },
    ],
);

pub(crate) fn decode_pmtt(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    config: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    cursor.skip(4)?;
    dispatch::dispatch_to_field(record, "subtables", cursor, &SOCKETS, config)
}

// =============================================================================
// MPST
// =============================================================================

fn power_node(c: &mut ByteCursor<'_>) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("MemoryPowerNode");
    let flags = u64::from(record.read::<u8>(c, "flags")?);
    record
        .add_flag("enabled", "flags", flags, 0)
        .add_flag("power_managed", "flags", flags, 1)
        .add_flag("hot_pluggable", "flags", flags, 2);
    c.skip(1)?;
    record.read::<u16>(c, "node_id")?;
    record.read_hinted::<u32>(c, "length", Hint::Decimal)?;
    record.read::<u32>(c, "base_address_low")?;
    record.read::<u32>(c, "base_address_high")?;
    record.read::<u32>(c, "length_low")?;
    record.read::<u32>(c, "length_high")?;
    let states = record.read_hinted::<u32>(c, "num_power_states", Hint::Decimal)?;
    let components = record.read_hinted::<u32>(c, "num_physical_components", Hint::Decimal)?;

    let mut power_states = Vec::new();
    for _ in 0..states {
        let mut state = FieldRecord::new("PowerState");
        state.read::<u8>(c, "value")?;
        state.read::<u8>(c, "information_index")?;
        power_states.push(state);
    }
    record.add("power_states", power_states);
    record.add("physical_component_ids", Value::ints(c.read_n::<u16>(components as usize)?));
    Ok(record)
}

fn power_characteristics(c: &mut ByteCursor<'_>) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("PowerCharacteristics");
    let pss_id = u64::from(record.read::<u8>(c, "pss_id")?);
    record
        .add_bits("pss_id_value", "pss_id", pss_id, 5, 0)
        .add_bits("pss_id_revision", "pss_id", pss_id, 7, 6);
    let flags = u64::from(record.read::<u8>(c, "flags")?);
    record
        .add_flag("memory_content_preserved", "flags", flags, 0)
        .add_flag("autonomous_power_state_entry", "flags", flags, 1)
        .add_flag("autonomous_power_state_exit", "flags", flags, 2);
    c.skip(2)?;
    record.read_hinted::<u32>(c, "average_power", Hint::Unit("mW"))?;
    record.read_hinted::<u32>(c, "relative_power", Hint::Decimal)?;
    record.read_hinted::<u64>(c, "exit_latency", Hint::Unit("ns"))?;
    c.skip(8)?;
    Ok(record)
}

/// Read `count` fixed-layout entries into the list field `name`
fn read_list(
    record: &mut FieldRecord,
    name: &'static str,
    cursor: &mut ByteCursor<'_>,
    count: u16,
    decode: fn(&mut ByteCursor<'_>) -> DecodeResult<FieldRecord>,
) -> DecodeResult<()> {
    let mut entries = Vec::new();
    let mut result = Ok(());
    for _ in 0..count {
        match decode(cursor) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                result = Err(err);
                break;
            }
        }
    }
    record.add(name, entries);
    result
}

pub(crate) fn decode_mpst(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    _: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    record.read::<u8>(cursor, "pcc_id")?;
    cursor.skip(3)?;
    let nodes = record.read_hinted::<u16>(cursor, "memory_power_node_count", Hint::Decimal)?;
    cursor.skip(2)?;
    read_list(record, "memory_power_nodes", cursor, nodes, power_node)?;
    let characteristics = record.read_hinted::<u16>(cursor, "characteristics_count", Hint::Decimal)?;
    cursor.skip(2)?;
    read_list(record, "characteristics", cursor, characteristics, power_characteristics)
}
