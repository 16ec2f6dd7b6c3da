//! # Structure Decoders
//!
//! | Type | Structure |
//! |------|-----------|
//! | 0 | BIOS information |
//! | 1 | System information |
//! | 2 | Baseboard information |
//! | 3 | System enclosure |
//! | 4 | Processor information |
//! | 8 | Port connector |
//! | 9 | System slots |
//! | 126 | Inactive |
//! | 127 | End of table |
//!
//! Fields added by later versions are gated on the formatted length, and
//! where the layout depends on it, on the entry point version too.

use crate::structure::{decode_unknown, structure_header, SmbiosContext, Structure};
use alloc::vec::Vec;
use firmtab_core::{
    bits, ByteCursor, Candidate, DecodeResult, Discriminant, FieldRecord, Hint, Registry, Selector, Value,
};
use uuid::Uuid;

/// Type code of the inactive structure
pub const INACTIVE: u8 = 126;
/// Type code of the end-of-table structure
pub const END_OF_TABLE: u8 = 127;

// =============================================================================
// NAMES
// =============================================================================

fn wakeup_type_name(value: u64) -> &'static str {
    match value {
        0 => "Reserved",
        1 => "Other",
        2 => "Unknown",
        3 => "APM Timer",
        4 => "Modem Ring",
        5 => "LAN Remote",
        6 => "Power Switch",
        7 => "PCI PME#",
        8 => "AC Power Restored",
        _ => "Reserved",
    }
}

fn board_type_name(value: u64) -> &'static str {
    match value {
        0x1 => "Unknown",
        0x2 => "Other",
        0x3 => "Server Blade",
        0x4 => "Connectivity Switch",
        0x5 => "System Management Module",
        0x6 => "Processor Module",
        0x7 => "I/O Module",
        0x8 => "Memory Module",
        0x9 => "Daughter Board",
        0xA => "Motherboard",
        0xB => "Processor/Memory Module",
        0xC => "Processor/IO Module",
        0xD => "Interconnect Board",
        _ => "Reserved",
    }
}

fn enclosure_type_name(value: u64) -> &'static str {
    match value {
        0x01 => "Other",
        0x02 => "Unknown",
        0x03 => "Desktop",
        0x04 => "Low Profile Desktop",
        0x05 => "Pizza Box",
        0x06 => "Mini Tower",
        0x07 => "Tower",
        0x08 => "Portable",
        0x09 => "Laptop",
        0x0A => "Notebook",
        0x0B => "Hand Held",
        0x0C => "Docking Station",
        0x0D => "All in One",
        0x0E => "Sub Notebook",
        0x0F => "Space-saving",
        0x10 => "Lunch Box",
        0x11 => "Main Server Chassis",
        0x12 => "Expansion Chassis",
        0x13 => "SubChassis",
        0x14 => "Bus Expansion Chassis",
        0x15 => "Peripheral Chassis",
        0x16 => "RAID Chassis",
        0x17 => "Rack Mount Chassis",
        0x18 => "Sealed-case PC",
        0x19 => "Multi-system chassis",
        0x1A => "Compact PCI",
        0x1B => "Advanced TCA",
        0x1C => "Blade",
        0x1D => "Blade Enclosure",
        0x1E => "Tablet",
        0x1F => "Convertible",
        0x20 => "Detachable",
        0x21 => "IoT Gateway",
        0x22 => "Embedded PC",
        0x23 => "Mini PC",
        0x24 => "Stick PC",
        _ => "Reserved",
    }
}

fn chassis_state_name(value: u64) -> &'static str {
    match value {
        0x01 => "Other",
        0x02 => "Unknown",
        0x03 => "Safe",
        0x04 => "Warning",
        0x05 => "Critical",
        0x06 => "Non-recoverable",
        _ => "Reserved",
    }
}

fn security_status_name(value: u64) -> &'static str {
    match value {
        0x01 => "Other",
        0x02 => "Unknown",
        0x03 => "None",
        0x04 => "External interface locked out",
        0x05 => "External interface enabled",
        _ => "Reserved",
    }
}

fn processor_type_name(value: u64) -> &'static str {
    match value {
        0x01 => "Other",
        0x02 => "Unknown",
        0x03 => "Central Processor",
        0x04 => "Math Processor",
        0x05 => "DSP Processor",
        0x06 => "Video Processor",
        _ => "Reserved",
    }
}

fn cpu_status_name(value: u64) -> &'static str {
    match value {
        0 => "Unknown",
        1 => "Enabled",
        2 => "Disabled by user",
        3 => "Disabled by BIOS (POST error)",
        4 => "Idle",
        7 => "Other",
        _ => "Reserved",
    }
}

fn processor_upgrade_name(value: u64) -> &'static str {
    match value {
        0x01 => "Other",
        0x02 => "Unknown",
        0x03 => "Daughter Board",
        0x04 => "ZIF Socket",
        0x05 => "Replaceable Piggy Back",
        0x06 => "None",
        0x07 => "LIF Socket",
        0x08 => "Slot 1",
        0x09 => "Slot 2",
        0x0A => "370-pin socket",
        0x0B => "Slot A",
        0x0C => "Slot M",
        0x0D => "Socket 423",
        0x0E => "Socket A (Socket 462)",
        0x0F => "Socket 478",
        0x10 => "Socket 754",
        0x11 => "Socket 940",
        0x12 => "Socket 939",
        0x13 => "Socket mPGA604",
        0x14 => "Socket LGA771",
        0x15 => "Socket LGA775",
        0x16 => "Socket S1",
        0x17 => "Socket AM2",
        0x18 => "Socket F (1207)",
        0x19 => "Socket LGA1366",
        0x1A => "Socket G34",
        0x1B => "Socket AM3",
        0x1C => "Socket C32",
        0x1D => "Socket LGA1156",
        0x1E => "Socket LGA1567",
        0x1F => "Socket PGA988A",
        0x20 => "Socket BGA1288",
        0x21 => "Socket rPGA988B",
        0x22 => "Socket BGA1023",
        0x23 => "Socket BGA1224",
        0x24 => "Socket BGA1155",
        0x25 => "Socket LGA1356",
        0x26 => "Socket LGA2011",
        0x27 => "Socket FS1",
        0x28 => "Socket FS2",
        0x29 => "Socket FM1",
        0x2A => "Socket FM2",
        _ => "Reserved",
    }
}

fn connector_type_name(value: u64) -> &'static str {
    match value {
        0x00 => "None",
        0x01 => "Centronics",
        0x02 => "Mini Centronics",
        0x03 => "Proprietary",
        0x04 => "DB-25 pin male",
        0x05 => "DB-25 pin female",
        0x06 => "DB-15 pin male",
        0x07 => "DB-15 pin female",
        0x08 => "DB-9 pin male",
        0x09 => "DB-9 pin female",
        0x0A => "RJ-11",
        0x0B => "RJ-45",
        0x0C => "50-pin MiniSCSI",
        0x0D => "Mini-DIN",
        0x0E => "Micro-DIN",
        0x0F => "PS/2",
        0x10 => "Infrared",
        0x11 => "HP-HIL",
        0x12 => "Access Bus (USB)",
        0x13 => "SSA SCSI",
        0x14 => "Circular DIN-8 male",
        0x15 => "Circular DIN-8 female",
        0x16 => "On Board IDE",
        0x17 => "On Board Floppy",
        0x18 => "9-pin Dual Inline (pin 10 cut)",
        0x19 => "25-pin Dual Inline (pin 26 cut)",
        0x1A => "50-pin Dual Inline",
        0x1B => "68-pin Dual Inline",
        0x1C => "On Board Sound Input from CD-ROM",
        0x1D => "Mini-Centronics Type-14",
        0x1E => "Mini-Centronics Type-26",
        0x1F => "Mini-jack (headphones)",
        0x20 => "BNC",
        0x21 => "1394",
        0x22 => "SAS/SATA Plug Receptacle",
        0xA0 => "PC-98",
        0xA1 => "PC-98Hireso",
        0xA2 => "PC-H98",
        0xA3 => "PC-98Note",
        0xA4 => "PC-98Full",
        0xFF => "Other",
        _ => "Reserved",
    }
}

fn port_type_name(value: u64) -> &'static str {
    match value {
        0x00 => "None",
        0x01 => "Parallel Port XT/AT Compatible",
        0x02 => "Parallel Port PS/2",
        0x03 => "Parallel Port ECP",
        0x04 => "Parallel Port EPP",
        0x05 => "Parallel Port ECP/EPP",
        0x06 => "Serial Port XT/AT Compatible",
        0x07 => "Serial Port 16450 Compatible",
        0x08 => "Serial Port 16550 Compatible",
        0x09 => "Serial Port 16550A Compatible",
        0x0A => "SCSI Port",
        0x0B => "MIDI Port",
        0x0C => "Joy Stick Port",
        0x0D => "Keyboard Port",
        0x0E => "Mouse Port",
        0x0F => "SSA SCSI",
        0x10 => "USB",
        0x11 => "FireWire (IEEE P1394)",
        0x12 => "PCMCIA Type I",
        0x13 => "PCMCIA Type II",
        0x14 => "PCMCIA Type III",
        0x15 => "Cardbus",
        0x16 => "Access Bus Port",
        0x17 => "SCSI II",
        0x18 => "SCSI Wide",
        0x19 => "PC-98",
        0x1A => "PC-98-Hireso",
        0x1B => "PC-H98",
        0x1C => "Video Port",
        0x1D => "Audio Port",
        0x1E => "Modem Port",
        0x1F => "Network Port",
        0x20 => "SATA",
        0x21 => "SAS",
        0xA0 => "8251 Compatible",
        0xA1 => "8251 FIFO Compatible",
        0xFF => "Other",
        _ => "Reserved",
    }
}

fn slot_type_name(value: u64) -> &'static str {
    match value {
        0x01 => "Other",
        0x02 => "Unknown",
        0x03 => "ISA",
        0x04 => "MCA",
        0x05 => "EISA",
        0x06 => "PCI",
        0x07 => "PC Card (PCMCIA)",
        0x08 => "VL-VESA",
        0x09 => "Proprietary",
        0x0A => "Processor Card Slot",
        0x0B => "Proprietary Memory Card Slot",
        0x0C => "I/O Riser Card Slot",
        0x0D => "NuBus",
        0x0E => "PCI 66MHz Capable",
        0x0F => "AGP",
        0x10 => "AGP 2X",
        0x11 => "AGP 4X",
        0x12 => "PCI-X",
        0x13 => "AGP 8X",
        0xA0 => "PC-98/C20",
        0xA1 => "PC-98/C24",
        0xA2 => "PC-98/E",
        0xA3 => "PC-98/Local Bus",
        0xA4 => "PC-98/Card",
        0xA5 => "PCI Express",
        0xA6 => "PCI Express x1",
        0xA7 => "PCI Express x2",
        0xA8 => "PCI Express x4",
        0xA9 => "PCI Express x8",
        0xAA => "PCI Express x16",
        0xAB => "PCI Express Gen 2",
        0xAC => "PCI Express Gen 2 x1",
        0xAD => "PCI Express Gen 2 x2",
        0xAE => "PCI Express Gen 2 x4",
        0xAF => "PCI Express Gen 2 x8",
        0xB0 => "PCI Express Gen 2 x16",
        0xB1 => "PCI Express Gen 3",
        0xB2 => "PCI Express Gen 3 x1",
        0xB3 => "PCI Express Gen 3 x2",
        0xB4 => "PCI Express Gen 3 x4",
        0xB5 => "PCI Express Gen 3 x8",
        0xB6 => "PCI Express Gen 3 x16",
        _ => "Reserved",
    }
}

fn bus_width_name(value: u64) -> &'static str {
    match value {
        0x01 => "Other",
        0x02 => "Unknown",
        0x03 => "8 bit",
        0x04 => "16 bit",
        0x05 => "32 bit",
        0x06 => "64 bit",
        0x07 => "128 bit",
        0x08 => "1x or x1",
        0x09 => "2x or x2",
        0x0A => "4x or x4",
        0x0B => "8x or x8",
        0x0C => "12x or x12",
        0x0D => "16x or x16",
        0x0E => "32x or x32",
        _ => "Reserved",
    }
}

fn slot_usage_name(value: u64) -> &'static str {
    match value {
        0x01 => "Other",
        0x02 => "Unknown",
        0x03 => "Available",
        0x04 => "In use",
        0x05 => "Unavailable",
        _ => "Reserved",
    }
}

fn slot_length_name(value: u64) -> &'static str {
    match value {
        0x01 => "Other",
        0x02 => "Unknown",
        0x03 => "Short Length",
        0x04 => "Long Length",
        _ => "Reserved",
    }
}

// =============================================================================
// DECODERS
// =============================================================================

/// Type 0
fn bios(c: &mut ByteCursor<'_>, _: &Discriminant, ctx: &SmbiosContext) -> DecodeResult<FieldRecord> {
    let mut s = Structure::begin(c, "BIOSInformation")?;
    s.string("vendor")?;
    s.string("version")?;
    s.read::<u16>("starting_address_segment")?;
    s.string("release_date")?;
    s.read::<u8>("rom_size")?;
    s.read::<u64>("characteristics")?;

    // Before 2.4 the extension bytes fill the rest of the formatted area
    let modern = ctx.at_least(2, 4);
    let extension_bytes = if modern { 2 } else { s.length().saturating_sub(0x12) };
    let extensions = s.formatted.read_n::<u8>(extension_bytes.min(s.formatted.remaining()))?;
    s.record.add("characteristics_extensions", Value::ints(extensions));

    s.read_if::<u8>(modern && s.has(0x14), "major_release")?;
    s.read_if::<u8>(modern && s.has(0x15), "minor_release")?;
    s.read_if::<u8>(modern && s.has(0x16), "ec_major_release")?;
    s.read_if::<u8>(modern && s.has(0x17), "ec_minor_release")?;
    s.read_if::<u16>(ctx.at_least(3, 1) && s.has(0x19), "extended_rom_size")?;
    Ok(s.end())
}

/// Type 1
fn system(c: &mut ByteCursor<'_>, _: &Discriminant, ctx: &SmbiosContext) -> DecodeResult<FieldRecord> {
    let mut s = Structure::begin(c, "SystemInformation")?;
    s.string("manufacturer")?;
    s.string("product_name")?;
    s.string("version")?;
    s.string("serial_number")?;

    if s.has(0x8) {
        let raw: [u8; 16] = s.formatted.read()?;
        // 2.6 and later store the first three fields little-endian
        let uuid = if ctx.at_least(2, 6) {
            Uuid::from_bytes_le(raw)
        } else {
            Uuid::from_bytes(raw)
        };
        s.record.add("uuid", uuid);
        s.read_named::<u8>("wakeup_type", wakeup_type_name)?;
    } else {
        s.record.add("uuid", Value::Absent).add("wakeup_type", Value::Absent);
    }

    let tail = s.has(0x19);
    s.string_if(tail, "sku_number")?;
    s.string_if(tail, "family")?;
    Ok(s.end())
}

/// Type 2
fn baseboard(c: &mut ByteCursor<'_>, _: &Discriminant, _: &SmbiosContext) -> DecodeResult<FieldRecord> {
    let mut s = Structure::begin(c, "BaseboardInformation")?;
    s.string("manufacturer")?;
    s.string("product")?;
    s.string("version")?;
    s.string("serial_number")?;
    s.string_if(s.has(0x8), "asset_tag")?;

    if let Some(flags) = s.read_if::<u8>(s.has(0x9), "feature_flags")? {
        let flags = u64::from(flags);
        s.record
            .add_flag("hosting_board", "feature_flags", flags, 0)
            .add_flag("requires_daughter_card", "feature_flags", flags, 1)
            .add_flag("removable", "feature_flags", flags, 2)
            .add_flag("replaceable", "feature_flags", flags, 3)
            .add_flag("hot_swappable", "feature_flags", flags, 4);
    }

    s.string_if(s.has(0xA), "location")?;
    s.read_if::<u16>(s.has(0xB), "chassis_handle")?;
    if s.has(0xD) {
        s.read_named::<u8>("board_type", board_type_name)?;
    } else {
        s.record.add("board_type", Value::Absent);
    }

    match s.read_if::<u8>(s.has(0xE), "handle_count")? {
        Some(count) => {
            let handles = s.formatted.read_n::<u16>(count.into())?;
            s.record.add("contained_object_handles", Value::ints(handles));
        }
        None => {
            s.record.add("contained_object_handles", Value::Absent);
        }
    }
    Ok(s.end())
}

fn contained_element(c: &mut ByteCursor<'_>) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("ContainedElement");
    let raw = u64::from(record.read::<u8>(c, "contained_element_type")?);
    let select = bits::extract(raw, 7, 7);
    // Bit 7 selects between baseboard types and structure types
    record
        .add_bits("type_select", "contained_element_type", raw, 7, 7)
        .add_bits("type", "contained_element_type", raw, 6, 0);
    if select == 0 {
        record.add_named("smbios_board_type", bits::extract(raw, 6, 0), board_type_name);
    } else {
        record.add("smbios_structure_type", bits::extract(raw, 6, 0));
    }
    record.read::<u8>(c, "minimum")?;
    record.read::<u8>(c, "maximum")?;
    record.finish(c);
    Ok(record)
}

/// Type 3
fn enclosure(c: &mut ByteCursor<'_>, _: &Discriminant, _: &SmbiosContext) -> DecodeResult<FieldRecord> {
    let mut s = Structure::begin(c, "SystemEnclosure")?;
    s.string("manufacturer")?;
    let raw = u64::from(s.read::<u8>("enumerated_type")?);
    s.record
        .add_flag("chassis_lock_present", "enumerated_type", raw, 7)
        .add_hinted(
            "system_enclosure_type",
            bits::extract(raw, 6, 0),
            Hint::Named(enclosure_type_name),
        );
    s.string("version")?;
    s.string("serial_number")?;
    s.string("asset_tag")?;

    if s.has(0x9) {
        s.read_named::<u8>("bootup_state", chassis_state_name)?;
        s.read_named::<u8>("power_supply_state", chassis_state_name)?;
        s.read_named::<u8>("thermal_state", chassis_state_name)?;
        s.read_named::<u8>("security_status", security_status_name)?;
    } else {
        for name in ["bootup_state", "power_supply_state", "thermal_state", "security_status"] {
            s.record.add(name, Value::Absent);
        }
    }
    s.read_if::<u32>(s.has(0xD), "oem_defined")?;

    let elements = s.has(0x11);
    s.read_if::<u8>(elements, "height")?;
    s.read_if::<u8>(elements, "num_power_cords")?;
    let count = s.read_if::<u8>(elements, "contained_element_count")?.unwrap_or(0);
    let size = s.read_if::<u8>(elements, "contained_element_length")?.unwrap_or(0);

    if count > 0 {
        let mut contained = Vec::with_capacity(count.into());
        for _ in 0..count {
            let mut element = s.formatted.take(size.into())?;
            contained.push(contained_element(&mut element)?);
        }
        s.record.add("contained_elements", contained);
    }

    let elements_end = 0x15 + usize::from(count) * usize::from(size);
    s.string_if(s.has(elements_end), "sku_number")?;
    Ok(s.end())
}

/// Type 4
fn processor(c: &mut ByteCursor<'_>, _: &Discriminant, _: &SmbiosContext) -> DecodeResult<FieldRecord> {
    let mut s = Structure::begin(c, "ProcessorInformation")?;
    s.string("socket_designation")?;
    s.read_named::<u8>("processor_type", processor_type_name)?;
    s.read::<u8>("processor_family")?;
    s.string("processor_manufacturer")?;
    s.read::<u64>("processor_id")?;
    s.string("processor_version")?;
    s.read::<u8>("voltage")?;
    s.read::<u16>("external_clock")?;
    s.read::<u16>("max_speed")?;
    s.read::<u16>("current_speed")?;
    let status = u64::from(s.read::<u8>("status")?);
    s.record
        .add_flag("socket_populated", "status", status, 6)
        .add_hinted(
            "cpu_status",
            bits::extract(status, 2, 0),
            Hint::Named(cpu_status_name),
        );
    s.read_named::<u8>("processor_upgrade", processor_upgrade_name)?;

    // Each field is gated on its last byte
    s.read_if::<u16>(s.has(0x1B), "l1_cache_handle")?;
    s.read_if::<u16>(s.has(0x1D), "l2_cache_handle")?;
    s.read_if::<u16>(s.has(0x1F), "l3_cache_handle")?;
    s.string_if(s.has(0x20), "serial_number")?;
    s.string_if(s.has(0x21), "asset_tag")?;
    s.string_if(s.has(0x22), "part_number")?;
    s.read_if::<u8>(s.has(0x23), "core_count")?;
    s.read_if::<u8>(s.has(0x24), "core_enabled")?;
    s.read_if::<u8>(s.has(0x25), "thread_count")?;
    s.read_if::<u16>(s.has(0x27), "processor_characteristics")?;
    s.read_if::<u16>(s.has(0x29), "processor_family_2")?;
    Ok(s.end())
}

/// Type 8
fn port_connector(c: &mut ByteCursor<'_>, _: &Discriminant, _: &SmbiosContext) -> DecodeResult<FieldRecord> {
    let mut s = Structure::begin(c, "PortConnectorInfo")?;
    s.string("internal_reference_designator")?;
    s.read_named::<u8>("internal_connector_type", connector_type_name)?;
    s.string("external_reference_designator")?;
    s.read_named::<u8>("external_connector_type", connector_type_name)?;
    s.read_named::<u8>("port_type", port_type_name)?;
    Ok(s.end())
}

/// Type 9
fn system_slots(c: &mut ByteCursor<'_>, _: &Discriminant, _: &SmbiosContext) -> DecodeResult<FieldRecord> {
    let mut s = Structure::begin(c, "SystemSlots")?;
    s.string("designation")?;
    s.read_named::<u8>("slot_type", slot_type_name)?;
    s.read_named::<u8>("slot_data_bus_width", bus_width_name)?;
    s.read_named::<u8>("current_usage", slot_usage_name)?;
    s.read_named::<u8>("slot_length", slot_length_name)?;
    s.read::<u16>("slot_id")?;

    let c1 = u64::from(s.read::<u8>("characteristics1")?);
    s.record
        .add_flag("characteristics_unknown", "characteristics1", c1, 0)
        .add_flag("provides_5_0_volts", "characteristics1", c1, 1)
        .add_flag("provides_3_3_volts", "characteristics1", c1, 2)
        .add_flag("shared_slot", "characteristics1", c1, 3)
        .add_flag("supports_pc_card_16", "characteristics1", c1, 4)
        .add_flag("supports_cardbus", "characteristics1", c1, 5)
        .add_flag("supports_zoom_video", "characteristics1", c1, 6)
        .add_flag("supports_modem_ring_resume", "characteristics1", c1, 7);

    if let Some(c2) = s.read_if::<u8>(s.has(0xC), "characteristics2")? {
        let c2 = u64::from(c2);
        s.record
            .add_flag("supports_pme", "characteristics2", c2, 0)
            .add_flag("supports_hot_plug", "characteristics2", c2, 1)
            .add_flag("supports_smbus", "characteristics2", c2, 2);
    }

    let address = s.has(0xD);
    s.read_if::<u16>(address, "segment_group_number")?;
    s.read_if::<u8>(address, "bus_number")?;
    if let Some(devfn) = s.read_if::<u8>(address, "device_function_number")? {
        let devfn = u64::from(devfn);
        s.record
            .add_bits("device_number", "device_function_number", devfn, 7, 3)
            .add_bits("function_number", "device_function_number", devfn, 2, 0);
    }
    Ok(s.end())
}

/// Types 126 and 127 carry nothing past the header
fn header_only(c: &mut ByteCursor<'_>, disc: &Discriminant, _: &SmbiosContext) -> DecodeResult<FieldRecord> {
    let kind = if disc.kind == u32::from(INACTIVE) {
        "Inactive"
    } else {
        "EndOfTable"
    };
    Ok(Structure::begin(c, kind)?.end())
}

/// Structure decoders; the catch-all keeps header, raw bytes and strings
pub static STRUCTURES: Registry<SmbiosContext> = Registry::new(
    "SMBIOS",
    structure_header,
    &[
        Candidate {
            name: "BIOSInformation",
            selector: Selector::Kind(0),
            decode: bios,
        },
        Candidate {
            name: "SystemInformation",
            selector: Selector::Kind(1),
            decode: system,
        },
        Candidate {
            name: "BaseboardInformation",
            selector: Selector::Kind(2),
            decode: baseboard,
        },
        Candidate {
            name: "SystemEnclosure",
            selector: Selector::Kind(3),
            decode: enclosure,
        },
        Candidate {
            name: "ProcessorInformation",
            selector: Selector::Kind(4),
            decode: processor,
        },
        Candidate {
            name: "PortConnectorInfo",
            selector: Selector::Kind(8),
            decode: port_connector,
        },
        Candidate {
            name: "SystemSlots",
            selector: Selector::Kind(9),
            decode: system_slots,
        },
        Candidate {
            name: "Inactive",
            selector: Selector::Kind(INACTIVE as u32),
            decode: header_only,
        },
        Candidate {
            name: "EndOfTable",
            selector: Selector::Kind(END_OF_TABLE as u32),
            decode: header_only,
        },
        Candidate {
            name: "Unknown",
            selector: Selector::Any,
            decode: decode_unknown,
        },
    ],
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::SmbiosVersion;
    use alloc::vec;
    use firmtab_core::{dispatch, DecodeConfig, DecodeError, StringRef};

    fn ctx(major: u8, minor: u8) -> SmbiosContext {
        SmbiosContext::new(DecodeConfig::strict(), SmbiosVersion::new(major, minor))
    }

    /// Formatted area `body` (after the handle) plus a string set
    fn structure(kind: u8, body: &[u8], strings: &[&str]) -> Vec<u8> {
        let mut bytes = vec![kind, (4 + body.len()) as u8, 0x00, 0x01];
        bytes.extend_from_slice(body);
        for s in strings {
            bytes.extend_from_slice(s.as_bytes());
            bytes.push(0);
        }
        if strings.is_empty() {
            bytes.push(0);
        }
        bytes.push(0);
        bytes
    }

    fn decode_one(bytes: &[u8], ctx: &SmbiosContext) -> DecodeResult<FieldRecord> {
        let mut cursor = ByteCursor::new(bytes);
        let mut records = dispatch::dispatch(&mut cursor, &STRUCTURES, ctx)?;
        assert!(cursor.at_end());
        assert_eq!(records.len(), 1);
        Ok(records.remove(0))
    }

    #[test]
    fn test_bios_information_v2_4() {
        let mut body = vec![1, 2, 0x00, 0xE0, 3, 0x3F];
        body.extend_from_slice(&0x0B98_0000u64.to_le_bytes());
        body.extend_from_slice(&[0x03, 0x0D, 4, 6, 0xFF, 0xFF]);
        let bytes = structure(0, &body, &["Acme", "1.0.4", "03/14/2024"]);

        let record = decode_one(&bytes, &ctx(2, 8)).unwrap();
        assert_eq!(record.kind(), "BIOSInformation");
        assert_eq!(
            record.get("vendor"),
            Some(&Value::StringRef(StringRef::Text {
                index: 1,
                text: "Acme".into(),
            }))
        );
        assert_eq!(record.get_u64("starting_address_segment"), Some(0xE000));
        assert_eq!(record.get_ints("characteristics_extensions"), Some(&[0x03, 0x0D][..]));
        assert_eq!(record.get_u64("major_release"), Some(4));
        assert_eq!(record.get_u64("ec_minor_release"), Some(0xFF));
        assert!(record.is_absent("extended_rom_size"));
    }

    #[test]
    fn test_bios_information_before_2_4() {
        let mut body = vec![1, 0, 0x00, 0xF0, 0, 0x0F];
        body.extend_from_slice(&0u64.to_le_bytes());
        body.extend_from_slice(&[0x01, 0x02, 0x03]);
        let bytes = structure(0, &body, &["Old"]);

        let record = decode_one(&bytes, &ctx(2, 3)).unwrap();
        assert_eq!(record.get_ints("characteristics_extensions"), Some(&[1, 2, 3][..]));
        assert!(record.is_absent("major_release"));
        assert_eq!(record.get("version"), Some(&Value::StringRef(StringRef::None)));
    }

    #[test]
    fn test_minor_version_compares_numerically() {
        // 2.10 has the 2.4 layout
        let mut body = vec![0, 0, 0, 0, 0, 0];
        body.extend_from_slice(&0u64.to_le_bytes());
        body.extend_from_slice(&[0, 0, 5, 1, 0, 0]);
        let bytes = structure(0, &body, &[]);
        let record = decode_one(&bytes, &ctx(2, 10)).unwrap();
        assert_eq!(record.get_u64("major_release"), Some(5));
    }

    #[test]
    fn test_system_uuid_byte_order() {
        let raw: [u8; 16] = [
            0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF,
        ];
        let mut body = vec![1, 2, 0, 3];
        body.extend_from_slice(&raw);
        body.extend_from_slice(&[6, 0, 0]);
        let bytes = structure(1, &body, &["Acme", "Box", "S/N"]);

        let record = decode_one(&bytes, &ctx(2, 6)).unwrap();
        assert_eq!(
            record.get("uuid"),
            Some(&Value::Uuid(Uuid::from_u128(0x0011_2233_4455_6677_8899_AABB_CCDD_EEFF)))
        );
        assert_eq!(record.get_u64("wakeup_type"), Some(6));
        assert_eq!(record.get("sku_number"), Some(&Value::StringRef(StringRef::None)));
        assert_eq!(
            record.get("serial_number"),
            Some(&Value::StringRef(StringRef::Text {
                index: 3,
                text: "S/N".into(),
            }))
        );

        let record = decode_one(&bytes, &ctx(2, 5)).unwrap();
        assert_eq!(record.get("uuid"), Some(&Value::Uuid(Uuid::from_bytes(raw))));
    }

    #[test]
    fn test_system_short_layout() {
        let bytes = structure(1, &[1, 2, 3, 9], &["A", "B", "C"]);
        let record = decode_one(&bytes, &ctx(2, 0)).unwrap();
        assert!(record.is_absent("uuid"));
        assert!(record.is_absent("family"));
        assert_eq!(
            record.get("version"),
            Some(&Value::StringRef(StringRef::Text {
                index: 3,
                text: "C".into(),
            }))
        );
        assert_eq!(
            record.get("serial_number"),
            Some(&Value::StringRef(StringRef::OutOfRange { index: 9, count: 3 }))
        );
    }

    #[test]
    fn test_baseboard_contained_handles() {
        let mut body = vec![1, 2, 0, 0, 0, 0b0000_1001, 0];
        body.extend_from_slice(&0x0003u16.to_le_bytes());
        body.extend_from_slice(&[0x0A, 2]);
        body.extend_from_slice(&0x0010u16.to_le_bytes());
        body.extend_from_slice(&0x0011u16.to_le_bytes());
        let bytes = structure(2, &body, &["Board Co", "X1"]);

        let record = decode_one(&bytes, &ctx(3, 0)).unwrap();
        assert_eq!(record.get_bool("hosting_board"), Some(true));
        assert_eq!(record.get_bool("replaceable"), Some(true));
        assert_eq!(record.get_bool("removable"), Some(false));
        assert_eq!(record.get_u64("chassis_handle"), Some(3));
        assert_eq!(record.get_u64("board_type"), Some(0x0A));
        assert_eq!(record.get_ints("contained_object_handles"), Some(&[0x10, 0x11][..]));
    }

    #[test]
    fn test_enclosure_contained_elements() {
        let mut body = vec![1, 0x83, 0, 0, 0, 3, 3, 3, 3];
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&[2, 1, 2, 3]);
        body.extend_from_slice(&[0x0A, 1, 1]);
        body.extend_from_slice(&[0x84, 0, 2]);
        body.push(2);
        let bytes = structure(3, &body, &["Chassis Inc", "SKU-1"]);

        let record = decode_one(&bytes, &ctx(2, 7)).unwrap();
        assert_eq!(record.get_bool("chassis_lock_present"), Some(true));
        assert_eq!(record.get_u64("system_enclosure_type"), Some(3));
        let elements = record.get_records("contained_elements").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].get_u64("smbios_board_type"), Some(0x0A));
        assert_eq!(elements[1].get_u64("smbios_structure_type"), Some(4));
        assert_eq!(elements[1].get_u64("maximum"), Some(2));
        assert_eq!(
            record.get("sku_number"),
            Some(&Value::StringRef(StringRef::Text {
                index: 2,
                text: "SKU-1".into(),
            }))
        );
    }

    #[test]
    fn test_processor_gates() {
        let mut body = vec![1, 3, 0xB3, 2];
        body.extend_from_slice(&0x0001_06A5u64.to_le_bytes());
        body.extend_from_slice(&[3, 0x8A]);
        body.extend_from_slice(&100u16.to_le_bytes());
        body.extend_from_slice(&3600u16.to_le_bytes());
        body.extend_from_slice(&2400u16.to_le_bytes());
        body.extend_from_slice(&[0x41, 0x26]);
        let bytes = structure(4, &body, &["CPU0", "Intel", "Xeon"]);

        let record = decode_one(&bytes, &ctx(2, 5)).unwrap();
        assert_eq!(record.get_u64("max_speed"), Some(3600));
        assert_eq!(record.get_bool("socket_populated"), Some(true));
        assert_eq!(record.get_u64("cpu_status"), Some(1));
        assert!(record.is_absent("l1_cache_handle"));
        assert!(record.is_absent("core_count"));
        assert!(!record.contains("data"));
    }

    #[test]
    fn test_processor_field_cut_short_is_absent() {
        let mut body = vec![1, 3, 0xB3, 2];
        body.extend_from_slice(&0x0001_06A5u64.to_le_bytes());
        body.extend_from_slice(&[3, 0x8A]);
        body.extend_from_slice(&[0; 6]);
        body.extend_from_slice(&[0x41, 0x26]);
        body.extend_from_slice(&[0x10, 0x00, 0x11, 0x00, 0x12, 0x00]);
        body.extend_from_slice(&[0, 0, 0]);
        body.extend_from_slice(&[4, 4, 8]);
        body.extend_from_slice(&0x00FCu16.to_le_bytes());
        // First byte of processor_family_2 only
        body.push(0xFE);
        let bytes = structure(4, &body, &["CPU0", "Intel", "Xeon"]);
        assert_eq!(bytes[1], 0x29);

        let record = decode_one(&bytes, &ctx(2, 6)).unwrap();
        assert!(!record.failed());
        assert_eq!(record.get_u64("l3_cache_handle"), Some(0x12));
        assert_eq!(record.get_u64("thread_count"), Some(8));
        assert_eq!(record.get_u64("processor_characteristics"), Some(0xFC));
        assert!(record.is_absent("processor_family_2"));
        assert_eq!(record.get_bytes("data"), Some(&[0xFE][..]));
    }

    #[test]
    fn test_slots_device_function() {
        let mut body = vec![1, 0xA8, 0x0A, 0x04, 0x04];
        body.extend_from_slice(&7u16.to_le_bytes());
        body.extend_from_slice(&[0b0000_0100, 0b0000_0011]);
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&[0x3A, (0x1C << 3) | 2]);
        let bytes = structure(9, &body, &["PCIE1"]);

        let record = decode_one(&bytes, &ctx(2, 6)).unwrap();
        assert_eq!(record.get_bool("provides_3_3_volts"), Some(true));
        assert_eq!(record.get_bool("supports_hot_plug"), Some(true));
        assert_eq!(record.get_u64("bus_number"), Some(0x3A));
        assert_eq!(record.get_u64("device_number"), Some(0x1C));
        assert_eq!(record.get_u64("function_number"), Some(2));
    }

    #[test]
    fn test_truncated_known_structure_falls_back() {
        // Port connector cut after two fields
        let bytes = structure(8, &[1, 0x0B], &["J1"]);
        let best_effort = SmbiosContext::new(DecodeConfig::best_effort(), SmbiosVersion::new(2, 8));
        let record = decode_one(&bytes, &best_effort).unwrap();
        assert_eq!(record.kind(), "Unknown");
        assert!(record.failed());
        assert_eq!(record.get_bytes("data"), Some(&[1, 0x0B][..]));

        assert!(matches!(
            decode_one(&bytes, &ctx(2, 8)),
            Err(DecodeError::BufferUnderrun { .. })
        ));
    }

    #[test]
    fn test_registry_order() {
        assert_eq!(STRUCTURES.select(&Discriminant::new(127, 6)).name, "EndOfTable");
        assert_eq!(STRUCTURES.select(&Discriminant::new(17, 40)).name, "Unknown");
    }
}
