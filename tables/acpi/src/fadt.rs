//! # FADT (`FACP`) and FACS
//!
//! The fixed ACPI description table grew with every ACPI revision. Fields
//! are gated on both the table revision and the bytes actually present:
//! a field the table does not carry is recorded as absent, never read.

use crate::gas::{decode_gas, GAS_LEN};
use crate::TableHeader;
use firmtab_core::{bits, ByteCursor, DecodeConfig, DecodeResult, FieldRecord, Hint, Value};

fn pm_profile_name(value: u64) -> &'static str {
    match value {
        0 => "Unspecified",
        1 => "Desktop",
        2 => "Mobile",
        3 => "Workstation",
        4 => "Enterprise Server",
        5 => "SOHO Server",
        6 => "Appliance PC",
        7 => "Performance Server",
        8 => "Tablet",
        _ => "Reserved",
    }
}

/// Flag bits defined from the first revision on
const FLAGS_V1: &[(&str, u32)] = &[
    ("wbinvd", 0),
    ("wbinvd_flush", 1),
    ("proc_c1", 2),
    ("p_lvl2_up", 3),
    ("pwr_button", 4),
    ("slp_button", 5),
    ("fix_rtc", 6),
    ("rtc_s4", 7),
    ("tmr_val_ext", 8),
];

/// Flag bits added by revision 2
const FLAGS_V2: &[(&str, u32)] = &[
    ("dck_cap", 9),
    ("reset_reg_sup", 10),
    ("sealed_case", 11),
    ("headless", 12),
    ("cpu_sw_slp", 13),
    ("pci_exp_wak", 14),
    ("use_platform_clock", 15),
    ("s4_rtc_sts_valid", 16),
    ("remote_power_on_capable", 17),
    ("force_apic_cluster_model", 18),
    ("force_apic_physical_destination_mode", 19),
];

/// Flag bits added by revision 5
const FLAGS_V5: &[(&str, u32)] = &[("hw_reduced_acpi", 20), ("low_power_s0_idle_capable", 21)];

/// Legacy 32-bit register block addresses, in table order
const BLOCKS: &[&str] = &[
    "pm1a_evt_blk",
    "pm1b_evt_blk",
    "pm1a_cnt_blk",
    "pm1b_cnt_blk",
    "pm2_cnt_blk",
    "pm_tmr_blk",
    "gpe0_blk",
    "gpe1_blk",
];

/// Block lengths and related byte-wide fields, in table order
const BLOCK_LENGTHS: &[&str] = &[
    "pm1_evt_len",
    "pm1_cnt_len",
    "pm2_cnt_len",
    "pm_tmr_len",
    "gpe0_blk_len",
    "gpe1_blk_len",
    "gpe1_base",
    "cst_cnt",
];

/// Extended register blocks added by revision 2
const X_BLOCKS: &[&str] = &[
    "x_pm1a_evt_blk",
    "x_pm1b_evt_blk",
    "x_pm1a_cnt_blk",
    "x_pm1b_cnt_blk",
    "x_pm2_cnt_blk",
    "x_pm_tmr_blk",
    "x_gpe0_blk",
    "x_gpe1_blk",
];

/// Record each flag, or mark all of them absent
fn add_flags(record: &mut FieldRecord, flags: u32, names: &[(&'static str, u32)], present: bool) {
    for &(name, bit) in names {
        if present {
            record.add_flag(name, "flags", flags.into(), bit);
        } else {
            record.add(name, Value::Absent);
        }
    }
}

/// Read a GAS when `present` and the table still holds one
fn gated_gas(cursor: &mut ByteCursor<'_>, present: bool) -> DecodeResult<Option<FieldRecord>> {
    if present && cursor.remaining() >= GAS_LEN {
        decode_gas(cursor).map(Some)
    } else {
        Ok(None)
    }
}

/// Read a scalar when `present` and the table still holds it
fn gated<T: firmtab_core::Scalar>(cursor: &mut ByteCursor<'_>, present: bool) -> DecodeResult<Option<T>> {
    if present && cursor.remaining() >= T::SIZE {
        cursor.read().map(Some)
    } else {
        Ok(None)
    }
}

pub(crate) fn decode_facp(
    cursor: &mut ByteCursor<'_>,
    header: &TableHeader,
    _: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    let revision = header.revision;

    record.read::<u32>(cursor, "firmware_ctrl")?;
    record.read::<u32>(cursor, "dsdt")?;
    cursor.skip(1)?;
    record.read_named::<u8>(cursor, "preferred_pm_profile", pm_profile_name)?;
    record.read::<u16>(cursor, "sci_int")?;
    record.read::<u32>(cursor, "smi_cmd")?;
    record.read::<u8>(cursor, "acpi_enable")?;
    record.read::<u8>(cursor, "acpi_disable")?;
    record.read::<u8>(cursor, "s4bios_req")?;
    record.read::<u8>(cursor, "pstate_cnt")?;
    for &name in BLOCKS {
        record.read::<u32>(cursor, name)?;
    }
    for &name in BLOCK_LENGTHS {
        record.read::<u8>(cursor, name)?;
    }
    record.read_hinted::<u16>(cursor, "p_lvl2_lat", Hint::Unit("us"))?;
    record.read_hinted::<u16>(cursor, "p_lvl3_lat", Hint::Unit("us"))?;
    record.read::<u16>(cursor, "flush_size")?;
    record.read::<u16>(cursor, "flush_stride")?;
    record.read::<u8>(cursor, "duty_offset")?;
    record.read::<u8>(cursor, "duty_width")?;
    record.read::<u8>(cursor, "day_alrm")?;
    record.read::<u8>(cursor, "mon_alrm")?;
    record.read::<u8>(cursor, "century")?;
    let boot_arch = u64::from(record.read::<u16>(cursor, "iapc_boot_arch")?);
    record
        .add_flag("legacy_devices", "iapc_boot_arch", boot_arch, 0)
        .add_flag("8042", "iapc_boot_arch", boot_arch, 1)
        .add_flag("vga_not_present", "iapc_boot_arch", boot_arch, 2)
        .add_flag("msi_not_supported", "iapc_boot_arch", boot_arch, 3)
        .add_flag("pcie_aspm_controls", "iapc_boot_arch", boot_arch, 4)
        .add_flag("cmos_rtc_not_present", "iapc_boot_arch", boot_arch, 5);
    cursor.skip(1)?;
    let flags = record.read::<u32>(cursor, "flags")?;
    add_flags(record, flags, FLAGS_V1, true);
    add_flags(record, flags, FLAGS_V2, revision > 1);
    add_flags(record, flags, FLAGS_V5, revision >= 5);

    // Revision 2 and later
    let v2 = revision >= 2;
    record.add("reset_reg", gated_gas(cursor, v2)?);
    record.add("reset_value", gated::<u8>(cursor, v2)?);
    if v2 && cursor.remaining() >= 3 {
        cursor.skip(3)?;
    }
    record.add("x_firmware_ctrl", gated::<u64>(cursor, v2)?);
    record.add("x_dsdt", gated::<u64>(cursor, v2)?);
    for &name in X_BLOCKS {
        record.add(name, gated_gas(cursor, v2)?);
    }

    // Revision 5 and later
    let v5 = revision >= 5;
    record.add("sleep_control_reg", gated_gas(cursor, v5)?);
    record.add("sleep_status_reg", gated_gas(cursor, v5)?);
    Ok(())
}

/// Decode a Firmware ACPI Control Structure
///
/// The FACS has its own header (no OEM fields, no checksum), so it is
/// decoded standalone. Its layout depends on the version byte at offset 32.
pub fn decode_facs(bytes: &[u8]) -> DecodeResult<FieldRecord> {
    let mut cursor = ByteCursor::new(bytes);
    let version = cursor.peek_at::<u8>(32).unwrap_or(0);

    let mut record = FieldRecord::new("FACS");
    record.read_hinted::<[u8; 4]>(&mut cursor, "signature", Hint::Ascii)?;
    record.read_hinted::<u32>(&mut cursor, "length", Hint::Decimal)?;
    record.read::<u32>(&mut cursor, "hardware_signature")?;
    record.read::<u32>(&mut cursor, "firmware_waking_vector")?;
    let lock = u64::from(record.read::<u32>(&mut cursor, "global_lock")?);
    record
        .add_flag("pending", "global_lock", lock, 0)
        .add_flag("owned", "global_lock", lock, 1);
    let flags = u64::from(record.read::<u32>(&mut cursor, "flags")?);
    record.add_flag("s4bios_f", "flags", flags, 0);
    if version >= 2 {
        record.add_flag("64bit_wake_supported_f", "flags", flags, 1);
    } else {
        record.add("64bit_wake_supported_f", Value::Absent);
    }

    if version >= 1 {
        record.read::<u64>(&mut cursor, "x_firmware_waking_vector")?;
        record.read_hinted::<u8>(&mut cursor, "version", Hint::Decimal)?;
    } else {
        record.add("x_firmware_waking_vector", Value::Absent);
        record.add("version", Value::Absent);
    }

    if version >= 2 {
        cursor.skip(3)?;
        let ospm = u64::from(record.read::<u32>(&mut cursor, "ospm_flags")?);
        record.add_hinted("64bit_wake_f", bits::flag(ospm, 0), Hint::Bits {
            source: "ospm_flags",
            hi: 0,
            lo: 0,
        });
    } else {
        record.add("ospm_flags", Value::Absent);
        record.add("64bit_wake_f", Value::Absent);
    }

    record.add_hinted("reserved", cursor.rest(), Hint::Dump);
    Ok(record)
}
