//! End-to-end decoding of synthetic tables.

use crate::*;
use alloc::vec;
use alloc::vec::Vec;
use firmtab_core::{checksum, DecodeConfig, DecodeError, DecodeStatus, FieldRecord, Value};
use firmtab_hal::{MemoryImage, PhysAddr};

/// Build a table with a valid checksum
fn sdt(signature: &[u8; 4], revision: u8, body: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; TableHeader::LEN];
    bytes[0..4].copy_from_slice(signature);
    bytes[4..8].copy_from_slice(&((TableHeader::LEN + body.len()) as u32).to_le_bytes());
    bytes[8] = revision;
    bytes[10..16].copy_from_slice(b"FIRMTB");
    bytes[16..24].copy_from_slice(b"SYNTHETC");
    bytes[28..32].copy_from_slice(b"TEST");
    bytes.extend_from_slice(body);
    checksum::fixup(&mut bytes, TableHeader::CHECKSUM_OFFSET);
    bytes
}

fn decode(signature: &[u8; 4], revision: u8, body: &[u8]) -> DecodedTable {
    decode_table(*signature, &sdt(signature, revision, body), &DecodeConfig::best_effort()).unwrap()
}

fn kinds(records: &[FieldRecord]) -> Vec<&'static str> {
    records.iter().map(FieldRecord::kind).collect()
}

// =============================================================================
// FADT
// =============================================================================

/// Revision 1 layout: 80 body bytes
fn facp_v1_body() -> Vec<u8> {
    let mut body = vec![0u8; 80];
    body[0..4].copy_from_slice(&0xBFFE_0000u32.to_le_bytes());
    body[4..8].copy_from_slice(&0xBFFD_0000u32.to_le_bytes());
    body[9] = 2;
    body[10..12].copy_from_slice(&9u16.to_le_bytes());
    // flags: wbinvd, dck_cap, hw_reduced_acpi
    body[76..80].copy_from_slice(&((1u32 << 0) | (1 << 9) | (1 << 20)).to_le_bytes());
    body
}

/// Revision 2 layout: 208 body bytes
fn facp_v2_body() -> Vec<u8> {
    let mut body = facp_v1_body();
    // reset_reg: system IO 0xCF9
    body.extend_from_slice(&[0x01, 8, 0, 1]);
    body.extend_from_slice(&0xCF9u64.to_le_bytes());
    body.push(0x06);
    body.extend_from_slice(&[0; 3]);
    body.extend_from_slice(&0u64.to_le_bytes());
    body.extend_from_slice(&0x1_BFFD_0000u64.to_le_bytes());
    body.extend_from_slice(&[0; 12 * 8]);
    body
}

#[test]
fn test_facp_revision_one_gates_extended_fields() {
    let table = decode(b"FACP", 1, &facp_v1_body());
    assert!(table.is_clean());
    let facp = &table.record;
    assert_eq!(facp.kind(), "FADT");
    assert_eq!(facp.get_u64("dsdt"), Some(0xBFFD_0000));
    assert_eq!(facp.get_u64("preferred_pm_profile"), Some(2));
    assert_eq!(facp.get_bool("wbinvd"), Some(true));
    for name in ["dck_cap", "hw_reduced_acpi", "reset_reg", "reset_value", "x_dsdt", "x_gpe1_blk"] {
        assert!(facp.is_absent(name), "{} should be absent", name);
    }
    assert!(!facp.contains("data"));
}

#[test]
fn test_facp_revision_three_reads_extended_fields() {
    let v1 = decode(b"FACP", 1, &facp_v1_body());
    let v3 = decode(b"FACP", 3, &facp_v2_body());
    assert!(v3.is_clean());
    let facp = &v3.record;

    // Shared prefix is identical
    for name in ["firmware_ctrl", "dsdt", "sci_int", "pm1a_evt_blk", "wbinvd"] {
        assert_eq!(facp.get(name), v1.record.get(name));
    }
    assert_eq!(facp.get_bool("dck_cap"), Some(true));
    assert!(facp.is_absent("hw_reduced_acpi"));
    assert_eq!(facp.get_record("reset_reg").and_then(|g| g.get_u64("address")), Some(0xCF9));
    assert_eq!(facp.get_u64("reset_value"), Some(6));
    assert_eq!(facp.get_u64("x_dsdt"), Some(0x1_BFFD_0000));
    assert!(facp.get_record("x_gpe1_blk").is_some());
    assert!(facp.is_absent("sleep_control_reg"));
}

#[test]
fn test_facp_revision_gate_needs_bytes() {
    // Claims revision 3 but only carries the revision 1 layout
    let table = decode(b"FACP", 3, &facp_v1_body());
    assert!(table.is_clean());
    assert_eq!(table.record.get_bool("dck_cap"), Some(true));
    assert!(table.record.is_absent("reset_reg"));
    assert!(table.record.is_absent("x_dsdt"));
}

// =============================================================================
// MADT
// =============================================================================

fn madt_body(subtables: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0xFEE0_0000u32.to_le_bytes());
    body.extend_from_slice(&1u32.to_le_bytes());
    for subtable in subtables {
        body.extend_from_slice(subtable);
    }
    body
}

#[test]
fn test_madt_subtables_and_processor_maps() {
    let body = madt_body(&[
        &[0, 8, 0, 0, 1, 0, 0, 0],
        &[0, 8, 1, 2, 0, 0, 0, 0],
        &[1, 12, 4, 0, 0x00, 0x00, 0xC0, 0xFE, 0, 0, 0, 0],
        &[2, 10, 0, 0, 2, 0, 0, 0, 0x0D, 0x00],
        &[9, 16, 0, 0, 0x10, 0, 0, 0, 1, 0, 0, 0, 7, 0, 0, 0],
        &[0x7F, 4, 0xAA, 0xBB],
    ]);
    let table = decode(b"APIC", 3, &body);
    assert!(table.is_clean());
    let madt = &table.record;
    assert_eq!(madt.get_u64("local_apic_address"), Some(0xFEE0_0000));
    assert_eq!(madt.get_bool("pcat_compat"), Some(true));

    let subtables = madt.get_records("interrupt_controller_structures").unwrap();
    assert_eq!(
        kinds(subtables),
        vec!["LocalApic", "LocalApic", "IOApic", "InterruptSourceOverride", "x2Apic", "Unknown"]
    );
    assert_eq!(subtables[2].get_u64("io_apic_addr"), Some(0xFEC0_0000));
    assert_eq!(subtables[3].get_u64("polarity"), Some(0b01));
    assert_eq!(subtables[3].get_u64("trigger_mode"), Some(0b11));
    assert_eq!(subtables[5].get_bytes("data"), Some(&[0xAA, 0xBB][..]));

    // Only enabled processors are mapped
    let procs = madt.get_records("procid_apicid").unwrap();
    assert_eq!(procs.len(), 1);
    assert_eq!(procs[0].get_u64("apic_id"), Some(0));
    let x2 = madt.get_records("uid_x2apicid").unwrap();
    assert_eq!(x2[0].get_u64("uid"), Some(7));
    assert_eq!(x2[0].get_u64("x2apicid"), Some(0x10));
}

#[test]
fn test_madt_short_record_falls_back() {
    // Local APIC claiming only 4 bytes
    let body = madt_body(&[&[0, 4, 0, 0], &[0, 8, 1, 1, 1, 0, 0, 0]]);
    let table = decode(b"APIC", 3, &body);
    assert_eq!(table.status, DecodeStatus::RECORD_FALLBACK);

    let subtables = table.record.get_records("interrupt_controller_structures").unwrap();
    assert_eq!(kinds(subtables), vec!["Unknown", "LocalApic"]);
    assert!(subtables[0].failed());
    assert_eq!(subtables[0].get_bytes("data"), Some(&[0, 0][..]));

    let strict = decode_table(*b"APIC", &sdt(b"APIC", 3, &body), &DecodeConfig::strict());
    assert!(matches!(strict, Err(DecodeError::BufferUnderrun { .. })));
}

#[test]
fn test_madt_record_shorter_than_header_keeps_siblings() {
    let body = madt_body(&[&[0x7F, 1], &[0, 8, 1, 1, 1, 0, 0, 0]]);
    let table = decode(b"APIC", 3, &body);
    assert_eq!(table.status, DecodeStatus::RECORD_FALLBACK);
    assert!(table.errors.is_empty());

    let subtables = table.record.get_records("interrupt_controller_structures").unwrap();
    assert_eq!(kinds(subtables), vec!["Unknown", "LocalApic"]);
    assert!(subtables[0].failed());
    assert_eq!(subtables[0].get_bytes("data"), Some(&[0x7F][..]));
    assert_eq!(table.record.get_records("procid_apicid").map(<[FieldRecord]>::len), Some(1));
}

#[test]
fn test_madt_zero_length_keeps_partial_body() {
    let body = madt_body(&[&[0, 8, 0, 0, 1, 0, 0, 0], &[1, 0, 0, 0]]);
    let table = decode(b"APIC", 3, &body);
    assert_eq!(table.status, DecodeStatus::BODY_INCOMPLETE);
    assert_eq!(
        table.errors,
        vec![DecodeError::MalformedLength {
            offset: 52,
            length: 0,
            available: 4,
        }]
    );
    let subtables = table.record.get_records("interrupt_controller_structures").unwrap();
    assert_eq!(subtables.len(), 1);
    assert_eq!(table.record.get_records("procid_apicid").map(<[FieldRecord]>::len), Some(1));
}

// =============================================================================
// DMAR
// =============================================================================

#[test]
fn test_dmar_nested_scopes() {
    let mut body = vec![38, 1];
    body.extend_from_slice(&[0; 10]);
    // DRHD with one endpoint scope
    body.extend_from_slice(&[0, 0, 24, 0, 1, 0, 0, 0]);
    body.extend_from_slice(&0xFED9_0000u64.to_le_bytes());
    body.extend_from_slice(&[1, 8, 0, 0, 0, 0, 2, 0]);
    // RMRR with a scope crossing a bridge
    body.extend_from_slice(&[1, 0, 34, 0, 0, 0, 0, 0]);
    body.extend_from_slice(&0x7A00_0000u64.to_le_bytes());
    body.extend_from_slice(&0x7A1F_FFFFu64.to_le_bytes());
    body.extend_from_slice(&[1, 10, 0, 0, 0, 0, 0x1C, 0, 0, 0]);

    let table = decode(b"DMAR", 1, &body);
    assert!(table.is_clean());
    assert_eq!(table.record.get_u64("host_address_width"), Some(38));
    assert_eq!(table.record.get_bool("intr_remap"), Some(true));

    let units = table.record.get_records("remapping_structures").unwrap();
    assert_eq!(kinds(units), vec!["DRHD", "RMRR"]);
    assert_eq!(units[0].get_bool("include_pci_all"), Some(true));

    let scopes = units[0].get_records("device_scopes").unwrap();
    assert_eq!(scopes[0].get_u64("type"), Some(1));
    let paths = scopes[0].get_records("paths").unwrap();
    assert_eq!(paths[0].get_u64("pci_device"), Some(2));

    let paths = units[1].get_records("device_scopes").unwrap()[0].get_records("paths").unwrap();
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0].get_u64("pci_device"), Some(0x1C));
    assert_eq!(units[1].get_u64("limit_address"), Some(0x7A1F_FFFF));
}

// =============================================================================
// PMTT
// =============================================================================

fn pmtt_common(kind: u8, length: u16, flags: u16) -> Vec<u8> {
    let mut bytes = vec![kind, 0];
    bytes.extend_from_slice(&length.to_le_bytes());
    bytes.extend_from_slice(&flags.to_le_bytes());
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

#[test]
fn test_pmtt_three_levels() {
    let mut dimm = pmtt_common(2, 20, 0b10);
    dimm.extend_from_slice(&[5, 0, 0, 0]);
    dimm.extend_from_slice(&8192u32.to_le_bytes());
    dimm.extend_from_slice(&0x0011u32.to_le_bytes());

    let mut controller = pmtt_common(1, 56, 0b10);
    controller.extend_from_slice(&[0; 16]);
    controller.extend_from_slice(&[64, 0, 64, 0, 0, 0]);
    controller.extend_from_slice(&1u16.to_le_bytes());
    controller.extend_from_slice(&3u32.to_le_bytes());
    controller.extend_from_slice(&dimm);

    let mut socket = pmtt_common(0, 68, 0b11);
    socket.extend_from_slice(&[1, 0, 0, 0]);
    socket.extend_from_slice(&controller);

    let mut body = vec![0u8; 4];
    body.extend_from_slice(&socket);
    let table = decode(b"PMTT", 1, &body);
    assert!(table.is_clean());

    let sockets = table.record.get_records("subtables").unwrap();
    assert_eq!(kinds(sockets), vec!["Socket"]);
    let common = sockets[0].get_record("subtable_common").unwrap();
    assert_eq!(common.get_bool("top_level_aggregator_device"), Some(true));

    let controllers = sockets[0].get_records("resources").unwrap();
    assert_eq!(kinds(controllers), vec!["MemoryController"]);
    assert_eq!(controllers[0].get_ints("domains"), Some(&[3][..]));

    let dimms = controllers[0].get_records("subtables").unwrap();
    assert_eq!(dimms[0].get_u64("dimm_size"), Some(8192));
    assert_eq!(dimms[0].get_u64("physical_component_id"), Some(5));
}

// =============================================================================
// OTHER TABLES
// =============================================================================

#[test]
fn test_slit_matrix() {
    let mut body = 2u64.to_le_bytes().to_vec();
    body.extend_from_slice(&[10, 21, 21, 10]);
    let table = decode(b"SLIT", 1, &body);
    let rows = table.record.get_records("relative_distances").unwrap();
    assert_eq!(rows[1].get_ints("distances"), Some(&[21, 10][..]));
}

#[test]
fn test_mcfg_allocations() {
    let mut body = vec![0u8; 8];
    body.extend_from_slice(&0xE000_0000u64.to_le_bytes());
    body.extend_from_slice(&[0, 0, 0, 0xFF, 0, 0, 0, 0]);
    let table = decode(b"MCFG", 1, &body);
    let resources = table.record.get_records("resources").unwrap();
    assert_eq!(resources[0].get_u64("address"), Some(0xE000_0000));
    assert_eq!(resources[0].get_u64("end_bus"), Some(0xFF));
}

#[test]
fn test_srat_memory_affinity() {
    let mut body = vec![0u8; 12];
    let mut memory = vec![1, 40];
    memory.extend_from_slice(&1u32.to_le_bytes());
    memory.extend_from_slice(&[0, 0]);
    memory.extend_from_slice(&0u32.to_le_bytes());
    memory.extend_from_slice(&1u32.to_le_bytes());
    memory.extend_from_slice(&0x8000_0000u32.to_le_bytes());
    memory.extend_from_slice(&0u32.to_le_bytes());
    memory.extend_from_slice(&[0; 4]);
    memory.extend_from_slice(&0b011u32.to_le_bytes());
    memory.extend_from_slice(&[0; 8]);
    body.extend_from_slice(&memory);

    let table = decode(b"SRAT", 3, &body);
    let subtables = table.record.get_records("subtables").unwrap();
    assert_eq!(subtables[0].kind(), "MemoryAffinity");
    assert_eq!(subtables[0].get_u64("base_address"), Some(0x1_0000_0000));
    assert_eq!(subtables[0].get_u64("range_length"), Some(0x8000_0000));
    assert_eq!(subtables[0].get_bool("hot_pluggable"), Some(true));
    assert_eq!(subtables[0].get_bool("nonvolatile"), Some(false));
}

// =============================================================================
// CHECKSUMS AND HEADERS
// =============================================================================

#[test]
fn test_checksum_mismatch_is_reported() {
    let mut bytes = sdt(b"RSDT", 1, &0x1000u32.to_le_bytes());
    bytes[TableHeader::CHECKSUM_OFFSET] ^= 0x01;

    let table = decode_table(*b"RSDT", &bytes, &DecodeConfig::best_effort()).unwrap();
    assert_eq!(table.status, DecodeStatus::CHECKSUM_MISMATCH);
    assert_ne!(table.checksum, 0);
    assert_eq!(table.record.get_ints("tables"), Some(&[0x1000][..]));

    assert!(matches!(
        decode_table(*b"RSDT", &bytes, &DecodeConfig::strict()),
        Err(DecodeError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_repack_matches_every_table() {
    for (signature, body) in [(b"FACP", facp_v2_body()), (b"APIC", madt_body(&[])), (b"SSDT", vec![0xAB; 5])] {
        let bytes = sdt(signature, 2, &body);
        let table = decode_table(*signature, &bytes, &DecodeConfig::strict()).unwrap();
        assert_eq!(repack_header(&table.header)[..], bytes[..TableHeader::LEN]);
        let header = table.record.get_record("header").unwrap();
        assert_eq!(header.get_bytes("oemtableid"), Some(&b"SYNTHETC"[..]));
    }
}

// =============================================================================
// RSDP
// =============================================================================

fn rsdp(revision: u8) -> Vec<u8> {
    let mut bytes = vec![0u8; if revision >= 2 { 36 } else { 20 }];
    bytes[0..8].copy_from_slice(b"RSD PTR ");
    bytes[9..15].copy_from_slice(b"FIRMTB");
    bytes[15] = revision;
    bytes[16..20].copy_from_slice(&0xBFF6_0000u32.to_le_bytes());
    checksum::fixup(&mut bytes[..20], 8);
    if revision >= 2 {
        bytes[20..24].copy_from_slice(&36u32.to_le_bytes());
        bytes[24..32].copy_from_slice(&0xBFF7_0000u64.to_le_bytes());
        checksum::fixup(&mut bytes, 32);
    }
    bytes
}

#[test]
fn test_decode_rsdp_revisions() {
    let v1 = decode_rsdp(&rsdp(0)).unwrap();
    assert_eq!(v1.get_bool("checksum_valid"), Some(true));
    assert!(v1.is_absent("xsdt_address"));

    let v2 = decode_rsdp(&rsdp(2)).unwrap();
    assert_eq!(v2.get_u64("xsdt_address"), Some(0xBFF7_0000));
    assert_eq!(v2.get_bool("extended_checksum_valid"), Some(true));
}

#[test]
fn test_locate_rsdp_in_bios_area() {
    let mut memory = MemoryImage::new()
        .with_zeroed(PhysAddr::new(0x400), 0x100)
        .with_zeroed(PhysAddr::new(0xE0000), 0x20000);
    memory.write(PhysAddr::new(0xF0010), &rsdp(0)).unwrap();
    // Corrupted copy earlier in the range
    let mut bad = rsdp(0);
    bad[8] ^= 0xFF;
    memory.write(PhysAddr::new(0xE0100), &bad).unwrap();

    let found = locate_rsdp(&memory).unwrap().unwrap();
    assert_eq!(found.address, PhysAddr::new(0xF0010));
    assert_eq!(found.size, 20);
}

#[test]
fn test_locate_rsdp_prefers_ebda() {
    let mut memory = MemoryImage::new()
        .with_zeroed(PhysAddr::new(0x400), 0x100)
        .with_zeroed(PhysAddr::new(0x9FC00), 0x400)
        .with_zeroed(PhysAddr::new(0xE0000), 0x20000);
    memory.write(PhysAddr::new(0x40E), &0x9FC0u16.to_le_bytes()).unwrap();
    memory.write(PhysAddr::new(0x9FC20), &rsdp(2)).unwrap();
    memory.write(PhysAddr::new(0xF0010), &rsdp(0)).unwrap();

    let found = locate_rsdp(&memory).unwrap().unwrap();
    assert_eq!(found.address, PhysAddr::new(0x9FC20));
    assert_eq!(found.size, 36);
    let record = decode_rsdp(&found.bytes).unwrap();
    assert_eq!(record.get_u64("revision"), Some(2));
    assert!(!record.is_absent("xsdt_address"));
}

#[test]
fn test_locate_rsdp_without_bios_memory() {
    assert_eq!(locate_rsdp(&MemoryImage::new()), Ok(None));
}

#[test]
fn test_catalog_decodes_rsdp_by_signature() {
    let mut set = firmtab_hal::TableSet::new();
    set.push_hidden(*b"RSDP", rsdp(2));
    let catalog = TableCatalog::build(&set);
    assert_eq!(catalog.signatures(), &[*b"RSDP"]);
    let entries = catalog.decode_all(&set, &DecodeConfig::strict()).unwrap();
    assert!(matches!(&entries[0], CatalogEntry::Rsdp(r) if r.get("length") == Some(&Value::U32(36))));
}
