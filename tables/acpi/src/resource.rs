//! # Resource Descriptors
//!
//! `_CRS`, `_PRS` and `_SRS` buffers are a stream of small and large
//! resource descriptors. Bit 7 of the leading tag byte selects the form:
//!
//! ```text
//! small: | 0 | item (4) | len-1... | len (3) |   total = len + 1
//! large: | 1 |      item (7)      | u16 len  |   total = len + 3
//! ```
//!
//! Small items map to kinds `0x00..=0x0F`, large items to `0x80..=0xFF`.

use alloc::vec::Vec;
use firmtab_core::dispatch::{self, Candidate, Registry, Selector};
use firmtab_core::{
    bits, ByteCursor, DecodeConfig, DecodeError, DecodeResult, Discriminant, FieldRecord, Hint, Value,
};
use uuid::Uuid;

/// Bit set in the tag of large descriptors
const LARGE: u8 = 0x80;

// Small item names
/// IRQ format
pub const IRQ: u32 = 0x04;
/// DMA format
pub const DMA: u32 = 0x05;
/// Start dependent functions
pub const START_DEPENDENT: u32 = 0x06;
/// End dependent functions
pub const END_DEPENDENT: u32 = 0x07;
/// I/O port
pub const IO: u32 = 0x08;
/// Fixed location I/O port
pub const FIXED_IO: u32 = 0x09;
/// Fixed DMA
pub const FIXED_DMA: u32 = 0x0A;
/// Vendor defined (small)
pub const VENDOR_SMALL: u32 = 0x0E;
/// End tag
pub const END_TAG: u32 = 0x0F;

// Large item names, with the large bit folded in
/// 24-bit memory range
pub const MEMORY24: u32 = 0x81;
/// Vendor defined (large)
pub const VENDOR_LARGE: u32 = 0x84;
/// 32-bit memory range
pub const MEMORY32: u32 = 0x85;
/// 32-bit fixed memory range
pub const FIXED_MEMORY32: u32 = 0x86;
/// DWord address space
pub const DWORD_ADDRESS: u32 = 0x87;
/// Word address space
pub const WORD_ADDRESS: u32 = 0x88;
/// Extended interrupt
pub const EXTENDED_INTERRUPT: u32 = 0x89;
/// QWord address space
pub const QWORD_ADDRESS: u32 = 0x8A;

/// Peek the kind and total length of the descriptor at the cursor
fn resource_header(cursor: &ByteCursor<'_>) -> DecodeResult<Discriminant> {
    let tag = cursor.peek::<u8>()?;
    if tag & LARGE != 0 {
        let length = cursor.peek_at::<u16>(1)?;
        Ok(Discriminant::new(u32::from(tag), usize::from(length) + 3))
    } else {
        let item = bits::extract(tag.into(), 6, 3) as u32;
        let length = bits::extract(tag.into(), 2, 0) as usize + 1;
        Ok(Discriminant::new(item, length))
    }
}

fn begin_small(c: &mut ByteCursor<'_>, kind: &'static str) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new(kind);
    record.read::<u8>(c, "type")?;
    Ok(record)
}

fn begin_large(c: &mut ByteCursor<'_>, kind: &'static str) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new(kind);
    record.read::<u8>(c, "type")?;
    record.read_hinted::<u16>(c, "length", Hint::Decimal)?;
    Ok(record)
}

// =============================================================================
// SMALL DESCRIPTORS
// =============================================================================

fn sharing_name(value: u64) -> &'static str {
    match value {
        0 => "Exclusive",
        1 => "Shared",
        2 => "ExclusiveAndWake",
        _ => "SharedAndWake",
    }
}

fn polarity_name(value: u64) -> &'static str {
    if value == 0 { "Active-High" } else { "Active-Low" }
}

fn mode_name(value: u64) -> &'static str {
    if value == 0 { "Level-Triggered" } else { "Edge-Triggered" }
}

fn irq(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_small(c, "IRQ")?;
    let mask = record.read::<u16>(c, "_INT")?;
    record.add("irqs", Value::ints((0..16u8).filter(|&n| mask & (1 << n) != 0)));

    if c.at_end() {
        for name in ["information", "_SHR", "_LL", "_HE"] {
            record.add(name, Value::Absent);
        }
    } else {
        let info = u64::from(record.read::<u8>(c, "information")?);
        record
            .add_named("_SHR", bits::extract(info, 5, 4), sharing_name)
            .add_named("_LL", bits::extract(info, 3, 3), polarity_name)
            .add_named("_HE", bits::extract(info, 0, 0), mode_name);
    }
    Ok(record)
}

fn dma_type_name(value: u64) -> &'static str {
    match value {
        0b00 => "compatibility mode",
        0b01 => "Type A",
        0b10 => "Type B",
        _ => "Type F",
    }
}

fn transfer_size_name(value: u64) -> &'static str {
    match value {
        0b00 => "8-bit only",
        0b01 => "8- and 16-bit",
        0b10 => "16-bit only",
        _ => "Reserved",
    }
}

fn dma(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_small(c, "DMA")?;
    let channels = record.read::<u8>(c, "_DMA")?;
    record.add("channels", Value::ints((0..8u8).filter(|&n| channels & (1 << n) != 0)));
    let mask = u64::from(record.read::<u8>(c, "mask")?);
    record
        .add_named("_TYP", bits::extract(mask, 6, 5), dma_type_name)
        .add_flag("_BM", "mask", mask, 2)
        .add_named("_SIZ", bits::extract(mask, 1, 0), transfer_size_name);
    Ok(record)
}

fn configuration_name(value: u64) -> &'static str {
    match value {
        0 => "Good configuration",
        1 => "Acceptable configuration",
        2 => "Sub-optimal configuration",
        _ => "Reserved",
    }
}

fn start_dependent(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_small(c, "StartDependentFunctions")?;
    if c.at_end() {
        for name in ["priority", "compatibility_priority", "performance_robustness"] {
            record.add(name, Value::Absent);
        }
    } else {
        let priority = u64::from(record.read::<u8>(c, "priority")?);
        record
            .add_named("compatibility_priority", bits::extract(priority, 1, 0), configuration_name)
            .add_named("performance_robustness", bits::extract(priority, 3, 2), configuration_name);
    }
    Ok(record)
}

fn end_dependent(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    begin_small(c, "EndDependentFunctions")
}

fn io(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_small(c, "IOPort")?;
    let info = u64::from(record.read::<u8>(c, "information")?);
    record.add_bits("_DEC", "information", info, 0, 0);
    record.read::<u16>(c, "_MIN")?;
    record.read::<u16>(c, "_MAX")?;
    record.read::<u8>(c, "_ALN")?;
    record.read_hinted::<u8>(c, "_LEN", Hint::Decimal)?;
    Ok(record)
}

fn fixed_io(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_small(c, "FixedIOPort")?;
    record.read::<u16>(c, "_BAS")?;
    record.read_hinted::<u8>(c, "_LEN", Hint::Decimal)?;
    Ok(record)
}

fn transfer_width_name(value: u64) -> &'static str {
    match value {
        0 => "8-bit",
        1 => "16-bit",
        2 => "32-bit",
        3 => "64-bit",
        4 => "128-bit",
        5 => "256-bit",
        _ => "Reserved",
    }
}

fn fixed_dma(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_small(c, "FixedDMA")?;
    record.read::<u16>(c, "_DMA")?;
    record.read::<u16>(c, "_TYPE")?;
    record.read_named::<u8>(c, "_SIZ", transfer_width_name)?;
    Ok(record)
}

fn vendor_small(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_small(c, "VendorDefinedSmall")?;
    record.add_hinted("vendor_byte_list", c.rest(), Hint::Dump);
    Ok(record)
}

fn end_tag(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_small(c, "EndTag")?;
    record.read::<u8>(c, "checksum")?;
    Ok(record)
}

// =============================================================================
// LARGE DESCRIPTORS
// =============================================================================

fn write_status_name(value: u64) -> &'static str {
    if value == 0 { "non-writeable (read-only)" } else { "writeable" }
}

fn memory24(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_large(c, "Memory24BitRange")?;
    let info = u64::from(record.read::<u8>(c, "information")?);
    record.add_named("_RW", bits::extract(info, 0, 0), write_status_name);
    record.read::<u16>(c, "_MIN")?;
    record.read::<u16>(c, "_MAX")?;
    record.read::<u16>(c, "_ALN")?;
    record.read::<u16>(c, "_LEN")?;
    Ok(record)
}

fn vendor_large(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_large(c, "VendorDefinedLarge")?;
    record.read::<u8>(c, "uuid_sub_type")?;
    record.add("uuid", Uuid::from_bytes_le(c.read::<[u8; 16]>()?));
    record.add_hinted("vendor_byte_list", c.rest(), Hint::Dump);
    Ok(record)
}

fn memory32(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_large(c, "Memory32BitRange")?;
    let info = u64::from(record.read::<u8>(c, "information")?);
    record.add_named("_RW", bits::extract(info, 0, 0), write_status_name);
    record.read::<u32>(c, "_MIN")?;
    record.read::<u32>(c, "_MAX")?;
    record.read::<u32>(c, "_ALN")?;
    record.read::<u32>(c, "_LEN")?;
    Ok(record)
}

fn fixed_memory32(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_large(c, "FixedMemory32BitRange")?;
    let info = u64::from(record.read::<u8>(c, "information")?);
    record.add_named("_RW", bits::extract(info, 0, 0), write_status_name);
    record.read::<u32>(c, "_BAS")?;
    record.read::<u32>(c, "_LEN")?;
    Ok(record)
}

fn range_type_name(value: u64) -> &'static str {
    match value {
        0 => "Memory range",
        1 => "IO range",
        2 => "Bus number range",
        192..=255 => "OEM Defined",
        _ => "Reserved",
    }
}

/// Names of the five address space values, in layout order
const ADDRESS_FIELDS: [&str; 5] = [
    "address_space_granularity",
    "address_range_minimum",
    "address_range_maximum",
    "address_translation_offset",
    "address_length",
];

/// Shared layout of the Word, DWord and QWord address space descriptors
fn address_space<T>(c: &mut ByteCursor<'_>, kind: &'static str) -> DecodeResult<FieldRecord>
where
    T: firmtab_core::Scalar + Into<Value>,
{
    let mut record = begin_large(c, kind)?;
    record.read_named::<u8>(c, "range_type", range_type_name)?;
    let general = u64::from(record.read::<u8>(c, "general_flags")?);
    record
        .add_flag("_MAF", "general_flags", general, 3)
        .add_flag("_MIF", "general_flags", general, 2)
        .add_flag("_DEC", "general_flags", general, 1);
    record.read::<u8>(c, "type_specific_flags")?;
    for name in ADDRESS_FIELDS {
        record.read::<T>(c, name)?;
    }
    resource_source(c, &mut record)?;
    Ok(record)
}

/// Optional resource source index and name trailing some large descriptors
fn resource_source(c: &mut ByteCursor<'_>, record: &mut FieldRecord) -> DecodeResult<()> {
    if c.at_end() {
        record.add("resource_source_index", Value::Absent);
        record.add("resource_source", Value::Absent);
    } else {
        record.read::<u8>(c, "resource_source_index")?;
        let name = c.rest();
        let name = name.split(|&b| b == 0).next().unwrap_or(name);
        record.add_hinted("resource_source", name, Hint::Ascii);
    }
    Ok(())
}

fn dword_address(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    address_space::<u32>(c, "DWordAddressSpace")
}

fn word_address(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    address_space::<u16>(c, "WordAddressSpace")
}

fn qword_address(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    address_space::<u64>(c, "QWordAddressSpace")
}

fn extended_interrupt(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = begin_large(c, "ExtendedInterrupt")?;
    let flags = u64::from(record.read::<u8>(c, "interrupt_vector_flags")?);
    record
        .add_flag("consumer", "interrupt_vector_flags", flags, 0)
        .add_named("_HE", bits::extract(flags, 1, 1), mode_name)
        .add_named("_LL", bits::extract(flags, 2, 2), polarity_name)
        .add_named("_SHR", bits::extract(flags, 4, 3), sharing_name);
    let count = record.read_hinted::<u8>(c, "interrupt_table_length", Hint::Decimal)?;
    record.add("interrupt_number", Value::ints(c.read_n::<u32>(count.into())?));
    resource_source(c, &mut record)?;
    Ok(record)
}

fn unknown(c: &mut ByteCursor<'_>, disc: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    if disc.kind & u32::from(LARGE) != 0 {
        begin_large(c, "Unknown")
    } else {
        begin_small(c, "Unknown")
    }
}

/// Resource descriptor decoders, tried in order
pub static DESCRIPTORS: Registry<DecodeConfig> = Registry::new(
    "resource descriptor",
    resource_header,
    &[
        Candidate { name: "IRQ", selector: Selector::Kind(IRQ), decode: irq },
        Candidate { name: "DMA", selector: Selector::Kind(DMA), decode: dma },
        Candidate {
            name: "StartDependentFunctions",
            selector: Selector::Kind(START_DEPENDENT),
            decode: start_dependent,
        },
        Candidate {
            name: "EndDependentFunctions",
            selector: Selector::Kind(END_DEPENDENT),
            decode: end_dependent,
        },
        Candidate { name: "IOPort", selector: Selector::Kind(IO), decode: io },
        Candidate { name: "FixedIOPort", selector: Selector::Kind(FIXED_IO), decode: fixed_io },
        Candidate { name: "FixedDMA", selector: Selector::Kind(FIXED_DMA), decode: fixed_dma },
        Candidate {
            name: "VendorDefinedSmall",
            selector: Selector::Kind(VENDOR_SMALL),
            decode: vendor_small,
        },
        Candidate { name: "EndTag", selector: Selector::Kind(END_TAG), decode: end_tag },
        Candidate { name: "Memory24BitRange", selector: Selector::Kind(MEMORY24), decode: memory24 },
        Candidate {
            name: "VendorDefinedLarge",
            selector: Selector::Kind(VENDOR_LARGE),
            decode: vendor_large,
        },
        Candidate { name: "Memory32BitRange", selector: Selector::Kind(MEMORY32), decode: memory32 },
        Candidate {
            name: "FixedMemory32BitRange",
            selector: Selector::Kind(FIXED_MEMORY32),
            decode: fixed_memory32,
        },
        Candidate {
            name: "DWordAddressSpace",
            selector: Selector::Kind(DWORD_ADDRESS),
            decode: dword_address,
        },
        Candidate {
            name: "WordAddressSpace",
            selector: Selector::Kind(WORD_ADDRESS),
            decode: word_address,
        },
        Candidate {
            name: "ExtendedInterrupt",
            selector: Selector::Kind(EXTENDED_INTERRUPT),
            decode: extended_interrupt,
        },
        Candidate {
            name: "QWordAddressSpace",
            selector: Selector::Kind(QWORD_ADDRESS),
            decode: qword_address,
        },
        Candidate { name: "Unknown", selector: Selector::Any, decode: unknown },
    ],
);

/// A decoded resource template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptors {
    resources: Vec<FieldRecord>,
    error: Option<DecodeError>,
}

impl ResourceDescriptors {
    /// Decode a resource template buffer
    ///
    /// In best-effort mode a malformed descriptor stops the pass but the
    /// descriptors before it are kept and the error is available from
    /// [`ResourceDescriptors::error`]. In strict mode it is returned.
    pub fn decode(bytes: &[u8], config: &DecodeConfig) -> DecodeResult<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let mut resources = Vec::new();
        let error = match dispatch::dispatch_into(&mut cursor, &DESCRIPTORS, config, &mut resources) {
            Ok(()) => None,
            Err(err) if !config.is_strict() => {
                log::warn!("Resource template truncated after {} descriptors: {}", resources.len(), err);
                Some(err)
            }
            Err(err) => return Err(err),
        };
        Ok(Self { resources, error })
    }

    /// Decoded descriptors in buffer order
    #[inline]
    pub fn resources(&self) -> &[FieldRecord] {
        &self.resources
    }

    /// The error that stopped the pass early, if any
    #[inline]
    pub fn error(&self) -> Option<&DecodeError> {
        self.error.as_ref()
    }

    /// The template as a single record
    pub fn to_record(&self) -> FieldRecord {
        FieldRecord::new("ResourceDescriptors").with("resources", self.resources.clone())
    }

    /// Lowest and highest address of every fixed or ranged memory window
    pub fn memory_windows(&self) -> Vec<(u64, u64)> {
        self.resources
            .iter()
            .filter_map(|r| match r.kind() {
                "FixedMemory32BitRange" => {
                    let base = r.get_u64("_BAS")?;
                    Some((base, base + r.get_u64("_LEN")?.saturating_sub(1)))
                }
                "DWordAddressSpace" | "QWordAddressSpace" | "WordAddressSpace"
                    if r.get_u64("range_type") == Some(0) =>
                {
                    Some((r.get_u64("address_range_minimum")?, r.get_u64("address_range_maximum")?))
                }
                _ => None,
            })
            .collect()
    }
}
