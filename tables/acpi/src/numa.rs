//! # SLIT and MSCT
//!
//! Locality distances and maximum system characteristics.

use crate::TableHeader;
use alloc::vec::Vec;
use firmtab_core::dispatch::{self, Candidate, Registry, Selector};
use firmtab_core::{ByteCursor, DecodeConfig, DecodeResult, Discriminant, FieldRecord, Hint, Value};

/// SLIT: square matrix of relative distances between localities
pub(crate) fn decode_slit(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    _: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    let count = record.read_hinted::<u64>(cursor, "number_system_localities", Hint::Decimal)?;
    let count = usize::try_from(count).unwrap_or(usize::MAX);

    let mut rows = Vec::new();
    let mut result = Ok(());
    for _ in 0..count {
        match cursor.read_n::<u8>(count) {
            Ok(row) => rows.push(row),
            Err(err) => {
                result = Err(err);
                break;
            }
        }
    }
    let distances: Vec<FieldRecord> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            FieldRecord::new("Locality")
                .with("locality", i as u64)
                .with("distances", Value::ints(row))
        })
        .collect();
    record.add("relative_distances", distances);
    result
}

/// Revision and length header of a proximity domain information structure
fn domain_info_header(cursor: &ByteCursor<'_>) -> DecodeResult<Discriminant> {
    let revision = cursor.peek::<u8>()?;
    let length = cursor.peek_at::<u8>(1)?;
    Ok(Discriminant::new(revision.into(), length.into()))
}

fn domain_info(c: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("ProximityDomainInfo");
    record.read_hinted::<u8>(c, "revision", Hint::Decimal)?;
    record.read_hinted::<u8>(c, "length", Hint::Decimal)?;
    record.read::<u32>(c, "proximity_domain_range_low")?;
    record.read::<u32>(c, "proximity_domain_range_high")?;
    record.read_hinted::<u32>(c, "max_processor_capacity", Hint::Decimal)?;
    record.read::<u64>(c, "max_memory_capacity")?;
    Ok(record)
}

/// Every revision shares the same prefix, so one decoder covers them all
pub static DOMAIN_INFO: Registry<DecodeConfig> = Registry::new(
    "MSCT",
    domain_info_header,
    &[Candidate {
        name: "ProximityDomainInfo",
        selector: Selector::Any,
        decode: domain_info,
    }],
);

pub(crate) fn decode_msct(
    cursor: &mut ByteCursor<'_>,
    _: &TableHeader,
    config: &DecodeConfig,
    record: &mut FieldRecord,
) -> DecodeResult<()> {
    let offset = record.read::<u32>(cursor, "proximity_domain_info_offset")?;
    record.read_hinted::<u32>(cursor, "max_proximity_domains", Hint::Decimal)?;
    record.read_hinted::<u32>(cursor, "max_clock_domains", Hint::Decimal)?;
    record.read::<u64>(cursor, "max_physical_address")?;

    // The offset is from the start of the table
    if let Some(gap) = (offset as usize).checked_sub(cursor.position()) {
        cursor.skip(gap)?;
    }
    dispatch::dispatch_to_field(record, "proximity_domains", cursor, &DOMAIN_INFO, config)
}
