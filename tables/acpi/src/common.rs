//! Subtable header conventions shared by the table bodies.

use firmtab_core::{ByteCursor, DecodeConfig, DecodeResult, Discriminant, FieldRecord, Hint};

/// Signature of a table body decoder
///
/// The decoder adds fields to `record` as it goes, so whatever it decoded
/// before a failure stays visible.
pub(crate) type BodyFn =
    fn(&mut ByteCursor<'_>, &crate::TableHeader, &DecodeConfig, &mut FieldRecord) -> DecodeResult<()>;

/// `type: u8, length: u8` subtable header
pub(crate) fn byte_header(cursor: &ByteCursor<'_>) -> DecodeResult<Discriminant> {
    let kind = cursor.peek::<u8>()?;
    let length = cursor.peek_at::<u8>(1)?;
    Ok(Discriminant::new(kind.into(), length.into()))
}

/// Start a record by reading its `type: u8, length: u8` header
pub(crate) fn begin_byte(cursor: &mut ByteCursor<'_>, kind: &'static str) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new(kind);
    record.read_hinted::<u8>(cursor, "type", Hint::Decimal)?;
    record.read_hinted::<u8>(cursor, "length", Hint::Decimal)?;
    Ok(record)
}

/// Catch-all for `type: u8, length: u8` subtables
pub(crate) fn unknown_byte(
    cursor: &mut ByteCursor<'_>,
    _: &Discriminant,
    _: &DecodeConfig,
) -> DecodeResult<FieldRecord> {
    let mut record = begin_byte(cursor, "Unknown")?;
    record.add_hinted("data", cursor.rest(), Hint::Dump);
    Ok(record)
}

/// `type: u16, length: u16` subtable header
pub(crate) fn word_header(cursor: &ByteCursor<'_>) -> DecodeResult<Discriminant> {
    let kind = cursor.peek::<u16>()?;
    let length = cursor.peek_at::<u16>(2)?;
    Ok(Discriminant::new(kind.into(), length.into()))
}

/// Start a record by reading its `type: u16, length: u16` header
pub(crate) fn begin_word(cursor: &mut ByteCursor<'_>, kind: &'static str) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new(kind);
    record.read_hinted::<u16>(cursor, "type", Hint::Decimal)?;
    record.read_hinted::<u16>(cursor, "length", Hint::Decimal)?;
    Ok(record)
}

/// Catch-all for `type: u16, length: u16` subtables
pub(crate) fn unknown_word(
    cursor: &mut ByteCursor<'_>,
    _: &Discriminant,
    _: &DecodeConfig,
) -> DecodeResult<FieldRecord> {
    let mut record = begin_word(cursor, "Unknown")?;
    record.add_hinted("data", cursor.rest(), Hint::Dump);
    Ok(record)
}

/// Combine a split 64-bit value
#[inline]
pub(crate) fn join_u64(low: u32, high: u32) -> u64 {
    (u64::from(high) << 32) | u64::from(low)
}
