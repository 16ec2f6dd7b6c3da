//! Generic Address Structure.

use firmtab_core::{ByteCursor, DecodeResult, FieldRecord, Hint};
use static_assertions::const_assert_eq;

/// Encoded size of a Generic Address Structure
pub const GAS_LEN: usize = 12;

// Space id, bit width, bit offset, access size, address
const_assert_eq!(1 + 1 + 1 + 1 + 8, GAS_LEN);

/// Name of an address space identifier
pub fn address_space_name(id: u64) -> &'static str {
    match id {
        0x00 => "System Memory",
        0x01 => "System IO",
        0x02 => "PCI Configuration Space",
        0x03 => "Embedded Controller",
        0x04 => "SMBus",
        0x0A => "Platform Communications Channel",
        0x7F => "Functional Fixed Hardware",
        0xC0..=0xFF => "OEM Defined",
        _ => "Reserved",
    }
}

/// Name of an access size code
pub fn access_size_name(size: u64) -> &'static str {
    match size {
        0 => "Undefined (legacy reasons)",
        1 => "Byte access",
        2 => "Word access",
        3 => "Dword access",
        4 => "Qword access",
        _ => "Reserved",
    }
}

/// Decode a Generic Address Structure
pub fn decode_gas(cursor: &mut ByteCursor<'_>) -> DecodeResult<FieldRecord> {
    let mut record = FieldRecord::new("GAS");
    record.read_named::<u8>(cursor, "address_space_id", address_space_name)?;
    record.read_hinted::<u8>(cursor, "register_bit_width", Hint::Decimal)?;
    record.read_hinted::<u8>(cursor, "register_bit_offset", Hint::Decimal)?;
    record.read_named::<u8>(cursor, "access_size", access_size_name)?;
    record.read::<u64>(cursor, "address")?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_gas() {
        let bytes = [0x01, 8, 0, 1, 0x08, 0x04, 0, 0, 0, 0, 0, 0];
        let mut cursor = ByteCursor::new(&bytes);
        let gas = decode_gas(&mut cursor).unwrap();
        assert!(cursor.at_end());
        assert_eq!(gas.get_u64("address_space_id"), Some(1));
        assert_eq!(gas.get_u64("register_bit_width"), Some(8));
        assert_eq!(gas.get_u64("access_size"), Some(1));
        assert_eq!(gas.get_u64("address"), Some(0x408));
    }

    #[test]
    fn test_names() {
        assert_eq!(address_space_name(0xC5), "OEM Defined");
        assert_eq!(address_space_name(0x20), "Reserved");
        assert_eq!(access_size_name(3), "Dword access");
        assert_eq!(access_size_name(9), "Reserved");
    }
}
