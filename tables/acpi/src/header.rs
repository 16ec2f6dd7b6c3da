//! System description table header.

use firmtab_core::{checksum, ByteCursor, DecodeResult, FieldRecord, Hint};
use static_assertions::const_assert_eq;

/// The 36-byte header shared by every system description table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct TableHeader {
    /// Table signature
    pub signature: [u8; 4],
    /// Length of the whole table, header included
    pub length: u32,
    /// Table revision
    pub revision: u8,
    /// Byte that makes the table sum to zero
    pub checksum: u8,
    /// OEM identifier
    pub oem_id: [u8; 6],
    /// OEM table identifier
    pub oem_table_id: [u8; 8],
    /// OEM revision
    pub oem_revision: u32,
    /// Vendor of the tool that built the table
    pub creator_id: [u8; 4],
    /// Revision of that tool
    pub creator_revision: u32,
}

const_assert_eq!(core::mem::size_of::<TableHeader>(), TableHeader::LEN);

impl TableHeader {
    /// Encoded size
    pub const LEN: usize = 36;

    /// Offset of the checksum byte
    pub const CHECKSUM_OFFSET: usize = 9;

    /// Decode a header from the cursor
    pub fn decode(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        Ok(Self {
            signature: cursor.read()?,
            length: cursor.read()?,
            revision: cursor.read()?,
            checksum: cursor.read()?,
            oem_id: cursor.read()?,
            oem_table_id: cursor.read()?,
            oem_revision: cursor.read()?,
            creator_id: cursor.read()?,
            creator_revision: cursor.read()?,
        })
    }

    /// Encode back to the on-disk layout
    pub fn repack(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..4].copy_from_slice(&self.signature);
        out[4..8].copy_from_slice(&self.length.to_le_bytes());
        out[8] = self.revision;
        out[9] = self.checksum;
        out[10..16].copy_from_slice(&self.oem_id);
        out[16..24].copy_from_slice(&self.oem_table_id);
        out[24..28].copy_from_slice(&self.oem_revision.to_le_bytes());
        out[28..32].copy_from_slice(&self.creator_id);
        out[32..36].copy_from_slice(&self.creator_revision.to_le_bytes());
        out
    }

    /// Copy of the header with the checksum byte recomputed for `body`
    ///
    /// `body` is everything after the header.
    pub fn with_checksum_for(&self, body: &[u8]) -> Self {
        let mut header = *self;
        header.checksum = 0;
        let sum = checksum::checksum(&header.repack()).wrapping_add(checksum::checksum(body));
        header.checksum = sum.wrapping_neg();
        header
    }

    /// Field record form
    pub fn to_record(&self) -> FieldRecord {
        let mut record = FieldRecord::new("TableHeader");
        record
            .add_hinted("signature", self.signature, Hint::Ascii)
            .add_hinted("length", self.length, Hint::Decimal)
            .add("revision", self.revision)
            .add("checksum", self.checksum)
            .add_hinted("oemid", self.oem_id, Hint::Ascii)
            .add_hinted("oemtableid", self.oem_table_id, Hint::Ascii)
            .add("oemrevision", self.oem_revision)
            .add_hinted("creatorid", self.creator_id, Hint::Ascii)
            .add("creatorrevision", self.creator_revision);
        record
    }
}
