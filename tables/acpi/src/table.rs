//! # Table Decoding
//!
//! Entry point for every table carrying the standard 36-byte header.
//!
//! The header is decoded first and fixes the table's extent. The body is
//! then handed to the decoder registered for the signature; unknown
//! signatures keep their body as an opaque payload.
//!
//! ## Failure Handling
//!
//! | Problem | Strict | Best effort |
//! |---------|--------|-------------|
//! | buffer shorter than the header | error | error |
//! | declared length below 36 | error | error |
//! | declared length past the buffer | error | clamp, `LENGTH_TRUNCATED` |
//! | checksum mismatch | error | `CHECKSUM_MISMATCH` |
//! | body decoder failure | error | partial body, `BODY_INCOMPLETE` |
//! | record re-decoded by a catch-all | n/a | `RECORD_FALLBACK` |

use crate::common::BodyFn;
use crate::{dmar, fadt, madt, numa, platform, pmtt, root, srat, TableHeader};
use alloc::vec::Vec;
use firmtab_core::{
    checksum, signature_str, ByteCursor, DecodeConfig, DecodeError, DecodeResult, DecodeStatus, FieldRecord,
};

/// A decoded system description table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTable {
    /// Fixed header
    pub header: TableHeader,
    /// Header and body fields; the header is under `header`
    pub record: FieldRecord,
    /// Problems tolerated while decoding
    pub status: DecodeStatus,
    /// Errors that cut the body short
    pub errors: Vec<DecodeError>,
    /// Byte sum over the decoded extent, zero for a well-formed table
    pub checksum: u8,
}

impl DecodedTable {
    /// Check whether the table decoded without any problem
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.status.is_clean()
    }

    /// Table signature
    #[inline]
    pub fn signature(&self) -> [u8; 4] {
        self.header.signature
    }
}

/// Body decoders by signature
///
/// The record kind names the table layout.
const BODIES: &[([u8; 4], &str, BodyFn)] = &[
    (*b"RSDT", "RSDT", root::decode_rsdt),
    (*b"XSDT", "XSDT", root::decode_xsdt),
    (*b"FACP", "FADT", fadt::decode_facp),
    (*b"APIC", "MADT", madt::decode_body),
    (*b"SRAT", "SRAT", srat::decode_body),
    (*b"SLIT", "SLIT", numa::decode_slit),
    (*b"MSCT", "MSCT", numa::decode_msct),
    (*b"MPST", "MPST", pmtt::decode_mpst),
    (*b"PMTT", "PMTT", pmtt::decode_pmtt),
    (*b"DMAR", "DMAR", dmar::decode_body),
    (*b"MCFG", "MCFG", platform::decode_mcfg),
    (*b"HPET", "HPET", platform::decode_hpet),
    (*b"SPCR", "SPCR", platform::decode_spcr),
    (*b"WDDT", "WDDT", platform::decode_wddt),
    (*b"MSDM", "MSDM", platform::decode_licensing),
    (*b"SLIC", "SLIC", platform::decode_licensing),
];

fn opaque_body(_: &mut ByteCursor<'_>, _: &TableHeader, _: &DecodeConfig, _: &mut FieldRecord) -> DecodeResult<()> {
    Ok(())
}

/// Kind name and body decoder for `signature`
fn body_for(signature: &[u8; 4]) -> (&'static str, BodyFn) {
    BODIES
        .iter()
        .find(|(sig, _, _)| sig == signature)
        .map_or(("Unknown", opaque_body as BodyFn), |&(_, kind, body)| (kind, body))
}

/// Check whether a body decoder exists for `signature`
pub fn is_known(signature: &[u8; 4]) -> bool {
    BODIES.iter().any(|(sig, _, _)| sig == signature)
}

/// Decode a table with the body decoder registered for `signature`
///
/// `signature` selects the decoder; a header carrying a different one is
/// logged and decoded as requested.
pub fn decode_table(signature: [u8; 4], bytes: &[u8], config: &DecodeConfig) -> DecodeResult<DecodedTable> {
    let header = TableHeader::decode(&mut ByteCursor::new(bytes))?;
    if header.signature != signature {
        log::debug!(
            "Decoding {} table as {}",
            signature_str(&header.signature),
            signature_str(&signature)
        );
    }

    let declared = header.length as usize;
    if declared < TableHeader::LEN {
        return Err(DecodeError::MalformedLength {
            offset: 4,
            length: declared,
            available: bytes.len(),
        });
    }

    let mut status = DecodeStatus::empty();
    let extent = if declared > bytes.len() {
        if config.is_strict() {
            return Err(DecodeError::MalformedLength {
                offset: 4,
                length: declared,
                available: bytes.len(),
            });
        }
        log::warn!(
            "{}: declares {} bytes, only {} supplied",
            signature_str(&signature),
            declared,
            bytes.len()
        );
        status |= DecodeStatus::LENGTH_TRUNCATED;
        bytes.len()
    } else {
        declared
    };
    let table = &bytes[..extent];

    let sum = checksum::checksum(table);
    if config.verify_checksums && sum != 0 {
        if config.is_strict() {
            return Err(DecodeError::ChecksumMismatch { sum });
        }
        log::warn!("{}: checksum mismatch (sum {:#04x})", signature_str(&signature), sum);
        status |= DecodeStatus::CHECKSUM_MISMATCH;
    }

    let (kind, body) = body_for(&signature);
    let mut record = FieldRecord::new(kind);
    record.add("header", header.to_record());

    let mut errors = Vec::new();
    let mut cursor = ByteCursor::with_base(&table[TableHeader::LEN..], TableHeader::LEN);
    if let Err(err) = body(&mut cursor, &header, config, &mut record) {
        if config.is_strict() {
            return Err(err);
        }
        log::warn!(
            "{}: body decoding stopped at {:#x}: {}",
            signature_str(&signature),
            cursor.position(),
            err
        );
        status |= DecodeStatus::BODY_INCOMPLETE;
        errors.push(err);
    }
    record.finish(&mut cursor);

    if record.any_failed() {
        status |= DecodeStatus::RECORD_FALLBACK;
    }

    Ok(DecodedTable {
        header,
        record,
        status,
        errors,
        checksum: sum,
    })
}

/// Encode a header back to its 36-byte layout
#[inline]
pub fn repack_header(header: &TableHeader) -> [u8; TableHeader::LEN] {
    header.repack()
}
