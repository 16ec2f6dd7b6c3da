//! # firmtab SMBIOS - SMBIOS Decoders
//!
//! Decoding of the SMBIOS entry point and the structure table it points to.
//!
//! ## Flow
//!
//! 1. [`Smbios::locate`] scans `0xF0000..0x100000` for a `_SM3_` anchor,
//!    then for `_SM_`, accepting only checksummed entry points
//! 2. [`Smbios::from_entry_point`] decodes the entry point and snapshots
//!    the structure table it references
//! 3. [`Smbios::decode`] dispatches the structures through
//!    [`types::STRUCTURES`] until the end-of-table structure
//!
//! String references resolve against each structure's own string set and
//! are kept as [`firmtab_core::StringRef`] values.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod entry;
pub mod structure;
pub mod types;


pub use entry::{EntryPoint, EntryPoint2, EntryPoint3, SmbiosVersion};
pub use structure::{SmbiosContext, StringTable};

use alloc::vec::Vec;
use firmtab_core::locate::{self, ScanRange};
use firmtab_core::{dispatch, ByteCursor, DecodeConfig, DecodeError, DecodeResult, DecodeStatus, FieldRecord};
use firmtab_hal::{MemorySource, PhysAddr};

/// Range holding the entry point on legacy systems
pub const SEARCH_RANGE: ScanRange = ScanRange::compliant(0xF0000, 0x10000);

/// Bytes needed to tell the entry point generations apart
const ANCHOR_PROBE: usize = 5;

/// A decoded SMBIOS structure table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smbios {
    /// Entry point the table was reached through
    pub entry_point: EntryPoint,
    /// Structures in table order, end-of-table included
    pub structures: Vec<FieldRecord>,
    /// Problems tolerated while decoding
    pub status: DecodeStatus,
    /// Errors that cut the structure stream short
    pub errors: Vec<DecodeError>,
}

impl Smbios {
    /// Decode a structure table snapshot
    pub fn decode(entry_point: EntryPoint, table: &[u8], config: &DecodeConfig) -> DecodeResult<Self> {
        Self::decode_with_status(entry_point, table, config, DecodeStatus::empty())
    }

    fn decode_with_status(
        entry_point: EntryPoint,
        table: &[u8],
        config: &DecodeConfig,
        mut status: DecodeStatus,
    ) -> DecodeResult<Self> {
        let ctx = SmbiosContext::new(*config, entry_point.version());
        log::debug!(
            "Decoding SMBIOS {} structure table ({} bytes)",
            ctx.version,
            table.len()
        );

        let mut structures = Vec::new();
        let mut errors = Vec::new();
        let mut cursor = ByteCursor::new(table);
        let end_of_table = u32::from(types::END_OF_TABLE);
        let result = dispatch::dispatch_until(&mut cursor, &types::STRUCTURES, &ctx, &mut structures, |disc| {
            disc.kind == end_of_table
        });

        if let Err(err) = result {
            if config.is_strict() {
                return Err(err);
            }
            log::warn!(
                "SMBIOS: structure stream stopped at {:#x} after {} structures: {}",
                cursor.position(),
                structures.len(),
                err
            );
            status |= DecodeStatus::BODY_INCOMPLETE;
            errors.push(err);
        }

        if structures.iter().any(FieldRecord::failed) {
            status |= DecodeStatus::RECORD_FALLBACK;
        }

        Ok(Self {
            entry_point,
            structures,
            status,
            errors,
        })
    }

    /// Decode the entry point at `address` and the table it references
    ///
    /// A checksum mismatch in the entry point fails strict decoding and is
    /// flagged otherwise.
    pub fn from_entry_point<M: MemorySource + ?Sized>(
        memory: &M,
        address: PhysAddr,
        config: &DecodeConfig,
    ) -> DecodeResult<Self> {
        let anchor = memory.read_memory(address, ANCHOR_PROBE)?;
        let size = EntryPoint::size_for_anchor(&anchor).ok_or(DecodeError::NotFound)?;
        let bytes = memory.read_memory(address, size)?;
        let entry_point = EntryPoint::decode(&bytes)?;

        let mut status = DecodeStatus::empty();
        if config.verify_checksums {
            if let Err(err) = entry_point.verify(&bytes) {
                if config.is_strict() {
                    return Err(err);
                }
                log::warn!("SMBIOS entry point at {}: {}", address, err);
                status |= DecodeStatus::CHECKSUM_MISMATCH;
            }
        }

        let table = memory.read_memory(PhysAddr::new(entry_point.table_address()), entry_point.table_length())?;
        Self::decode_with_status(entry_point, &table, config, status)
    }

    /// Find the entry point in the BIOS area and decode the table
    ///
    /// The 3.x entry point wins when both generations are present.
    pub fn locate<M: MemorySource + ?Sized>(memory: &M, config: &DecodeConfig) -> DecodeResult<Option<Self>> {
        for spec in [&EntryPoint3::SCAN, &EntryPoint2::SCAN] {
            if let Some(found) = locate::locate(memory, spec, &[SEARCH_RANGE])? {
                return Self::from_entry_point(memory, found.address, config).map(Some);
            }
        }
        log::debug!("No SMBIOS entry point found");
        Ok(None)
    }

    /// Specification version of the table
    #[inline]
    pub fn version(&self) -> SmbiosVersion {
        self.entry_point.version()
    }

    /// Check whether the table decoded without any problem
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.status.is_clean()
    }

    /// Structures of type `kind`
    pub fn by_type(&self, kind: u8) -> impl Iterator<Item = &FieldRecord> + '_ {
        self.structures
            .iter()
            .filter(move |s| s.get_u64("type") == Some(u64::from(kind)))
    }

    /// First structure of type `kind`
    pub fn find(&self, kind: u8) -> Option<&FieldRecord> {
        self.by_type(kind).next()
    }

    /// Entry point and structures as one record
    pub fn to_record(&self) -> FieldRecord {
        FieldRecord::new("SMBIOS")
            .with("header", self.entry_point.to_record())
            .with("structures", self.structures.clone())
    }
}
