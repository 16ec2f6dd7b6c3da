//! # firmtab ACPI - ACPI Table Decoders
//!
//! Decoders for the ACPI system description tables, their subtables and
//! the resource descriptor templates returned by `_CRS` style methods.
//!
//! ## Supported Tables
//!
//! | Signature | Contents |
//! |-----------|----------|
//! | `RSDT`, `XSDT` | Table pointers |
//! | `FACP` | Fixed hardware description, revision gated |
//! | `APIC` | Interrupt controllers, processor maps |
//! | `SRAT`, `SLIT`, `MSCT` | NUMA topology |
//! | `MPST`, `PMTT` | Memory power and topology |
//! | `DMAR` | DMA remapping units and device scopes |
//! | `MCFG`, `HPET`, `SPCR`, `WDDT` | Platform devices |
//! | `MSDM`, `SLIC` | Licensing blobs |
//!
//! Any other signature decodes to its header and an opaque payload. The
//! RSDP and FACS have no standard header and use [`decode_rsdp`] and
//! [`decode_facs`].
//!
//! ## Example
//!
//! ```
//! use firmtab_acpi::{decode_table, repack_header};
//! use firmtab_core::{checksum, DecodeConfig};
//!
//! let mut bytes = vec![0u8; 44];
//! bytes[0..4].copy_from_slice(b"XSDT");
//! bytes[4..8].copy_from_slice(&44u32.to_le_bytes());
//! bytes[36..44].copy_from_slice(&0xBFF7_0000u64.to_le_bytes());
//! checksum::fixup(&mut bytes, 9);
//!
//! let table = decode_table(*b"XSDT", &bytes, &DecodeConfig::strict()).unwrap();
//! assert_eq!(table.record.get_ints("tables"), Some(&[0xBFF7_0000][..]));
//! assert_eq!(repack_header(&table.header)[..], bytes[..36]);
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod catalog;
mod common;
pub mod dmar;
pub mod fadt;
pub mod gas;
pub mod header;
pub mod madt;
pub mod numa;
mod platform;
pub mod pmtt;
pub mod resource;
pub mod root;
pub mod srat;
pub mod table;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogEntry, TableCatalog};
pub use fadt::decode_facs;
pub use gas::decode_gas;
pub use header::TableHeader;
pub use resource::ResourceDescriptors;
pub use root::{decode_rsdp, locate_rsdp};
pub use table::{decode_table, repack_header, DecodedTable};
