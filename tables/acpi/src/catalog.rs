//! # Table Catalog
//!
//! The set of tables a [`FirmwareSource`] publishes, and bulk decoding of
//! all of them.

use crate::fadt::decode_facs;
use crate::root::decode_rsdp;
use crate::table::{decode_table, DecodedTable};
use alloc::vec::Vec;
use firmtab_core::{signature_str, DecodeConfig, DecodeError, DecodeResult, FieldRecord};
use firmtab_hal::FirmwareSource;

/// Tables reached through the root pointer instead of enumeration
const ROOT_SIGNATURES: [[u8; 4]; 3] = [*b"RSDP", *b"RSDT", *b"XSDT"];

/// One decoded catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    /// Root system description pointer
    Rsdp(FieldRecord),
    /// Firmware ACPI control structure
    Facs(FieldRecord),
    /// Any table with the standard header
    Sdt(DecodedTable),
}

impl CatalogEntry {
    /// Decoded fields of the entry
    pub fn record(&self) -> &FieldRecord {
        match self {
            Self::Rsdp(record) | Self::Facs(record) => record,
            Self::Sdt(table) => &table.record,
        }
    }
}

/// Sorted, de-duplicated signatures of the published tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCatalog {
    signatures: Vec<[u8; 4]>,
}

impl TableCatalog {
    /// Enumerate the tables of `source`
    ///
    /// Enumeration stops at the first missing index. The root tables are
    /// added when the source hands them out by signature.
    pub fn build<S: FirmwareSource + ?Sized>(source: &S) -> Self {
        let mut signatures: Vec<[u8; 4]> = (0..)
            .map_while(|index| source.table_by_index(index))
            .filter_map(|bytes| bytes.get(..4).and_then(|sig| sig.try_into().ok()))
            .collect();

        signatures.extend(ROOT_SIGNATURES.into_iter().filter(|&sig| source.table(sig, 1).is_some()));
        signatures.sort_unstable();
        signatures.dedup();
        log::debug!("Catalog holds {} table signatures", signatures.len());
        Self { signatures }
    }

    /// Signatures in sorted order
    #[inline]
    pub fn signatures(&self) -> &[[u8; 4]] {
        &self.signatures
    }

    /// Check whether `signature` is published
    pub fn contains(&self, signature: &[u8; 4]) -> bool {
        self.signatures.binary_search(signature).is_ok()
    }

    /// Number of distinct signatures
    #[inline]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Check whether the catalog is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Decode the `instance`-th table (1-based) carrying `signature`
    pub fn decode<S: FirmwareSource + ?Sized>(
        source: &S,
        signature: [u8; 4],
        instance: usize,
        config: &DecodeConfig,
    ) -> DecodeResult<CatalogEntry> {
        let bytes = source.table(signature, instance).ok_or(DecodeError::NotFound)?;
        match &signature {
            b"RSDP" => decode_rsdp(&bytes).map(CatalogEntry::Rsdp),
            b"FACS" => decode_facs(&bytes).map(CatalogEntry::Facs),
            _ => decode_table(signature, &bytes, config).map(CatalogEntry::Sdt),
        }
    }

    /// Decode every instance of every cataloged table
    ///
    /// In best-effort mode a table that cannot be decoded at all is logged
    /// and skipped; in strict mode its error is returned.
    pub fn decode_all<S: FirmwareSource + ?Sized>(
        &self,
        source: &S,
        config: &DecodeConfig,
    ) -> DecodeResult<Vec<CatalogEntry>> {
        let mut entries = Vec::new();
        for &signature in &self.signatures {
            for instance in 1.. {
                match Self::decode(source, signature, instance, config) {
                    Ok(entry) => entries.push(entry),
                    Err(DecodeError::NotFound) => break,
                    Err(err) if !config.is_strict() => {
                        log::warn!("{} #{}: {}", signature_str(&signature), instance, err);
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TableHeader;
    use alloc::vec;
    use firmtab_core::checksum;
    use firmtab_hal::TableSet;

    fn sdt(signature: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; TableHeader::LEN];
        bytes[0..4].copy_from_slice(signature);
        bytes[4..8].copy_from_slice(&((TableHeader::LEN + body.len()) as u32).to_le_bytes());
        bytes.extend_from_slice(body);
        checksum::fixup(&mut bytes, TableHeader::CHECKSUM_OFFSET);
        bytes
    }

    fn source() -> TableSet {
        let mut set = TableSet::new();
        set.push(sdt(b"SSDT", &[0xA0]))
            .push(sdt(b"APIC", &[0u8; 8]))
            .push(sdt(b"SSDT", &[0xA1]));
        set.push_hidden(*b"XSDT", sdt(b"XSDT", &[0u8; 8]));
        set
    }

    #[test]
    fn test_build_sorts_and_dedups() {
        let catalog = TableCatalog::build(&source());
        assert_eq!(catalog.signatures(), &[*b"APIC", *b"SSDT", *b"XSDT"]);
        assert!(catalog.contains(b"XSDT"));
        assert!(!catalog.contains(b"RSDT"));
    }

    #[test]
    fn test_decode_all_visits_instances() {
        let set = source();
        let entries = TableCatalog::build(&set).decode_all(&set, &DecodeConfig::strict()).unwrap();
        assert_eq!(entries.len(), 4);
        let kinds: Vec<_> = entries.iter().map(|e| e.record().kind()).collect();
        assert_eq!(kinds, vec!["MADT", "Unknown", "Unknown", "XSDT"]);
    }

    #[test]
    fn test_missing_table() {
        assert_eq!(
            TableCatalog::decode(&source(), *b"HPET", 1, &DecodeConfig::default()),
            Err(DecodeError::NotFound)
        );
    }
}
