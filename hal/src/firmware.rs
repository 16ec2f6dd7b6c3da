//! # Firmware Table Source
//!
//! Enumeration of the tables the platform firmware publishes (the ACPI
//! table set). Implementations hand out owned copies of the table bytes.

use alloc::vec::Vec;

/// Source of firmware tables addressed by signature or by position
pub trait FirmwareSource: Send + Sync {
    /// Get the `instance`-th table (1-based) carrying `signature`
    ///
    /// Returns `None` when the firmware publishes fewer instances.
    fn table(&self, signature: [u8; 4], instance: usize) -> Option<Vec<u8>>;

    /// Get the table at `index` in firmware enumeration order
    ///
    /// Enumeration stops at the first index returning `None`.
    fn table_by_index(&self, index: usize) -> Option<Vec<u8>>;
}

/// In-memory table set, in enumeration order
///
/// Signatures are taken from the first four bytes of each table; tables
/// without a signature-sized prefix (such as the RSDP, whose signature is
/// eight bytes) can be registered under an explicit signature.
#[derive(Debug, Default, Clone)]
pub struct TableSet {
    tables: Vec<([u8; 4], Vec<u8>)>,
    /// Tables reachable by signature only (not part of enumeration)
    hidden: Vec<([u8; 4], Vec<u8>)>,
}

impl TableSet {
    /// Create an empty table set
    pub const fn new() -> Self {
        Self {
            tables: Vec::new(),
            hidden: Vec::new(),
        }
    }

    /// Add a table to the enumeration; its signature is its first four bytes
    ///
    /// Tables shorter than four bytes are ignored.
    pub fn push(&mut self, bytes: Vec<u8>) -> &mut Self {
        if let Some(sig) = bytes.get(..4) {
            let mut signature = [0u8; 4];
            signature.copy_from_slice(sig);
            self.tables.push((signature, bytes));
        } else {
            log::warn!("Ignoring {}-byte table without signature", bytes.len());
        }
        self
    }

    /// Add a table that is only reachable through [`FirmwareSource::table`]
    pub fn push_hidden(&mut self, signature: [u8; 4], bytes: Vec<u8>) -> &mut Self {
        self.hidden.push((signature, bytes));
        self
    }

    /// Number of enumerable tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check whether no table is enumerable
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FirmwareSource for TableSet {
    fn table(&self, signature: [u8; 4], instance: usize) -> Option<Vec<u8>> {
        if instance == 0 {
            return None;
        }
        self.tables
            .iter()
            .chain(self.hidden.iter())
            .filter(|(sig, _)| *sig == signature)
            .nth(instance - 1)
            .map(|(_, bytes)| bytes.clone())
    }

    fn table_by_index(&self, index: usize) -> Option<Vec<u8>> {
        self.tables.get(index).map(|(_, bytes)| bytes.clone())
    }
}
