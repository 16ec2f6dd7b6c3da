//! # Physical Memory Source
//!
//! Windows of physical memory, used to scan the legacy BIOS areas for
//! table anchors and to snapshot tables found through them.

use crate::{HalError, HalResult, PhysAddr};
use alloc::vec;
use alloc::vec::Vec;

/// Readable physical memory
pub trait MemorySource: Send + Sync {
    /// Copy `len` bytes starting at `addr`
    ///
    /// Fails with [`HalError::InvalidAddress`] when any part of the range
    /// is not readable.
    fn read_memory(&self, addr: PhysAddr, len: usize) -> HalResult<Vec<u8>>;
}

/// A contiguous chunk of a [`MemoryImage`]
#[derive(Debug, Clone)]
struct Region {
    base: PhysAddr,
    bytes: Vec<u8>,
}

impl Region {
    fn slice(&self, addr: PhysAddr, len: usize) -> Option<&[u8]> {
        let start = usize::try_from(addr.offset_from(self.base)?).ok()?;
        let end = start.checked_add(len)?;
        self.bytes.get(start..end)
    }
}

/// Sparse in-memory image of physical memory
#[derive(Debug, Default, Clone)]
pub struct MemoryImage {
    regions: Vec<Region>,
}

impl MemoryImage {
    /// Create an image with no readable memory
    pub const fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    /// Add a region initialized with `bytes`
    pub fn with_region(mut self, base: PhysAddr, bytes: Vec<u8>) -> Self {
        self.regions.push(Region { base, bytes });
        self
    }

    /// Add a zero-filled region of `len` bytes
    pub fn with_zeroed(self, base: PhysAddr, len: usize) -> Self {
        self.with_region(base, vec![0; len])
    }

    /// Overwrite bytes at `addr` inside an existing region
    pub fn write(&mut self, addr: PhysAddr, data: &[u8]) -> HalResult<()> {
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.slice(addr, data.len()).is_some())
            .ok_or(HalError::InvalidAddress)?;
        let start = addr.offset_from(region.base).ok_or(HalError::InvalidAddress)? as usize;
        region.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}

impl MemorySource for MemoryImage {
    fn read_memory(&self, addr: PhysAddr, len: usize) -> HalResult<Vec<u8>> {
        self.regions
            .iter()
            .find_map(|r| r.slice(addr, len))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                log::trace!("Unbacked read of {} bytes at {}", len, addr);
                HalError::InvalidAddress
            })
    }
}
