//! # firmtab HAL - Firmware Access Boundary
//!
//! This crate defines the traits through which the decoders obtain raw
//! firmware bytes. Acquiring those bytes (physical memory mapping, EFI
//! configuration tables, ACPI table enumeration) is the job of the platform;
//! the decoders only ever see immutable snapshots.
//!
//! ## Design Philosophy
//!
//! - **Snapshot based**: every read returns owned bytes, decoding never
//!   touches live memory
//! - **Minimal**: two traits, one for ACPI table enumeration and one for
//!   physical memory windows
//! - **Testable**: in-memory implementations ([`TableSet`], [`MemoryImage`])
//!   stand in for real firmware

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod firmware;
pub mod memory;

pub use firmware::{FirmwareSource, TableSet};
pub use memory::{MemoryImage, MemorySource};

use core::fmt;

/// Result type for HAL operations
pub type HalResult<T> = Result<T, HalError>;

/// Errors that can occur while acquiring firmware bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Address range is not backed by any readable region
    InvalidAddress,
    /// The platform refused access to the range
    PermissionDenied,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress => write!(f, "address range not readable"),
            Self::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

/// Physical address type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysAddr(u64);

static_assertions::const_assert_eq!(core::mem::size_of::<PhysAddr>(), 8);

impl PhysAddr {
    /// Create a new physical address
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Physical address of a real-mode segment (`segment << 4`)
    #[inline]
    pub const fn from_segment(segment: u16) -> Self {
        Self((segment as u64) << 4)
    }

    /// Get the raw address value
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Align the address up to `align`, a power of two
    #[inline]
    pub const fn align_up(self, align: u64) -> Self {
        Self((self.0 + align - 1) & !(align - 1))
    }

    /// Add an offset to the address
    #[inline]
    pub const fn add(self, offset: u64) -> Self {
        Self(self.0 + offset)
    }

    /// Offset of `self` from `base`, if `self` is not below it
    #[inline]
    pub const fn offset_from(self, base: PhysAddr) -> Option<u64> {
        self.0.checked_sub(base.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phys_addr_alignment() {
        assert_eq!(PhysAddr::new(0xE0001).align_up(16), PhysAddr::new(0xE0010));
        assert_eq!(PhysAddr::new(0xE0010).align_up(16), PhysAddr::new(0xE0010));
        assert_eq!(PhysAddr::new(0xE0001).align_up(1), PhysAddr::new(0xE0001));
    }

    #[test]
    fn test_phys_addr_from_segment() {
        assert_eq!(PhysAddr::from_segment(0x9FC0), PhysAddr::new(0x9FC00));
        assert_eq!(PhysAddr::new(0x9FC10).offset_from(PhysAddr::new(0x9FC00)), Some(0x10));
        assert_eq!(PhysAddr::new(0x10).offset_from(PhysAddr::new(0x20)), None);
    }
}
