//! # firmtab Core - Table Decoding Machinery
//!
//! Shared machinery for decoding self-describing firmware tables:
//!
//! - [`ByteCursor`]: little-endian reader with lookahead and bounded sub-views
//! - [`bits`]: inclusive bit range extraction
//! - [`FieldRecord`]: ordered, named decoded values
//! - [`dispatch`]: peek, carve, select and decode over variable-length records
//! - [`locate`]: signature scan with checksum gating over memory ranges
//!
//! ## Decoding Flow
//!
//! 1. Raw bytes are wrapped in a [`ByteCursor`]
//! 2. The fixed header is decoded, giving the declared length
//! 3. The body is handed to [`dispatch::dispatch`] with a family [`Registry`]
//! 4. Each record is decoded by the first matching [`Candidate`], the
//!    catch-all last
//!
//! Nothing here keeps global state; behaviour is driven by the
//! [`DecodeConfig`] passed into each call.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod bits;
pub mod checksum;
pub mod config;
pub mod cursor;
pub mod dispatch;
pub mod error;
pub mod locate;
pub mod record;
pub mod status;

pub use config::{DecodeConfig, DecodeContext, DecodeMode};
pub use cursor::{ByteCursor, Scalar};
pub use dispatch::{Candidate, Discriminant, Registry, Selector};
pub use error::{DecodeError, DecodeResult};
pub use record::{Field, FieldRecord, Hint, StringRef, Value};
pub use status::DecodeStatus;

pub use firmtab_hal as hal;

use alloc::string::String;

/// Render a signature or anchor for logs, replacing non-printable bytes
pub fn signature_str(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect()
}
