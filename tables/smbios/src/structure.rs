//! # Structure Framing
//!
//! Every SMBIOS structure is a formatted area followed by a string set:
//!
//! ```text
//! +------+--------+--------+------------------+-------------------------+
//! | type | length | handle | formatted fields | "str1\0str2\0...\0" \0  |
//! +------+--------+--------+------------------+-------------------------+
//! |<----------------- length ---------------->|<----- string set ------>|
//! ```
//!
//! `length` covers the formatted area only. The string set ends at the first
//! double NUL after it; a structure without strings still carries the two
//! NUL bytes.

use crate::entry::SmbiosVersion;
use alloc::string::String;
use alloc::vec::Vec;
use firmtab_core::{
    ByteCursor, DecodeConfig, DecodeContext, DecodeError, DecodeResult, Discriminant, FieldRecord, Hint, Scalar,
    StringRef, Value,
};

/// Size of the type, length and handle fields
pub const HEADER_LEN: usize = 4;

/// Decoding context for structure streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmbiosContext {
    /// Active configuration
    pub config: DecodeConfig,
    /// Version from the entry point
    pub version: SmbiosVersion,
}

impl SmbiosContext {
    /// Create a context
    pub const fn new(config: DecodeConfig, version: SmbiosVersion) -> Self {
        Self { config, version }
    }

    /// Check whether the table follows version `major.minor` or later
    #[inline]
    pub fn at_least(&self, major: u8, minor: u8) -> bool {
        self.version.at_least(major, minor)
    }
}

impl DecodeContext for SmbiosContext {
    fn config(&self) -> &DecodeConfig {
        &self.config
    }
}

/// Peek a structure's type and total length, string set included
pub(crate) fn structure_header(cursor: &ByteCursor<'_>) -> DecodeResult<Discriminant> {
    let kind = cursor.peek::<u8>()?;
    let formatted = usize::from(cursor.peek_at::<u8>(1)?);
    if formatted < HEADER_LEN {
        return Err(DecodeError::MalformedLength {
            offset: cursor.position() + 1,
            length: formatted,
            available: cursor.remaining(),
        });
    }

    let bytes = cursor.peek_rest();
    if formatted > bytes.len() {
        // Let the dispatcher report the overrun
        return Ok(Discriminant::new(kind.into(), formatted));
    }

    let strings = bytes[formatted..]
        .windows(2)
        .position(|pair| pair == [0, 0])
        .ok_or(DecodeError::MalformedLength {
            offset: cursor.position() + formatted,
            length: bytes.len() - formatted,
            available: bytes.len() - formatted,
        })?;

    Ok(Discriminant::new(kind.into(), formatted + strings + 2))
}

/// The strings of one structure, addressed by 1-based index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    /// Split a double-NUL terminated string set
    pub fn parse(bytes: &[u8]) -> Self {
        let strings = bytes
            .split(|&b| b == 0)
            .take_while(|s| !s.is_empty())
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();
        Self { strings }
    }

    /// Resolve a string index
    pub fn lookup(&self, index: u8) -> StringRef {
        match usize::from(index) {
            0 => StringRef::None,
            i if i > self.strings.len() => StringRef::OutOfRange {
                index,
                count: self.strings.len(),
            },
            i => StringRef::Text {
                index,
                text: self.strings[i - 1].clone(),
            },
        }
    }

    /// Number of strings
    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check whether the set holds no strings
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Strings in index order
    #[inline]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }
}

/// A structure being decoded
///
/// Splits the bounded region into the formatted area and the string set,
/// and reads the common header.
pub(crate) struct Structure<'a> {
    pub record: FieldRecord,
    pub formatted: ByteCursor<'a>,
    strings: StringTable,
    length: usize,
}

impl<'a> Structure<'a> {
    pub fn begin(cursor: &mut ByteCursor<'a>, kind: &'static str) -> DecodeResult<Self> {
        let length = usize::from(cursor.peek_at::<u8>(1)?);
        let mut formatted = cursor.take(length)?;
        let strings = StringTable::parse(cursor.rest());

        let mut record = FieldRecord::new(kind);
        record.read_hinted::<u8>(&mut formatted, "type", Hint::Decimal)?;
        record.read_hinted::<u8>(&mut formatted, "length", Hint::Hex)?;
        record.read_hinted::<u16>(&mut formatted, "handle", Hint::Hex)?;

        Ok(Self {
            record,
            formatted,
            strings,
            length,
        })
    }

    /// Check whether the formatted area extends past `offset`
    #[inline]
    pub fn has(&self, offset: usize) -> bool {
        self.length > offset
    }

    /// Formatted area length
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Read a scalar
    pub fn read<T: Scalar + Into<Value>>(&mut self, name: &'static str) -> DecodeResult<T> {
        self.record.read(&mut self.formatted, name)
    }

    /// Read a scalar with a symbolic name
    pub fn read_named<T: Scalar + Into<Value>>(
        &mut self,
        name: &'static str,
        namer: fn(u64) -> &'static str,
    ) -> DecodeResult<T> {
        self.record.read_named(&mut self.formatted, name, namer)
    }

    /// Read a string index and record what it resolves to
    pub fn string(&mut self, name: &'static str) -> DecodeResult<()> {
        let index = self.formatted.read::<u8>()?;
        self.record.add(name, self.strings.lookup(index));
        Ok(())
    }

    /// [`Structure::read`] when `present`, otherwise record the field absent
    pub fn read_if<T: Scalar + Into<Value>>(&mut self, present: bool, name: &'static str) -> DecodeResult<Option<T>> {
        if present {
            self.read(name).map(Some)
        } else {
            self.record.add(name, Value::Absent);
            Ok(None)
        }
    }

    /// [`Structure::string`] when `present`, otherwise record the field absent
    pub fn string_if(&mut self, present: bool, name: &'static str) -> DecodeResult<()> {
        if present {
            self.string(name)
        } else {
            self.record.add(name, Value::Absent);
            Ok(())
        }
    }

    /// Keep unread formatted bytes and attach the string set
    pub fn end(mut self) -> FieldRecord {
        self.record.finish(&mut self.formatted);
        self.record.add("strings", self.strings.strings);
        self.record
    }
}

/// Catch-all: the common header, the raw formatted area and the strings
pub(crate) fn decode_unknown(
    cursor: &mut ByteCursor<'_>,
    _: &Discriminant,
    _: &SmbiosContext,
) -> DecodeResult<FieldRecord> {
    Ok(Structure::begin(cursor, "Unknown")?.end())
}
