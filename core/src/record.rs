//! # Field Records
//!
//! A [`FieldRecord`] is the decoded form of one table, subtable or
//! structure: an ordered list of uniquely named [`Value`]s, each with an
//! optional display [`Hint`]. Records nest through [`Value::Record`] and
//! [`Value::Records`].

use crate::cursor::{ByteCursor, Scalar};
use crate::error::{DecodeError, DecodeResult};
use crate::bits;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use uuid::Uuid;

/// Name of the field holding a catch-all fallback diagnostic
pub const DECODE_FAILURE: &str = "decode_failure";

/// Name of the field holding unconsumed trailing bytes
pub const TRAILING_DATA: &str = "data";

/// A resolved SMBIOS-style string reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringRef {
    /// Index 0: the structure has no string for this field
    None,
    /// The referenced string
    Text {
        /// 1-based string index
        index: u8,
        /// String contents
        text: String,
    },
    /// The index points past the structure's string set
    OutOfRange {
        /// 1-based string index
        index: u8,
        /// Number of strings actually present
        count: usize,
    },
}

impl StringRef {
    /// The referenced text, if it resolved
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A decoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// The field is not present at this revision or length
    Absent,
    /// Single flag bit
    Bool(bool),
    /// 8-bit scalar
    U8(u8),
    /// 16-bit scalar
    U16(u16),
    /// 32-bit scalar
    U32(u32),
    /// 64-bit scalar
    U64(u64),
    /// Opaque bytes or fixed-length character string
    Bytes(Vec<u8>),
    /// Diagnostic or derived text
    Text(String),
    /// UUID
    Uuid(Uuid),
    /// String reference into a string set
    StringRef(StringRef),
    /// List of strings
    Strings(Vec<String>),
    /// List of scalars
    Ints(Vec<u64>),
    /// Nested record
    Record(FieldRecord),
    /// Ordered list of nested records
    Records(Vec<FieldRecord>),
}

impl Value {
    /// Build a scalar list from any unsigned integers
    pub fn ints<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<u64>,
    {
        Self::Ints(values.into_iter().map(Into::into).collect())
    }

    /// The value as an unsigned integer, if it is a scalar or flag
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Bool(b) => Some(u64::from(b)),
            Self::U8(v) => Some(u64::from(v)),
            Self::U16(v) => Some(u64::from(v)),
            Self::U32(v) => Some(u64::from(v)),
            Self::U64(v) => Some(v),
            _ => None,
        }
    }

    /// Check whether the value is [`Value::Absent`]
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    Vec<u8> => Bytes,
    String => Text,
    Uuid => Uuid,
    StringRef => StringRef,
    Vec<String> => Strings,
    FieldRecord => Record,
    Vec<FieldRecord> => Records,
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Value {
    fn from(v: [u8; N]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(String::from(v))
    }
}

/// Gated fields decode to `Some` when present and `None` when not
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Absent, Into::into)
    }
}

/// How a value should be rendered
#[derive(Debug, Clone, Copy)]
pub enum Hint {
    /// Decimal integer
    Decimal,
    /// Hexadecimal integer
    Hex,
    /// Printable ASCII text
    Ascii,
    /// Hex dump
    Dump,
    /// Bits `hi..=lo` of another field
    Bits {
        /// Field the bits come from
        source: &'static str,
        /// Highest bit (inclusive)
        hi: u32,
        /// Lowest bit
        lo: u32,
    },
    /// Integer with a symbolic name
    Named(fn(u64) -> &'static str),
    /// Integer with a unit suffix
    Unit(&'static str),
}

/// A named value inside a [`FieldRecord`]
#[derive(Debug, Clone)]
pub struct Field {
    /// Field name, unique within its record
    pub name: &'static str,
    /// Decoded value
    pub value: Value,
    /// Display hint
    pub hint: Option<Hint>,
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl Eq for Field {}

/// Ordered collection of named, decoded values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    kind: &'static str,
    fields: Vec<Field>,
}

impl FieldRecord {
    /// Create an empty record of the given kind
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    /// Record kind (table signature or subtable name)
    #[inline]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Fields in insertion order
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check whether the record has no fields
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Add a field, reporting a duplicate name as an error
    pub fn try_add(
        &mut self,
        name: &'static str,
        value: impl Into<Value>,
        hint: Option<Hint>,
    ) -> DecodeResult<&mut Self> {
        if self.contains(name) {
            return Err(DecodeError::DuplicateFieldName {
                record: self.kind,
                field: name,
            });
        }
        self.fields.push(Field {
            name,
            value: value.into(),
            hint,
        });
        Ok(self)
    }

    /// Add a field with a display hint
    ///
    /// # Panics
    ///
    /// Panics if `name` is already present. Field names are fixed by the
    /// decoder, so a duplicate is a programming error.
    pub fn add_hinted(&mut self, name: &'static str, value: impl Into<Value>, hint: Hint) -> &mut Self {
        self.insert(name, value.into(), Some(hint))
    }

    /// Add a field
    ///
    /// # Panics
    ///
    /// Panics if `name` is already present.
    pub fn add(&mut self, name: &'static str, value: impl Into<Value>) -> &mut Self {
        self.insert(name, value.into(), None)
    }

    fn insert(&mut self, name: &'static str, value: Value, hint: Option<Hint>) -> &mut Self {
        if let Err(err) = self.try_add(name, value, hint) {
            panic!("{}", err);
        }
        self
    }

    /// Builder form of [`FieldRecord::add`]
    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.add(name, value);
        self
    }

    /// Read a scalar from `cursor`, record it under `name` and return it
    pub fn read<T>(&mut self, cursor: &mut ByteCursor<'_>, name: &'static str) -> DecodeResult<T>
    where
        T: Scalar + Into<Value>,
    {
        let value = cursor.read::<T>()?;
        self.add(name, value);
        Ok(value)
    }

    /// [`FieldRecord::read`] with a display hint
    pub fn read_hinted<T>(
        &mut self,
        cursor: &mut ByteCursor<'_>,
        name: &'static str,
        hint: Hint,
    ) -> DecodeResult<T>
    where
        T: Scalar + Into<Value>,
    {
        let value = cursor.read::<T>()?;
        self.add_hinted(name, value, hint);
        Ok(value)
    }

    /// [`FieldRecord::read`] for an integer with a symbolic name
    pub fn read_named<T>(
        &mut self,
        cursor: &mut ByteCursor<'_>,
        name: &'static str,
        namer: fn(u64) -> &'static str,
    ) -> DecodeResult<T>
    where
        T: Scalar + Into<Value>,
    {
        self.read_hinted(cursor, name, Hint::Named(namer))
    }

    /// Record bits `hi..=lo` of the value read from field `source`
    pub fn add_bits(
        &mut self,
        name: &'static str,
        source: &'static str,
        value: u64,
        hi: u32,
        lo: u32,
    ) -> &mut Self {
        self.add_hinted(name, bits::extract(value, hi, lo), Hint::Bits { source, hi, lo })
    }

    /// Record bit `n` of the value read from field `source` as a flag
    pub fn add_flag(&mut self, name: &'static str, source: &'static str, value: u64, n: u32) -> &mut Self {
        self.add_hinted(name, bits::flag(value, n), Hint::Bits { source, hi: n, lo: n })
    }

    /// Record an integer together with its symbolic name
    pub fn add_named(
        &mut self,
        name: &'static str,
        value: impl Into<Value>,
        namer: fn(u64) -> &'static str,
    ) -> &mut Self {
        self.add_hinted(name, value, Hint::Named(namer))
    }

    /// Preserve any unconsumed bytes of `cursor` as the trailing data field
    pub fn finish(&mut self, cursor: &mut ByteCursor<'_>) -> &mut Self {
        if !cursor.at_end() {
            let data = cursor.rest();
            if self.contains(TRAILING_DATA) {
                log::debug!("{}: {} trailing bytes after data field", self.kind, data.len());
            } else {
                self.add_hinted(TRAILING_DATA, data, Hint::Dump);
            }
        }
        self
    }

    /// Check whether a field is present
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Look up a field
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).map(|f| &f.value)
    }

    /// Look up a scalar or flag value as `u64`
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    /// Look up a flag value
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Look up a byte string
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        match self.get(name)? {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Look up a text value
    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Look up a nested record
    pub fn get_record(&self, name: &str) -> Option<&FieldRecord> {
        match self.get(name)? {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Look up a list of nested records
    pub fn get_records(&self, name: &str) -> Option<&[FieldRecord]> {
        match self.get(name)? {
            Value::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Look up a scalar list
    pub fn get_ints(&self, name: &str) -> Option<&[u64]> {
        match self.get(name)? {
            Value::Ints(values) => Some(values),
            _ => None,
        }
    }

    /// Check whether a field is present but marked absent
    pub fn is_absent(&self, name: &str) -> bool {
        self.get(name).is_some_and(Value::is_absent)
    }

    /// Check whether this record was produced by a fallback decode
    pub fn failed(&self) -> bool {
        self.contains(DECODE_FAILURE)
    }

    /// Check whether this record or any nested record fell back
    pub fn any_failed(&self) -> bool {
        self.failed()
            || self.fields.iter().any(|f| match &f.value {
                Value::Record(r) => r.any_failed(),
                Value::Records(rs) => rs.iter().any(FieldRecord::any_failed),
                _ => false,
            })
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.kind, indent = depth * 2)?;
        for field in &self.fields {
            let indent = (depth + 1) * 2;
            match &field.value {
                Value::Record(record) => {
                    writeln!(f, "{:indent$}{}:", "", field.name, indent = indent)?;
                    record.fmt_indented(f, depth + 2)?;
                }
                Value::Records(records) => {
                    writeln!(f, "{:indent$}{}: [{}]", "", field.name, records.len(), indent = indent)?;
                    for record in records {
                        record.fmt_indented(f, depth + 2)?;
                    }
                }
                value => {
                    write!(f, "{:indent$}{} = ", "", field.name, indent = indent)?;
                    fmt_value(f, value, field.hint)?;
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}

fn fmt_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8], hint: Option<Hint>) -> fmt::Result {
    let printable = bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ');
    match hint {
        Some(Hint::Ascii) => write!(f, "'{}'", crate::signature_str(bytes)),
        None if printable && !bytes.is_empty() => write!(f, "'{}'", crate::signature_str(bytes)),
        _ => {
            for (i, b) in bytes.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:02x}", b)?;
            }
            Ok(())
        }
    }
}

fn fmt_value(f: &mut fmt::Formatter<'_>, value: &Value, hint: Option<Hint>) -> fmt::Result {
    if let Some(n) = value.as_u64() {
        return match hint {
            Some(Hint::Decimal) => write!(f, "{}", n),
            Some(Hint::Named(namer)) => write!(f, "{:#x} ({})", n, namer(n)),
            Some(Hint::Unit(unit)) => write!(f, "{} {}", n, unit),
            _ if matches!(value, Value::Bool(_)) => write!(f, "{}", n != 0),
            _ => write!(f, "{:#x}", n),
        };
    }
    match value {
        Value::Absent => write!(f, "(absent)"),
        Value::Bytes(bytes) => fmt_bytes(f, bytes, hint),
        Value::Text(text) => write!(f, "{}", text),
        Value::Uuid(uuid) => write!(f, "{}", uuid),
        Value::StringRef(StringRef::None) => write!(f, "(none)"),
        Value::StringRef(StringRef::Text { text, .. }) => write!(f, "'{}'", text),
        Value::StringRef(StringRef::OutOfRange { index, count }) => {
            write!(f, "(string {} out of range, {} present)", index, count)
        }
        Value::Strings(strings) => {
            for (i, s) in strings.iter().enumerate() {
                write!(f, "{}'{}'", if i > 0 { ", " } else { "" }, s)?;
            }
            Ok(())
        }
        Value::Ints(values) => {
            write!(f, "[")?;
            for (i, v) in values.iter().enumerate() {
                write!(f, "{}{:#x}", if i > 0 { ", " } else { "" }, v)?;
            }
            write!(f, "]")
        }
        _ => Ok(()),
    }
}

impl fmt::Display for FieldRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
