//! # Discriminated Dispatch
//!
//! Decoding of a region made of variable-length, self-describing records
//! (subtables, resource descriptors, SMBIOS structures).
//!
//! Each record family provides a [`Registry`]: a header function that peeks
//! the record's kind and total length without consuming anything, and an
//! ordered list of [`Candidate`] decoders. For every record the dispatcher:
//!
//! 1. peeks the [`Discriminant`]
//! 2. checks `1 <= length <= remaining`
//! 3. carves a bounded sub-cursor of exactly `length` bytes
//! 4. runs the first candidate whose [`Selector`] matches
//! 5. keeps bytes the decoder did not consume as a trailing data field
//!
//! The last candidate must be a catch-all ([`Selector::Any`]) and no other
//! candidate may be one. [`Registry::new`] is a `const fn` that enforces
//! this, so a registry stored in a `static` without a trailing catch-all is
//! rejected at compile time:
//!
//! ```compile_fail
//! use firmtab_core::{Candidate, DecodeConfig, Discriminant, FieldRecord, Registry, Selector};
//! use firmtab_core::{ByteCursor, DecodeResult};
//!
//! fn header(c: &ByteCursor<'_>) -> DecodeResult<Discriminant> {
//!     Ok(Discriminant::new(c.peek::<u8>()?.into(), c.peek_at::<u8>(1)?.into()))
//! }
//! fn decode(_: &mut ByteCursor<'_>, _: &Discriminant, _: &DecodeConfig) -> DecodeResult<FieldRecord> {
//!     Ok(FieldRecord::new("One"))
//! }
//!
//! static MISSING_CATCH_ALL: Registry<DecodeConfig> = Registry::new(
//!     "example",
//!     header,
//!     &[Candidate { name: "One", selector: Selector::Kind(1), decode }],
//! );
//! ```

use crate::config::DecodeContext;
use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeResult};
use crate::record::{FieldRecord, DECODE_FAILURE};
use alloc::format;
use alloc::vec::Vec;
use core::fmt;

/// Kind of a record the catch-all could not decode either
pub const RAW_KIND: &str = "Unknown";

/// Kind and total length of one record, obtained by peeking its header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discriminant {
    /// Family-specific type code
    pub kind: u32,
    /// Total record length in bytes, header included
    pub length: usize,
}

impl Discriminant {
    /// Create a discriminant
    pub const fn new(kind: u32, length: usize) -> Self {
        Self { kind, length }
    }
}

/// Decides whether a candidate applies to a record
#[derive(Clone, Copy)]
pub enum Selector {
    /// Matches one type code
    Kind(u32),
    /// Matches when the predicate holds
    Predicate(fn(&Discriminant) -> bool),
    /// Matches everything (the catch-all)
    Any,
}

impl Selector {
    /// Check whether the selector accepts `disc`
    pub fn matches(&self, disc: &Discriminant) -> bool {
        match self {
            Self::Kind(kind) => *kind == disc.kind,
            Self::Predicate(pred) => pred(disc),
            Self::Any => true,
        }
    }

    const fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => write!(f, "Kind({:#x})", kind),
            Self::Predicate(_) => write!(f, "Predicate"),
            Self::Any => write!(f, "Any"),
        }
    }
}

/// Decoder for one record kind
///
/// The cursor is bounded to the record; the decoder reads what it knows and
/// leaves the rest to be preserved as trailing data.
pub type DecodeFn<C> = fn(&mut ByteCursor<'_>, &Discriminant, &C) -> DecodeResult<FieldRecord>;

/// Non-consuming header peek
pub type HeaderFn = fn(&ByteCursor<'_>) -> DecodeResult<Discriminant>;

/// A named decoder and the records it applies to
pub struct Candidate<C: 'static> {
    /// Record kind name, used in diagnostics
    pub name: &'static str,
    /// Applicability test
    pub selector: Selector,
    /// Decoder
    pub decode: DecodeFn<C>,
}

/// Ordered candidate list for one record family
pub struct Registry<C: 'static> {
    family: &'static str,
    header: HeaderFn,
    candidates: &'static [Candidate<C>],
}

impl<C: 'static> fmt::Debug for Candidate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl<C: 'static> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("family", &self.family)
            .field("candidates", &self.candidates)
            .finish_non_exhaustive()
    }
}

impl<C: 'static> Registry<C> {
    /// Define a registry
    ///
    /// # Panics
    ///
    /// Panics (at compile time when used in a `const` or `static`) if
    /// `candidates` is empty, if the last candidate is not a catch-all, or
    /// if an earlier candidate is one.
    pub const fn new(family: &'static str, header: HeaderFn, candidates: &'static [Candidate<C>]) -> Self {
        assert!(!candidates.is_empty(), "registry needs at least a catch-all candidate");
        let last = candidates.len() - 1;
        let mut i = 0;
        while i < last {
            assert!(!candidates[i].selector.is_any(), "catch-all candidate must come last");
            i += 1;
        }
        assert!(candidates[last].selector.is_any(), "registry must end with a catch-all candidate");
        Self {
            family,
            header,
            candidates,
        }
    }

    /// Family name
    #[inline]
    pub fn family(&self) -> &'static str {
        self.family
    }

    /// Candidates in selection order
    #[inline]
    pub fn candidates(&self) -> &'static [Candidate<C>] {
        self.candidates
    }

    /// The trailing catch-all candidate
    #[inline]
    pub fn catch_all(&self) -> &'static Candidate<C> {
        &self.candidates[self.candidates.len() - 1]
    }

    /// First candidate accepting `disc`
    pub fn select(&self, disc: &Discriminant) -> &'static Candidate<C> {
        self.candidates
            .iter()
            .find(|c| c.selector.matches(disc))
            .unwrap_or_else(|| self.catch_all())
    }

    /// Peek the discriminant of the record at the cursor
    #[inline]
    pub fn peek(&self, cursor: &ByteCursor<'_>) -> DecodeResult<Discriminant> {
        (self.header)(cursor)
    }
}

/// Decode records until `cursor` is exhausted, appending them to `out`
///
/// Records decoded before an error stay in `out`, so callers running in
/// best-effort mode keep the partial chain.
pub fn dispatch_into<C: DecodeContext + 'static>(
    cursor: &mut ByteCursor<'_>,
    registry: &Registry<C>,
    ctx: &C,
    out: &mut Vec<FieldRecord>,
) -> DecodeResult<()> {
    dispatch_until(cursor, registry, ctx, out, |_| false)
}

/// [`dispatch_into`] that also stops right after a record whose
/// discriminant satisfies `last`
///
/// Families with an explicit terminator (the SMBIOS end-of-table
/// structure) use this so padding after the terminator is left alone.
pub fn dispatch_until<C: DecodeContext + 'static>(
    cursor: &mut ByteCursor<'_>,
    registry: &Registry<C>,
    ctx: &C,
    out: &mut Vec<FieldRecord>,
    last: impl Fn(&Discriminant) -> bool,
) -> DecodeResult<()> {
    while !cursor.at_end() {
        let disc = match registry.peek(cursor) {
            Ok(disc) => disc,
            Err(DecodeError::BufferUnderrun { .. }) => {
                // Not even a full header left
                return Err(DecodeError::MalformedLength {
                    offset: cursor.position(),
                    length: cursor.remaining(),
                    available: cursor.remaining(),
                });
            }
            Err(err) => return Err(err),
        };

        if disc.length == 0 || disc.length > cursor.remaining() {
            log::debug!(
                "{}: record kind {:#x} at {:#x} declares {} bytes, {} left",
                registry.family,
                disc.kind,
                cursor.position(),
                disc.length,
                cursor.remaining()
            );
            return Err(DecodeError::MalformedLength {
                offset: cursor.position(),
                length: disc.length,
                available: cursor.remaining(),
            });
        }

        let mut region = cursor.take(disc.length)?;
        out.push(decode_record(&mut region, &disc, registry, ctx)?);
        if last(&disc) {
            break;
        }
    }
    Ok(())
}

/// Decode every record in `cursor`
pub fn dispatch<C: DecodeContext + 'static>(
    cursor: &mut ByteCursor<'_>,
    registry: &Registry<C>,
    ctx: &C,
) -> DecodeResult<Vec<FieldRecord>> {
    let mut records = Vec::new();
    dispatch_into(cursor, registry, ctx, &mut records)?;
    Ok(records)
}

/// Decode every record in `cursor` into the list field `name` of `record`
///
/// The field is added even when the pass aborts, holding the records
/// decoded up to the failure; the error is still returned.
pub fn dispatch_to_field<C: DecodeContext + 'static>(
    record: &mut FieldRecord,
    name: &'static str,
    cursor: &mut ByteCursor<'_>,
    registry: &Registry<C>,
    ctx: &C,
) -> DecodeResult<()> {
    let mut records = Vec::new();
    let result = dispatch_into(cursor, registry, ctx, &mut records);
    record.add(name, records);
    result
}

/// Decode one bounded record with the selected candidate
///
/// In best-effort mode a failing candidate is replaced by the catch-all
/// decode of the same bytes, tagged with a failure field. When the region
/// is too short even for the catch-all, the record keeps only the raw
/// bytes.
pub fn decode_record<C: DecodeContext + 'static>(
    region: &mut ByteCursor<'_>,
    disc: &Discriminant,
    registry: &Registry<C>,
    ctx: &C,
) -> DecodeResult<FieldRecord> {
    let candidate = registry.select(disc);
    let snapshot = region.clone();

    let err = match (candidate.decode)(region, disc, ctx) {
        Ok(mut record) => {
            record.finish(region);
            return Ok(record);
        }
        Err(err) if ctx.config().is_strict() => return Err(err),
        Err(err) => err,
    };

    log::warn!(
        "{}: {} record at {:#x} failed ({}), using catch-all",
        registry.family,
        candidate.name,
        snapshot.position(),
        err
    );
    let fallback = if candidate.selector.is_any() {
        None
    } else {
        let mut retry = snapshot.clone();
        (registry.catch_all().decode)(&mut retry, disc, ctx).ok().map(|mut record| {
            record.finish(&mut retry);
            record
        })
    };
    let mut record = fallback.unwrap_or_else(|| raw_record(snapshot));
    record.add(DECODE_FAILURE, format!("{}: {}", candidate.name, err));
    Ok(record)
}

/// Record holding nothing but the region's bytes
fn raw_record(mut region: ByteCursor<'_>) -> FieldRecord {
    let mut record = FieldRecord::new(RAW_KIND);
    record.finish(&mut region);
    record
}
