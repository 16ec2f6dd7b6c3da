//! # Byte Cursor
//!
//! A sequential little-endian reader over an immutable byte slice.
//!
//! Cursors never copy: [`ByteCursor::take`] carves a bounded child view out
//! of the parent and advances the parent past it, so a decoder handed a
//! child can never read outside its record. Every view remembers its
//! absolute position in the outermost buffer for error reporting.

use crate::error::{DecodeError, DecodeResult};
use alloc::vec::Vec;

/// A fixed-size value that can be decoded from little-endian bytes
pub trait Scalar: Sized + Copy {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Decode from exactly [`Self::SIZE`] bytes
    fn from_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                #[inline]
                fn from_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; core::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64);

/// Fixed-length character or byte strings
impl<const N: usize> Scalar for [u8; N] {
    const SIZE: usize = N;

    #[inline]
    fn from_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; N];
        buf.copy_from_slice(bytes);
        buf
    }
}

/// Sequential reader over a byte slice
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
    /// Absolute position of `data[0]` in the outermost buffer
    base: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of `data`
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            base: 0,
        }
    }

    /// Create a cursor whose positions are reported relative to `base`
    pub const fn with_base(data: &'a [u8], base: usize) -> Self {
        Self {
            data,
            offset: 0,
            base,
        }
    }

    /// Bytes `[offset + skip, offset + skip + len)` without moving
    fn window(&self, skip: usize, len: usize) -> DecodeResult<&'a [u8]> {
        let data = self.data;
        self.offset
            .checked_add(skip)
            .and_then(|start| Some(start..start.checked_add(len)?))
            .and_then(|range| data.get(range))
            .ok_or_else(|| DecodeError::BufferUnderrun {
                offset: self.position(),
                needed: skip.saturating_add(len),
                available: self.remaining(),
            })
    }

    /// Read a value and advance past it
    pub fn read<T: Scalar>(&mut self) -> DecodeResult<T> {
        let value = self.peek::<T>()?;
        self.offset += T::SIZE;
        Ok(value)
    }

    /// Read `count` consecutive values
    pub fn read_n<T: Scalar>(&mut self, count: usize) -> DecodeResult<Vec<T>> {
        let needed = count.checked_mul(T::SIZE).unwrap_or(usize::MAX);
        self.window(0, needed)?;
        (0..count).map(|_| self.read::<T>()).collect()
    }

    /// Read values until fewer than `T::SIZE` bytes remain
    pub fn read_all<T: Scalar>(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.remaining() / T::SIZE);
        while let Ok(value) = self.read::<T>() {
            values.push(value);
        }
        values
    }

    /// Decode the next value without advancing
    pub fn peek<T: Scalar>(&self) -> DecodeResult<T> {
        self.peek_at(0)
    }

    /// Decode a value `skip` bytes ahead without advancing
    pub fn peek_at<T: Scalar>(&self, skip: usize) -> DecodeResult<T> {
        self.window(skip, T::SIZE).map(T::from_le)
    }

    /// Carve a child cursor over the next `n` bytes and advance past them
    pub fn take(&mut self, n: usize) -> DecodeResult<ByteCursor<'a>> {
        let data = self.window(0, n)?;
        let child = ByteCursor::with_base(data, self.position());
        self.offset += n;
        Ok(child)
    }

    /// Borrow the next `n` bytes and advance past them
    pub fn raw(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let data = self.window(0, n)?;
        self.offset += n;
        Ok(data)
    }

    /// Borrow everything left and move to the end
    pub fn rest(&mut self) -> &'a [u8] {
        let data = self.peek_rest();
        self.offset = self.data.len();
        data
    }

    /// Borrow everything left without advancing
    pub fn peek_rest(&self) -> &'a [u8] {
        let data = self.data;
        &data[self.offset..]
    }

    /// Advance past `n` bytes of padding
    pub fn skip(&mut self, n: usize) -> DecodeResult<()> {
        self.window(0, n)?;
        self.offset += n;
        Ok(())
    }

    /// Check whether the cursor has been fully consumed
    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Bytes left to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Offset within this view
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Absolute position in the outermost buffer
    #[inline]
    pub fn position(&self) -> usize {
        self.base + self.offset
    }

    /// Total length of this view
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the view is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole view, regardless of the current offset
    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }
}
