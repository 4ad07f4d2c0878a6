//! Bounds-checked big-endian reads over an input buffer
//!
//! Every payload extraction in the decoder goes through [`ByteCursor::slice`]; the
//! fixed-width reads are built on top of it, so no read can extend past the buffer.

use crate::types::OutOfBounds;
use byteorder::{BigEndian, ByteOrder};

/// Read view over a byte buffer with an explicit position
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at offset 0
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the position forward, saturating at the end of the buffer
    pub fn advance(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.buf.len());
    }

    /// Total buffer length
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes available from `at` to the end of the buffer (0 if `at` is past the end)
    pub fn remaining(&self, at: usize) -> usize {
        self.buf.len().saturating_sub(at)
    }

    /// Borrow `len` bytes starting at `at`
    pub fn slice(&self, at: usize, len: usize) -> Result<&'a [u8], OutOfBounds> {
        let end = at.checked_add(len).ok_or(OutOfBounds {
            offset: at,
            len,
            available: self.buf.len(),
        })?;
        self.buf.get(at..end).ok_or(OutOfBounds {
            offset: at,
            len,
            available: self.buf.len(),
        })
    }

    /// Everything from `at` to the end of the buffer (empty if `at` is past the end)
    pub fn tail(&self, at: usize) -> &'a [u8] {
        self.buf.get(at..).unwrap_or(&[])
    }

    pub fn read_u8(&self, at: usize) -> Result<u8, OutOfBounds> {
        Ok(self.slice(at, 1)?[0])
    }

    pub fn read_u16(&self, at: usize) -> Result<u16, OutOfBounds> {
        Ok(BigEndian::read_u16(self.slice(at, 2)?))
    }

    /// 24-bit big-endian value
    pub fn read_u24(&self, at: usize) -> Result<u32, OutOfBounds> {
        Ok(BigEndian::read_u24(self.slice(at, 3)?))
    }

    pub fn read_u32(&self, at: usize) -> Result<u32, OutOfBounds> {
        Ok(BigEndian::read_u32(self.slice(at, 4)?))
    }

    pub fn read_u64(&self, at: usize) -> Result<u64, OutOfBounds> {
        Ok(BigEndian::read_u64(self.slice(at, 8)?))
    }

    pub fn read_i16(&self, at: usize) -> Result<i16, OutOfBounds> {
        Ok(BigEndian::read_i16(self.slice(at, 2)?))
    }

    pub fn read_i32(&self, at: usize) -> Result<i32, OutOfBounds> {
        Ok(BigEndian::read_i32(self.slice(at, 4)?))
    }

    /// IEEE-754 single precision value
    pub fn read_f32(&self, at: usize) -> Result<f32, OutOfBounds> {
        Ok(BigEndian::read_f32(self.slice(at, 4)?))
    }
}
