//! Little-endian reader and writer over wire buffers

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::schema::ScalarKind;

use super::CodecErrorKind;

/// Bounds-checked cursor over a borrowed input buffer
///
/// The reader never outlives the decode call that created it; nothing it
/// returns is retained past that call except by copying.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> WireReader<'a> {
    /// Reader positioned at the start of `buf`
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self::nested(buf, 0)
    }

    /// Reader over a sub-region that starts at absolute offset `base`
    pub(crate) fn nested(buf: &'a [u8], base: usize) -> Self {
        Self { buf, pos: 0, base }
    }

    /// Absolute offset of the next byte
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes left
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Ensure `needed` more bytes are available
    pub fn require(&self, needed: usize) -> Result<(), CodecErrorKind> {
        if self.remaining() < needed {
            return Err(CodecErrorKind::TruncatedInput {
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Borrow the next `len` bytes
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], CodecErrorKind> {
        self.require(len)?;
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Skip `len` bytes
    pub fn skip(&mut self, len: usize) -> Result<(), CodecErrorKind> {
        self.take(len).map(|_| ())
    }

    /// Read one integer, zero-extended to its raw 64-bit pattern
    pub fn read_scalar(&mut self, kind: ScalarKind) -> Result<u64, CodecErrorKind> {
        let mut bytes = self.take(kind.width())?;
        let raw = match kind.width() {
            1 => u64::from(bytes.get_u8()),
            2 => u64::from(bytes.get_u16_le()),
            4 => u64::from(bytes.get_u32_le()),
            _ => bytes.get_u64_le(),
        };
        Ok(raw)
    }
}

/// Append-only encoder buffer
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    /// Empty writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer with preallocated capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write the low `kind.width()` bytes of `raw`, little-endian
    #[allow(clippy::cast_possible_truncation)]
    pub fn put_scalar(&mut self, kind: ScalarKind, raw: u64) {
        match kind.width() {
            1 => self.buf.put_u8(raw as u8),
            2 => self.buf.put_u16_le(raw as u16),
            4 => self.buf.put_u32_le(raw as u32),
            _ => self.buf.put_u64_le(raw),
        }
    }

    /// Write raw bytes
    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Write `len` zero bytes
    pub fn put_zeros(&mut self, len: usize) {
        self.buf.put_bytes(0, len);
    }

    /// Freeze the written bytes
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}
