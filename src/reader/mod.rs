#![doc = r#"
A cursor over an in-memory MIDI file.

Every multi-byte field of a Standard MIDI File is big-endian. Delta times and
event lengths are variable length quantities (VLQ): seven bits per byte, most
significant group first, with the top bit set on every byte except the last.
"#]

mod error;
pub use error::*;

use crate::ParseError;

/// Reads fixed-width fields and VLQs from a byte slice, tracking its position.
#[derive(Debug, Clone)]
pub struct Reader<'slc> {
    data: &'slc [u8],
    position: usize,
    chunk: Option<usize>,
}

impl<'slc> Reader<'slc> {
    /// Create a reader positioned at the start of `data`
    pub const fn from_byte_slice(data: &'slc [u8]) -> Self {
        Self {
            data,
            position: 0,
            chunk: None,
        }
    }

    /// Current offset into the buffer
    pub const fn buffer_position(&self) -> usize {
        self.position
    }

    /// Total length of the underlying buffer
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the underlying buffer holds no bytes at all
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the cursor and the end of the buffer
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// True once every byte has been consumed
    pub const fn is_at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Move the cursor to an absolute offset.
    ///
    /// The offset may lie past the end of the buffer; the next read then fails.
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Index of the track chunk currently being read, used for error context
    pub const fn chunk(&self) -> Option<usize> {
        self.chunk
    }

    pub(crate) fn set_chunk(&mut self, chunk: Option<usize>) {
        self.chunk = chunk;
    }

    fn oob(&self) -> ReaderError {
        ReaderError::oob(self.position).in_chunk(self.chunk)
    }

    /// Read `N` bytes into an array
    pub fn read_exact_size<const N: usize>(&mut self) -> ReadResult<[u8; N]> {
        let slice = self.read_raw(N)?;
        let mut out = [0; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Returns the next byte without consuming it
    pub fn peek_u8(&self) -> ReadResult<u8> {
        self.data.get(self.position).copied().ok_or_else(|| self.oob())
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> ReadResult<u8> {
        let byte = self.peek_u8()?;
        self.position += 1;
        Ok(byte)
    }

    /// Read a big-endian `u16`
    pub fn read_u16_be(&mut self) -> ReadResult<u16> {
        self.read_exact_size().map(u16::from_be_bytes)
    }

    /// Read a big-endian `u32`
    pub fn read_u32_be(&mut self) -> ReadResult<u32> {
        self.read_exact_size().map(u32::from_be_bytes)
    }

    /// Read a variable length quantity.
    ///
    /// A quantity whose continuation bit never clears runs into the end of the
    /// buffer and fails as out of bounds.
    pub fn read_vlq(&mut self) -> ReadResult<u32> {
        let mut value: u64 = 0;
        loop {
            let byte = self.read_u8()?;
            value = (value << 7) | u64::from(byte & 0x7F);
            if value > u64::from(u32::MAX) {
                return Err(inv_data(self, ParseError::VlqOverflow));
            }
            if byte & 0x80 == 0 {
                // checked against u32::MAX above
                return Ok(value as u32);
            }
        }
    }

    /// Borrow the next `len` bytes and advance past them
    pub fn read_raw(&mut self, len: usize) -> ReadResult<&'slc [u8]> {
        let end = self.position.checked_add(len).ok_or_else(|| self.oob())?;
        let slice = self.data.get(self.position..end).ok_or_else(|| self.oob())?;
        self.position = end;
        Ok(slice)
    }
}
