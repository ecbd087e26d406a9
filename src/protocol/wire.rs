//! Little-endian wire primitives for the find_closest protocol.
//!
//! [`WireWriter`] appends fixed-width values to an in-memory buffer and
//! [`WireReader`] reads them back with bounds checks. Every read that would
//! run past the end of the buffer fails with
//! [`VecfindError::TruncatedResponse`] instead of panicking.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{Result, VecfindError};

/// A writer for protocol payloads.
#[derive(Debug, Default)]
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    /// Create a new empty writer.
    pub fn new() -> Self {
        WireWriter { buffer: Vec::new() }
    }

    /// Create a writer with a preallocated buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        WireWriter {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.buffer.write_u8(value)?;
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.buffer.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a f64 value (little-endian).
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.buffer.write_f64::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write `count` zero bytes.
    pub fn write_zeros(&mut self, count: usize) {
        self.buffer.resize(self.buffer.len() + count, 0);
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) {
        self.buffer.extend_from_slice(value);
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    /// Borrow the bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the encoded bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

/// A bounds-checked reader over an encoded payload.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader positioned at the start of `buffer`.
    pub fn new(buffer: &'a [u8]) -> Self {
        WireReader {
            buffer,
            position: 0,
        }
    }

    /// Create a reader positioned at `offset`.
    pub fn at(buffer: &'a [u8], offset: usize) -> Self {
        WireReader {
            buffer,
            position: offset,
        }
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1, "u8")?[0])
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, "u32")?))
    }

    /// Read a f64 value (little-endian).
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.take(8, "f64")?))
    }

    /// Read exact number of raw bytes.
    pub fn read_raw(&mut self, length: usize) -> Result<&'a [u8]> {
        self.take(length, "raw bytes")
    }

    /// Skip `length` bytes.
    pub fn skip(&mut self, length: usize) -> Result<()> {
        self.take(length, "padding").map(|_| ())
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Check if the whole buffer has been consumed.
    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, length: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(length)
            .filter(|&end| end <= self.buffer.len())
            .ok_or_else(|| {
                VecfindError::truncated_response(format!(
                    "reading {what} ({length} bytes) at offset {} of {}-byte buffer",
                    self.position,
                    self.buffer.len()
                ))
            })?;
        let slice = &self.buffer[self.position..end];
        self.position = end;
        Ok(slice)
    }
}
