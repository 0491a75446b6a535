//! Bounded byte cursor over a function's code bytes
//!
//! Provides the decoder primitives the engine needs at dispatch time:
//! single bytes, LEB128 signed/unsigned integers, and raw little-endian
//! 32/64-bit words for the float constants. Both the control-flow
//! pre-indexer and the dispatcher drive one of these cursors over the same
//! immutable code slice.

use byteorder::{LittleEndian, ReadBytesExt};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ReadError {
    #[error("unexpected end of code")]
    UnexpectedEof,
    #[error("integer representation too long")]
    LebOverflow,
}

/// Cursor over a borrowed code slice
#[derive(Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader { bytes, pos: 0 }
    }

    /// Create a cursor positioned at `pos` (a frame's saved program counter)
    pub fn at(bytes: &'a [u8], pos: usize) -> Reader<'a> {
        Reader { bytes, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn has_more(&self) -> bool {
        self.pos < self.bytes.len()
    }

    pub fn read_byte(&mut self) -> Result<u8, ReadError> {
        let byte = *self.bytes.get(self.pos).ok_or(ReadError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_raw(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        let end = self.pos.checked_add(len).ok_or(ReadError::UnexpectedEof)?;
        if end > self.bytes.len() {
            return Err(ReadError::UnexpectedEof);
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Raw little-endian 32-bit word (the `f32.const` immediate)
    pub fn read_u32_raw(&mut self) -> Result<u32, ReadError> {
        let mut slice = self.read_raw(4)?;
        slice
            .read_u32::<LittleEndian>()
            .map_err(|_| ReadError::UnexpectedEof)
    }

    /// Raw little-endian 64-bit word (the `f64.const` immediate)
    pub fn read_u64_raw(&mut self) -> Result<u64, ReadError> {
        let mut slice = self.read_raw(8)?;
        slice
            .read_u64::<LittleEndian>()
            .map_err(|_| ReadError::UnexpectedEof)
    }

    /// Unsigned LEB128, at most 32 bits
    pub fn read_vu32(&mut self) -> Result<u32, ReadError> {
        let mut result: u32 = 0;
        for i in 0..5 {
            let byte = self.read_byte()?;
            result |= ((byte & 0x7f) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(ReadError::LebOverflow)
    }

    /// Signed LEB128, at most 32 bits
    pub fn read_vs32(&mut self) -> Result<i32, ReadError> {
        self.read_vs(5).map(|v| v as i32)
    }

    /// Signed LEB128, at most 64 bits
    pub fn read_vs64(&mut self) -> Result<i64, ReadError> {
        self.read_vs(10)
    }

    fn read_vs(&mut self, max_bytes: usize) -> Result<i64, ReadError> {
        let mut result: i64 = 0;
        let mut shift = 0;
        for _ in 0..max_bytes {
            let byte = self.read_byte()?;
            result |= ((byte & 0x7f) as i64) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                // Sign-extend from the final group's sign bit
                if shift < 64 && byte & 0x40 != 0 {
                    result |= -1i64 << shift;
                }
                return Ok(result);
            }
        }
        Err(ReadError::LebOverflow)
    }
}

/// Encode an unsigned LEB128 value. Used by tests and benches to assemble
/// code bytes; the engine itself only decodes.
pub fn emit_vu32(v: u32) -> Vec<u8> {
    let mut result = vec![];
    let mut value = v;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        result.push(byte);
        if value == 0 {
            return result;
        }
    }
}

/// Encode a signed LEB128 value
pub fn emit_vs64(v: i64) -> Vec<u8> {
    let mut result = vec![];
    let mut value = v;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let sign_clear = byte & 0x40 == 0;
        if (value == 0 && sign_clear) || (value == -1 && !sign_clear) {
            result.push(byte);
            return result;
        }
        result.push(byte | 0x80);
    }
}

/// Encode a signed 32-bit LEB128 value
pub fn emit_vs32(v: i32) -> Vec<u8> {
    emit_vs64(v as i64)
}
