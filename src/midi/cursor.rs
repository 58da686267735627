//! Sequential byte reader over a MIDI buffer.

use crate::error::PianoDjError;

/// Reads big-endian integers and variable-length quantities from a fixed buffer.
///
/// Every read is bounds-checked; running past the end yields a
/// [`PianoDjError::Format`] carrying the offending offset.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8, PianoDjError> {
        let byte = *self
            .data
            .get(self.position)
            .ok_or_else(|| self.truncated(1))?;
        self.position += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], PianoDjError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.truncated(len))?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), PianoDjError> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u16_be(&mut self) -> Result<u16, PianoDjError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u24_be(&mut self) -> Result<u32, PianoDjError> {
        let b = self.read_bytes(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, PianoDjError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a variable-length quantity: 7 bits per byte, high bit set on
    /// every byte except the last. No length cap beyond the buffer itself;
    /// bits shifted past 64 are discarded.
    pub fn read_vlq(&mut self) -> Result<u64, PianoDjError> {
        let mut value: u64 = 0;
        loop {
            let byte = self.read_u8()?;
            value = (value << 7) | u64::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
    }

    /// Read a 4-byte ASCII chunk id and compare it with `expected`.
    pub fn expect_tag(&mut self, expected: &[u8; 4], message: &str) -> Result<(), PianoDjError> {
        let start = self.position;
        match self.read_bytes(4) {
            Ok(tag) if tag == expected => Ok(()),
            _ => Err(PianoDjError::format(start, message)),
        }
    }

    fn truncated(&self, wanted: usize) -> PianoDjError {
        PianoDjError::format(
            self.position,
            format!(
                "unexpected end of data (needed {} byte(s), {} left)",
                wanted,
                self.remaining()
            ),
        )
    }
}
