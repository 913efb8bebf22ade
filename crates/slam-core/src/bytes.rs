//! Byte buffer utilities for parsing binary data.
//!
//! `ByteBuffer` is a position-tracking little-endian reader shared by the
//! KeyValue decoder, the app info reader and the callback parameter decoders.

use encoding_rs::UTF_8;
use tracing::debug;

use crate::error::{Error, Result};

/// A position-tracking byte reader for parsing binary data structures.
///
/// # Example
///
/// ```
/// use slam_core::bytes::ByteBuffer;
///
/// let data = [0x78, 0x56, 0x34, 0x12, b'h', b'i', 0x00];
/// let mut buf = ByteBuffer::new(&data);
///
/// assert_eq!(buf.read_i32().unwrap(), 0x12345678);
/// assert_eq!(buf.read_cstring().unwrap(), "hi");
/// assert_eq!(buf.position(), 7);
/// ```
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Creates a new `ByteBuffer` wrapping the given byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of bytes remaining from the current position.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Sets the current read position.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is beyond the buffer length.
    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::MalformedData {
                position: pos,
                message: format!("Position {} exceeds buffer length {}", pos, self.data.len()),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Skips the specified number of bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        let target = self.pos.checked_add(count).ok_or_else(|| Error::MalformedData {
            position: self.pos,
            message: "Position overflow".to_string(),
        })?;
        self.set_position(target)
    }

    /// Reads an unsigned 8-bit integer and advances the position.
    pub fn read_u8(&mut self) -> Result<u8> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    /// Reads a one-byte native boolean (any non-zero value is true).
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a signed 32-bit integer (little-endian) and advances the position.
    pub fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads an unsigned 32-bit integer (little-endian) and advances the position.
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a signed 64-bit integer (little-endian) and advances the position.
    pub fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.read_bytes(8)?;
        Ok(i64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Reads an unsigned 64-bit integer (little-endian) and advances the position.
    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Reads a 32-bit IEEE float (little-endian) and advances the position.
    pub fn read_f32(&mut self) -> Result<f32> {
        let bytes = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads the specified number of bytes and advances the position.
    ///
    /// # Errors
    ///
    /// Returns an error if there are not enough bytes remaining.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .ok_or_else(|| Error::MalformedData {
                position: self.pos,
                message: "Position overflow".to_string(),
            })?;

        if end > self.data.len() {
            return Err(Error::MalformedData {
                position: self.pos,
                message: format!(
                    "Read of {} bytes at position {} exceeds buffer length {}",
                    count,
                    self.pos,
                    self.data.len()
                ),
            });
        }

        let result = &self.data[self.pos..end];
        self.pos = end;
        Ok(result)
    }

    /// Reads a null-terminated UTF-8 string and advances past the terminator.
    ///
    /// A single 0x00 byte terminates the string.
    ///
    /// # Errors
    ///
    /// Returns `MalformedData` if the data ends before a terminator. The
    /// position is left unchanged in that case.
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(Error::MalformedData {
                position: self.pos,
                message: format!("Unterminated string at position {}", self.pos),
            });
        };
        let text = decode_utf8(&rest[..len]);
        self.pos += len + 1;
        Ok(text)
    }
}

/// Decodes UTF-8 bytes to `String`, stopping at the first null byte.
///
/// Malformed sequences are replaced rather than rejected; vendor data is not
/// guaranteed to be clean UTF-8.
pub fn decode_utf8(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let bytes = &bytes[..len];

    let (decoded, had_errors) = UTF_8.decode_without_bom_handling(bytes);
    if had_errors {
        debug!(
            "UTF-8 decoding had errors for bytes: {:?}",
            &bytes[..bytes.len().min(20)]
        );
    }
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_buffer_sequential_reads() {
        let data = [
            0x01, 0x00, 0x00, 0x00, // i32: 1
            0x02, 0x00, 0x00, 0x00, // u32: 2
            0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // u64: 3
        ];
        let mut buf = ByteBuffer::new(&data);

        assert_eq!(buf.read_i32().unwrap(), 1);
        assert_eq!(buf.read_u32().unwrap(), 2);
        assert_eq!(buf.read_u64().unwrap(), 3);
        assert_eq!(buf.position(), 16);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_byte_buffer_read_f32() {
        let data = 1.5f32.to_le_bytes();
        let mut buf = ByteBuffer::new(&data);

        assert_eq!(buf.read_f32().unwrap(), 1.5);
    }

    #[test]
    fn test_byte_buffer_overflow_error() {
        let data = [0x01, 0x02];
        let mut buf = ByteBuffer::new(&data);

        assert!(matches!(
            buf.read_i32(),
            Err(Error::MalformedData { position: 0, .. })
        ));
        // Failed reads do not move the cursor
        assert_eq!(buf.position(), 0);
    }

    #[test]
    fn test_byte_buffer_skip_and_set_position() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut buf = ByteBuffer::new(&data);

        buf.skip(4).unwrap();
        assert_eq!(buf.read_u32().unwrap(), 0x08070605);

        buf.set_position(2).unwrap();
        assert_eq!(buf.position(), 2);
        assert!(buf.set_position(10).is_err());
        assert!(buf.skip(100).is_err());
    }

    #[test]
    fn test_read_cstring() {
        let data = b"stats\0name\0";
        let mut buf = ByteBuffer::new(data);

        assert_eq!(buf.read_cstring().unwrap(), "stats");
        assert_eq!(buf.read_cstring().unwrap(), "name");
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_read_cstring_without_terminator() {
        let data = b"abc";
        let mut buf = ByteBuffer::new(data);

        assert!(matches!(
            buf.read_cstring(),
            Err(Error::MalformedData { position: 0, .. })
        ));
        assert_eq!(buf.position(), 0);

        let mut empty = ByteBuffer::new(&[]);
        assert!(empty.read_cstring().is_err());
    }

    #[test]
    fn test_read_cstring_utf8() {
        let data = "Достижение\0".as_bytes();
        let mut buf = ByteBuffer::new(data);

        assert_eq!(buf.read_cstring().unwrap(), "Достижение");
    }

    #[test]
    fn test_decode_utf8_stops_at_null() {
        assert_eq!(decode_utf8(b"english\0garbage"), "english");
        assert_eq!(decode_utf8(b""), "");
    }
}
