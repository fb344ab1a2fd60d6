//! Entity body codec.
//!
//! [`SaveBuffer`] is the growable scratch buffer an entity serialises into
//! during a save pass; [`BufferReader`] walks the same bytes back on load and
//! tracks how many were consumed so the loader can compare that against the
//! length recorded in the index.
//!
//! Integers are little-endian. Strings carry a 7-bit variable-length byte
//! count followed by UTF-8. Arbitrary `serde` values can be embedded as
//! MessagePack.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DecodeError, EncodeError};
use crate::serial::Serial;

/// Growable byte buffer an entity writes its state into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveBuffer {
    data: Vec<u8>,
}

impl SaveBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create an empty buffer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Wrap bytes that already hold a serialised body (used on load).
    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Number of bytes written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocated capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// The bytes written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Discard the contents, keeping the allocation for the next pass.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Release capacity beyond the bytes actually written.
    pub fn shrink_to_len(&mut self) {
        self.data.shrink_to_fit();
    }

    /// Move the bytes out, leaving an empty buffer behind.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Consume the buffer and return its bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.data.push(u8::from(value));
    }

    pub fn write_i16(&mut self, value: i16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_serial(&mut self, serial: Serial) {
        self.write_u32(serial.0);
    }

    /// Write raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write an unsigned integer seven bits at a time, low group first, with
    /// the high bit of each byte flagging a continuation.
    pub fn write_encoded_int(&mut self, value: u32) {
        let mut v = value;
        while v >= 0x80 {
            self.data.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.data.push(v as u8);
    }

    /// Write a string as an encoded byte count followed by UTF-8.
    pub fn write_string(&mut self, value: &str) {
        self.write_encoded_int(value.len() as u32);
        self.data.extend_from_slice(value.as_bytes());
    }

    /// Append any `serde` value as MessagePack.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::MessagePack`] if the value cannot be encoded.
    pub fn write_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        rmp_serde::encode::write(&mut self.data, value)?;
        Ok(())
    }
}

/// Cursor over a serialised body.
#[derive(Debug, Clone)]
pub struct BufferReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BufferReader<'a> {
    /// Start reading at the beginning of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns `true` once every byte has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.position == self.data.len()
    }

    /// Borrow the next `len` bytes and advance past them.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedEof`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::UnexpectedEof {
                needed: len,
                position: self.position,
                remaining: self.remaining(),
            });
        }
        let start = self.position;
        self.position += len;
        Ok(&self.data[start..self.position])
    }

    /// Advance past `len` bytes without looking at them.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedEof`] if fewer than `len` bytes remain.
    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.read_bytes(len).map(|_| ())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    pub fn read_serial(&mut self) -> Result<Serial, DecodeError> {
        Ok(Serial(self.read_u32()?))
    }

    /// Read an integer written by [`SaveBuffer::write_encoded_int`].
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::BadEncodedInt`] if the continuation bit is still
    /// set after five bytes.
    pub fn read_encoded_int(&mut self) -> Result<u32, DecodeError> {
        let start = self.position;
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            value |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::BadEncodedInt(start))
    }

    /// Read a string written by [`SaveBuffer::write_string`].
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidUtf8`] if the bytes are not UTF-8.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_encoded_int()? as usize;
        let start = self.position;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8(start))
    }

    /// Read a MessagePack value written by [`SaveBuffer::write_value`].
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MessagePack`] if the bytes do not decode as `T`.
    pub fn read_value<T: DeserializeOwned>(&mut self) -> Result<T, DecodeError> {
        let mut rest: &'a [u8] = &self.data[self.position..];
        let before = rest.len();
        let value = rmp_serde::decode::from_read(&mut rest)?;
        self.position += before - rest.len();
        Ok(value)
    }
}
