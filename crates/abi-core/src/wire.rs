// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic byte writer/reader: little-endian scalars, LEB128
//! `varuint32`, zigzag `varint32` and length-prefixed byte strings.
#![allow(clippy::cast_possible_truncation)]

use core::str;

use crate::error::{AbiError, Result};
use crate::name::Name;

/// Trait for native values with a fixed binary layout.
pub trait Encode {
    /// Append the encoding of `self`.
    fn encode(&self, writer: &mut Writer) -> Result<()>;
}

/// Trait for native values decodable from their binary layout.
pub trait Decode: Sized {
    /// Decode from the reader's current position.
    fn decode(reader: &mut Reader<'_>) -> Result<Self>;
}

/// Encode a value into a fresh Vec.
pub fn encode_to_vec<T: Encode>(value: &T) -> Result<Vec<u8>> {
    let mut writer = Writer::default();
    value.encode(&mut writer)?;
    Ok(writer.into_vec())
}

/// Decode a value from a byte slice, rejecting leftover bytes.
pub fn decode_from_bytes<T: Decode>(bytes: &[u8]) -> Result<T> {
    let mut reader = Reader::new(bytes);
    let value = T::decode(&mut reader)?;
    reader.finish()?;
    Ok(value)
}

/// Growable output buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create a new writer with a pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a little-endian u16.
    pub fn write_u16_le(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian u32.
    pub fn write_u32_le(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian u64.
    pub fn write_u64_le(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian i64.
    pub fn write_i64_le(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an unsigned LEB128 value (7 bits per byte, low group first).
    pub fn write_varuint32(&mut self, value: u32) {
        let mut v = value;
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
    }

    /// Write a zigzag-encoded signed LEB128 value.
    pub fn write_varint32(&mut self, value: i32) {
        self.write_varuint32(((value << 1) ^ (value >> 31)) as u32);
    }

    /// Write a varuint32 length followed by the bytes.
    pub fn write_len_prefixed_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| AbiError::NumericOverflow(format!("length {}", bytes.len())))?;
        self.write_varuint32(len);
        self.write_bytes(bytes);
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_len_prefixed_bytes(value.as_bytes())
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the writer and return the buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an input byte slice.
#[derive(Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over the provided byte slice.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Whether the input is exhausted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Current offset from the start of the input.
    #[must_use]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Fail with [`AbiError::TrailingBytes`] unless the input is exhausted.
    pub fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(AbiError::TrailingBytes(n)),
        }
    }

    /// Take the next `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(AbiError::UnexpectedEnd)?;
        if end > self.bytes.len() {
            return Err(AbiError::UnexpectedEnd);
        }
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    /// Take exactly `N` bytes as an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let chunk = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a little-endian u16.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian u64.
    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian i64.
    pub fn read_i64_le(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Read an unsigned LEB128 value of at most 32 bits.
    pub fn read_varuint32(&mut self) -> Result<u32> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            if shift >= 35 {
                return Err(AbiError::NumericOverflow("varuint32 longer than 5 bytes".into()));
            }
            let byte = self.read_u8()?;
            result |= u64::from(byte & 0x7f) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                break;
            }
        }
        u32::try_from(result).map_err(|_| AbiError::NumericOverflow("varuint32".into()))
    }

    /// Read a zigzag-encoded signed LEB128 value.
    pub fn read_varint32(&mut self) -> Result<i32> {
        let v = self.read_varuint32()?;
        Ok(((v >> 1) as i32) ^ -((v & 1) as i32))
    }

    /// Read a varuint32 length and then that many bytes.
    pub fn read_len_prefixed_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_varuint32()? as usize;
        self.take(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_len_prefixed_bytes()?;
        str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| AbiError::invalid("string is not valid utf-8"))
    }
}

impl Encode for String {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(self)
    }
}

impl Decode for String {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        reader.read_string()
    }
}

impl Encode for u16 {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u16_le(*self);
        Ok(())
    }
}

impl Decode for u16 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        reader.read_u16_le()
    }
}

impl Encode for u64 {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u64_le(*self);
        Ok(())
    }
}

impl Decode for u64 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        reader.read_u64_le()
    }
}

impl Encode for Name {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u64_le(self.as_u64());
        Ok(())
    }
}

impl Decode for Name {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        reader.read_u64_le().map(Name::new)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        let len = u32::try_from(self.len())
            .map_err(|_| AbiError::NumericOverflow(format!("array length {}", self.len())))?;
        writer.write_varuint32(len);
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let len = reader.read_varuint32()? as usize;
        // every element takes at least one byte
        let mut out = Vec::with_capacity(len.min(reader.remaining()));
        for _ in 0..len {
            out.push(T::decode(reader)?);
        }
        Ok(out)
    }
}
