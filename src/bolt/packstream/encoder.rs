//! PackStream encoder.

use bytes::{BufMut, BytesMut};

use super::marker::*;
use super::types::{PackStreamMap, PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// PackStream encoder that writes values to a byte buffer.
///
/// The connection keeps one of these as its outbound message buffer, so a
/// failed encode can be discarded with [`PackStreamEncoder::truncate`]
/// before anything reaches the socket.
pub struct PackStreamEncoder {
    buffer: BytesMut,
}

impl PackStreamEncoder {
    /// Create a new encoder with default buffer capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new encoder with specified buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Drop everything written after `len`.
    pub fn truncate(&mut self, len: usize) {
        self.buffer.truncate(len);
    }

    /// Take the encoded bytes, leaving the encoder empty.
    pub fn split(&mut self) -> BytesMut {
        self.buffer.split()
    }

    /// Consume the encoder and return the bytes.
    pub fn into_bytes(self) -> BytesMut {
        self.buffer
    }

    /// Get the bytes as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Encode a PackStreamValue.
    pub fn encode(&mut self, value: &PackStreamValue) -> Result<(), PackStreamError> {
        match value {
            PackStreamValue::Null => {
                self.encode_null();
                Ok(())
            }
            PackStreamValue::Boolean(b) => {
                self.encode_bool(*b);
                Ok(())
            }
            PackStreamValue::Integer(i) => {
                self.encode_int(*i);
                Ok(())
            }
            PackStreamValue::Float(f) => {
                self.encode_float(*f);
                Ok(())
            }
            PackStreamValue::String(s) => self.encode_string(s),
            PackStreamValue::List(l) => self.encode_list(l),
            PackStreamValue::Map(m) => self.encode_map(m),
            PackStreamValue::Structure(s) => self.encode_structure(s),
        }
    }

    /// Encode null.
    pub fn encode_null(&mut self) {
        self.buffer.put_u8(NULL);
    }

    /// Encode a boolean.
    pub fn encode_bool(&mut self, value: bool) {
        self.buffer.put_u8(if value { TRUE } else { FALSE });
    }

    /// Encode an integer using the smallest representation.
    pub fn encode_int(&mut self, value: i64) {
        if can_encode_tiny_int(value) {
            self.buffer.put_u8(value as u8);
        } else if i8::try_from(value).is_ok() {
            self.buffer.put_u8(INT_8);
            self.buffer.put_i8(value as i8);
        } else if i16::try_from(value).is_ok() {
            self.buffer.put_u8(INT_16);
            self.buffer.put_i16(value as i16);
        } else if i32::try_from(value).is_ok() {
            self.buffer.put_u8(INT_32);
            self.buffer.put_i32(value as i32);
        } else {
            self.buffer.put_u8(INT_64);
            self.buffer.put_i64(value);
        }
    }

    /// Encode a float (always 64-bit).
    pub fn encode_float(&mut self, value: f64) {
        self.buffer.put_u8(FLOAT_64);
        self.buffer.put_f64(value);
    }

    /// Encode a string.
    pub fn encode_string(&mut self, value: &str) -> Result<(), PackStreamError> {
        let bytes = value.as_bytes();
        self.encode_header("string", bytes.len(), TINY_STRING_BASE, [STRING_8, STRING_16, STRING_32])?;
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Encode a list.
    pub fn encode_list(&mut self, values: &[PackStreamValue]) -> Result<(), PackStreamError> {
        self.encode_header("list", values.len(), TINY_LIST_BASE, [LIST_8, LIST_16, LIST_32])?;
        for value in values {
            self.encode(value)?;
        }
        Ok(())
    }

    /// Encode a map. Entries are written in the map's iteration order.
    pub fn encode_map(&mut self, map: &PackStreamMap) -> Result<(), PackStreamError> {
        self.encode_header("map", map.len(), TINY_MAP_BASE, [MAP_8, MAP_16, MAP_32])?;
        for (key, value) in map {
            self.encode_string(key)?;
            self.encode(value)?;
        }
        Ok(())
    }

    /// Encode a structure. At most 15 fields are representable.
    pub fn encode_structure(&mut self, s: &PackStreamStructure) -> Result<(), PackStreamError> {
        let len = s.fields.len();
        if len > TINY_MAX_LEN {
            return Err(PackStreamError::ValueTooLarge("structure", len));
        }
        self.buffer.put_u8(TINY_STRUCT_BASE + len as u8);
        self.buffer.put_u8(s.tag);
        for field in &s.fields {
            self.encode(field)?;
        }
        Ok(())
    }

    fn encode_header(
        &mut self,
        kind: &'static str,
        len: usize,
        tiny_base: u8,
        [m8, m16, m32]: [u8; 3],
    ) -> Result<(), PackStreamError> {
        if len <= TINY_MAX_LEN {
            self.buffer.put_u8(tiny_base + len as u8);
        } else if len <= u8::MAX as usize {
            self.buffer.put_u8(m8);
            self.buffer.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buffer.put_u8(m16);
            self.buffer.put_u16(len as u16);
        } else if len <= u32::MAX as usize {
            self.buffer.put_u8(m32);
            self.buffer.put_u32(len as u32);
        } else {
            return Err(PackStreamError::ValueTooLarge(kind, len));
        }
        Ok(())
    }
}

impl Default for PackStreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to encode a single value.
pub fn encode(value: &PackStreamValue) -> Result<BytesMut, PackStreamError> {
    let mut encoder = PackStreamEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}
