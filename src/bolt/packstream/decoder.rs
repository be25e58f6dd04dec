//! PackStream decoder.

use bytes::Buf;

use super::marker::*;
use super::types::{PackStreamMap, PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// Deepest list/map/structure nesting accepted from the server.
pub const MAX_NESTING_DEPTH: usize = 256;

/// PackStream decoder that reads values from a byte buffer.
///
/// Positions reported in errors are `base_offset + position`, so a decoder
/// created over one reassembled message can report where in the overall
/// inbound stream a bad byte was found.
pub struct PackStreamDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    base_offset: usize,
    depth: usize,
}

impl<'a> PackStreamDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_offset(data, 0)
    }

    /// Create a decoder whose reported offsets start at `base_offset`.
    pub fn with_offset(data: &'a [u8], base_offset: usize) -> Self {
        Self {
            data,
            pos: 0,
            base_offset,
            depth: 0,
        }
    }

    /// Get the current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Position in the inbound stream, for diagnostics.
    pub fn offset(&self) -> usize {
        self.base_offset + self.pos
    }

    /// Get remaining bytes count.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, PackStreamError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(PackStreamError::UnexpectedEof { offset: self.offset() })
    }

    /// Consume one byte.
    pub fn next_u8(&mut self) -> Result<u8, PackStreamError> {
        let value = self.peek_u8()?;
        self.pos += 1;
        Ok(value)
    }

    /// Consume `len` bytes.
    pub fn next_bytes(&mut self, len: usize) -> Result<&'a [u8], PackStreamError> {
        if self.remaining() < len {
            return Err(PackStreamError::UnexpectedEof { offset: self.offset() });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> Result<PackStreamValue, PackStreamError> {
        let marker_offset = self.offset();
        let marker = self.next_u8()?;

        match class_of(marker) {
            MarkerClass::TinyInt => Ok(PackStreamValue::Integer(decode_tiny_int(marker) as i64)),
            MarkerClass::Null => Ok(PackStreamValue::Null),
            MarkerClass::Boolean(b) => Ok(PackStreamValue::Boolean(b)),
            MarkerClass::Float64 => {
                let mut raw = self.next_bytes(8)?;
                Ok(PackStreamValue::Float(raw.get_f64()))
            }
            MarkerClass::Int(width) => Ok(PackStreamValue::Integer(self.read_int(width)?)),
            MarkerClass::TinyString => self.read_string_data(tiny_len(marker)),
            MarkerClass::TinyList => self.nested(marker_offset, |d| d.read_list_data(tiny_len(marker))),
            MarkerClass::TinyMap => self.nested(marker_offset, |d| d.read_map_data(tiny_len(marker))),
            MarkerClass::TinyStruct => self.nested(marker_offset, |d| d.read_struct_data(tiny_len(marker))),
            MarkerClass::String(width) => {
                let len = self.read_size(width)?;
                self.read_string_data(len)
            }
            MarkerClass::List(width) => {
                let len = self.read_size(width)?;
                self.nested(marker_offset, |d| d.read_list_data(len))
            }
            MarkerClass::Map(width) => {
                let len = self.read_size(width)?;
                self.nested(marker_offset, |d| d.read_map_data(len))
            }
            MarkerClass::Unknown => Err(PackStreamError::UnknownMarker {
                marker,
                offset: marker_offset,
            }),
        }
    }

    /// Decode one container level, bounded by [`MAX_NESTING_DEPTH`].
    fn nested<F>(&mut self, offset: usize, read: F) -> Result<PackStreamValue, PackStreamError>
    where
        F: FnOnce(&mut Self) -> Result<PackStreamValue, PackStreamError>,
    {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(PackStreamError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
                offset,
            });
        }
        self.depth += 1;
        let value = read(self);
        self.depth -= 1;
        value
    }

    fn read_int(&mut self, width: u8) -> Result<i64, PackStreamError> {
        let mut raw = self.next_bytes(width as usize)?;
        Ok(match width {
            1 => raw.get_i8() as i64,
            2 => raw.get_i16() as i64,
            4 => raw.get_i32() as i64,
            _ => raw.get_i64(),
        })
    }

    fn read_size(&mut self, width: u8) -> Result<usize, PackStreamError> {
        let mut raw = self.next_bytes(width as usize)?;
        Ok(match width {
            1 => raw.get_u8() as usize,
            2 => raw.get_u16() as usize,
            _ => raw.get_u32() as usize,
        })
    }

    fn read_string_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let offset = self.offset();
        let bytes = self.next_bytes(len)?;
        let s = std::str::from_utf8(bytes).map_err(|e| PackStreamError::InvalidUtf8 {
            offset,
            reason: e.to_string(),
        })?;
        Ok(PackStreamValue::String(s.to_string()))
    }

    fn read_list_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(PackStreamValue::List(items))
    }

    fn read_map_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let mut map = PackStreamMap::with_capacity(len.min(1024));
        for _ in 0..len {
            let key_offset = self.offset();
            let key = match self.decode()? {
                PackStreamValue::String(s) => s,
                _ => return Err(PackStreamError::InvalidMapKey { offset: key_offset }),
            };
            let value = self.decode()?;
            map.insert(key, value);
        }
        Ok(PackStreamValue::Map(map))
    }

    fn read_struct_data(&mut self, field_count: usize) -> Result<PackStreamValue, PackStreamError> {
        let tag = self.next_u8()?;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            fields.push(self.decode()?);
        }
        Ok(PackStreamValue::Structure(PackStreamStructure::new(tag, fields)))
    }
}

/// Convenience function to decode a single value from bytes.
pub fn decode(data: &[u8]) -> Result<PackStreamValue, PackStreamError> {
    let mut decoder = PackStreamDecoder::new(data);
    decoder.decode()
}
