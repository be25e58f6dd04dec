//! PackStream serialization format.
//!
//! PackStream is the binary serialization format used by the Bolt protocol
//! to encode values for transmission between client and server.
//!
//! # Supported Types
//!
//! - **Null**: Single byte marker
//! - **Boolean**: True/False markers
//! - **Integer**: Variable-length encoding (-2^63 to 2^63-1)
//! - **Float**: 64-bit IEEE 754
//! - **String**: UTF-8 encoded, variable length prefix
//! - **List**: Heterogeneous collections
//! - **Map**: String keys to arbitrary values, insertion ordered
//! - **Structure**: Tagged structures for messages and graph types
//!
//! Byte arrays and the temporal/spatial structures are not part of this
//! codec; their markers decode as [`PackStreamError::UnknownMarker`].

pub mod decoder;
pub mod encoder;
pub mod marker;
pub mod ser;
pub mod structures;
pub mod types;

pub use decoder::{decode, PackStreamDecoder};
pub use encoder::{encode, PackStreamEncoder};
pub use marker::*;
pub use ser::{to_parameters, to_value};
pub use structures::{PackStreamNode, PackStreamRelationship};
pub use types::{PackStreamMap, PackStreamStructure, PackStreamValue};

use thiserror::Error;

/// PackStream errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackStreamError {
    /// Input ended in the middle of a value
    #[error("Unexpected end of PackStream data at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// Marker byte this codec does not understand
    #[error("Unknown PackStream marker 0x{marker:02X} at offset {offset}")]
    UnknownMarker { marker: u8, offset: usize },

    /// Invalid UTF-8 in string
    #[error("Invalid UTF-8 in string at offset {offset}: {reason}")]
    InvalidUtf8 { offset: usize, reason: String },

    /// Containers nested deeper than the decoder allows
    #[error("PackStream nesting deeper than {max} at offset {offset}")]
    NestingTooDeep { max: usize, offset: usize },

    /// Map key that is not a string
    #[error("Map keys must be strings (offset {offset})")]
    InvalidMapKey { offset: usize },

    /// Value too large to encode
    #[error("{0} too large: {1}")]
    ValueTooLarge(&'static str, usize),

    /// Integer outside the signed 64-bit range
    #[error("Integer out of range: {0}")]
    IntegerOutOfRange(String),

    /// Invalid structure format
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// Value that cannot be expressed in PackStream
    #[error("Cannot serialize value: {0}")]
    Serialization(String),
}

impl PackStreamError {
    /// Stream offset the error refers to, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            PackStreamError::UnexpectedEof { offset }
            | PackStreamError::UnknownMarker { offset, .. }
            | PackStreamError::InvalidUtf8 { offset, .. }
            | PackStreamError::InvalidMapKey { offset }
            | PackStreamError::NestingTooDeep { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: PackStreamValue) -> PackStreamValue {
        let bytes = encode(&value).unwrap();
        let mut decoder = PackStreamDecoder::new(&bytes);
        let decoded = decoder.decode().unwrap();
        assert!(decoder.is_empty(), "trailing bytes for {:?}", value);
        decoded
    }

    #[test]
    fn test_integer_boundaries() {
        let cases = [
            i64::MIN,
            -2147483649,
            -2147483648,
            -32769,
            -32768,
            -129,
            -128,
            -17,
            -16,
            -1,
            0,
            127,
            128,
            32767,
            32768,
            2147483647,
            2147483648,
            i64::MAX,
        ];
        for v in cases {
            assert_eq!(roundtrip(PackStreamValue::Integer(v)), PackStreamValue::Integer(v), "{}", v);
        }
    }

    #[test]
    fn test_special_floats() {
        for v in [0.0f64, -0.0, 1.5, f64::INFINITY, f64::NEG_INFINITY, f64::MIN_POSITIVE, f64::NAN] {
            match roundtrip(PackStreamValue::Float(v)) {
                PackStreamValue::Float(d) => assert_eq!(d.to_bits(), v.to_bits()),
                other => panic!("expected float, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_string_length_boundaries() {
        for len in [0usize, 1, 15, 16, 255, 256, 65535, 65536, 1 << 20] {
            let s = "x".repeat(len);
            assert_eq!(roundtrip(PackStreamValue::String(s.clone())), PackStreamValue::String(s));
        }
        let unicode = "Grüße, 世界 🎉".to_string();
        assert_eq!(roundtrip(PackStreamValue::String(unicode.clone())), PackStreamValue::String(unicode));
    }

    #[test]
    fn test_deeply_nested() {
        let mut value = PackStreamValue::Integer(1);
        for depth in 0..8 {
            value = if depth % 2 == 0 {
                PackStreamValue::List(vec![value, PackStreamValue::List(vec![])])
            } else {
                let mut map = PackStreamMap::new();
                map.insert(format!("level{}", depth), value);
                map.insert("empty".to_string(), PackStreamValue::Map(PackStreamMap::new()));
                PackStreamValue::Map(map)
            };
        }
        assert_eq!(roundtrip(value.clone()), value);
    }

    #[test]
    fn test_large_containers() {
        let list: Vec<PackStreamValue> = (0..70_000).map(PackStreamValue::Integer).collect();
        assert_eq!(roundtrip(PackStreamValue::List(list.clone())), PackStreamValue::List(list));

        let mut map = PackStreamMap::new();
        for i in 0..300 {
            map.insert(format!("k{}", i), PackStreamValue::Boolean(i % 2 == 0));
        }
        assert_eq!(roundtrip(PackStreamValue::Map(map.clone())), PackStreamValue::Map(map));
    }

    #[test]
    fn test_error_offsets() {
        let err = decode(&[0x91, 0xCD]).unwrap_err();
        assert_eq!(err.offset(), Some(1));
        assert_eq!(PackStreamError::IntegerOutOfRange("1".into()).offset(), None);
    }
}
