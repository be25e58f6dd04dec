//! PackStream type markers.
//!
//! Every value on the wire starts with a marker byte. Small integers,
//! short strings, short containers and structures carry their size inside
//! the marker itself; everything else is followed by a big-endian size or
//! payload. Decoding dispatches through [`MARKER_TABLE`], a 256-entry
//! classification built at compile time.

/// Null marker
pub const NULL: u8 = 0xC0;

/// Boolean markers
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

/// Float marker (64-bit IEEE 754)
pub const FLOAT_64: u8 = 0xC1;

/// Integer markers
/// Tiny integers (-16 to 127) are encoded inline
pub const TINY_INT_MIN: u8 = 0xF0; // -16
pub const TINY_INT_MAX: u8 = 0x7F; // 127
pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

/// String markers
/// Tiny strings (0-15 bytes) use 0x80-0x8F
pub const TINY_STRING_BASE: u8 = 0x80;
pub const STRING_8: u8 = 0xD0;
pub const STRING_16: u8 = 0xD1;
pub const STRING_32: u8 = 0xD2;

/// List markers
/// Tiny lists (0-15 elements) use 0x90-0x9F
pub const TINY_LIST_BASE: u8 = 0x90;
pub const LIST_8: u8 = 0xD4;
pub const LIST_16: u8 = 0xD5;
pub const LIST_32: u8 = 0xD6;

/// Map markers
/// Tiny maps (0-15 entries) use 0xA0-0xAF
pub const TINY_MAP_BASE: u8 = 0xA0;
pub const MAP_8: u8 = 0xD8;
pub const MAP_16: u8 = 0xD9;
pub const MAP_32: u8 = 0xDA;

/// Structure marker, 0-15 fields in the low nibble
pub const TINY_STRUCT_BASE: u8 = 0xB0;

/// Largest size that fits in a tiny marker's low nibble.
pub const TINY_MAX_LEN: usize = 15;

/// Structure tags for graph types
pub const NODE_TAG: u8 = 0x4E; // 'N'
pub const RELATIONSHIP_TAG: u8 = 0x52; // 'R'

/// How a marker byte is to be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerClass {
    /// The marker is the value (-16..=127).
    TinyInt,
    Null,
    Boolean(bool),
    Float64,
    /// Fixed-width integer of the given byte width.
    Int(u8),
    /// Size is stored inline in the low nibble.
    TinyString,
    TinyList,
    TinyMap,
    TinyStruct,
    /// Size follows as a big-endian integer of the given byte width.
    String(u8),
    List(u8),
    Map(u8),
    /// Not a marker this codec understands.
    Unknown,
}

const fn classify(marker: u8) -> MarkerClass {
    match marker {
        0x00..=0x7F | 0xF0..=0xFF => MarkerClass::TinyInt,
        0x80..=0x8F => MarkerClass::TinyString,
        0x90..=0x9F => MarkerClass::TinyList,
        0xA0..=0xAF => MarkerClass::TinyMap,
        0xB0..=0xBF => MarkerClass::TinyStruct,
        NULL => MarkerClass::Null,
        FLOAT_64 => MarkerClass::Float64,
        FALSE => MarkerClass::Boolean(false),
        TRUE => MarkerClass::Boolean(true),
        INT_8 => MarkerClass::Int(1),
        INT_16 => MarkerClass::Int(2),
        INT_32 => MarkerClass::Int(4),
        INT_64 => MarkerClass::Int(8),
        STRING_8 => MarkerClass::String(1),
        STRING_16 => MarkerClass::String(2),
        STRING_32 => MarkerClass::String(4),
        LIST_8 => MarkerClass::List(1),
        LIST_16 => MarkerClass::List(2),
        LIST_32 => MarkerClass::List(4),
        MAP_8 => MarkerClass::Map(1),
        MAP_16 => MarkerClass::Map(2),
        MAP_32 => MarkerClass::Map(4),
        _ => MarkerClass::Unknown,
    }
}

const fn build_table() -> [MarkerClass; 256] {
    let mut table = [MarkerClass::Unknown; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = classify(i as u8);
        i += 1;
    }
    table
}

/// Marker byte to decoding class.
pub static MARKER_TABLE: [MarkerClass; 256] = build_table();

/// Look up the class of a marker byte.
#[inline]
pub fn class_of(marker: u8) -> MarkerClass {
    MARKER_TABLE[marker as usize]
}

/// Decode a tiny integer from its marker byte
#[inline]
pub fn decode_tiny_int(marker: u8) -> i8 {
    marker as i8
}

/// Check if an integer can be encoded as a tiny int
#[inline]
pub fn can_encode_tiny_int(value: i64) -> bool {
    (-16..=127).contains(&value)
}

/// Size carried in the low nibble of a tiny marker.
#[inline]
pub fn tiny_len(marker: u8) -> usize {
    (marker & 0x0F) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiny_int_ranges() {
        assert_eq!(class_of(0x00), MarkerClass::TinyInt);
        assert_eq!(class_of(0x7F), MarkerClass::TinyInt);
        assert_eq!(class_of(0xF0), MarkerClass::TinyInt);
        assert_eq!(class_of(0xFF), MarkerClass::TinyInt);
        assert_eq!(decode_tiny_int(0xF0), -16);
        assert_eq!(decode_tiny_int(0xFF), -1);
        assert_eq!(decode_tiny_int(0x7F), 127);
    }

    #[test]
    fn test_can_encode_tiny_int() {
        assert!(can_encode_tiny_int(-16));
        assert!(can_encode_tiny_int(127));
        assert!(!can_encode_tiny_int(128));
        assert!(!can_encode_tiny_int(-17));
    }

    #[test]
    fn test_sized_markers() {
        assert_eq!(class_of(0x85), MarkerClass::TinyString);
        assert_eq!(tiny_len(0x85), 5);
        assert_eq!(class_of(0x9F), MarkerClass::TinyList);
        assert_eq!(tiny_len(0x9F), 15);
        assert_eq!(class_of(0xA0), MarkerClass::TinyMap);
        assert_eq!(class_of(0xB3), MarkerClass::TinyStruct);
        assert_eq!(class_of(STRING_16), MarkerClass::String(2));
        assert_eq!(class_of(LIST_32), MarkerClass::List(4));
        assert_eq!(class_of(MAP_8), MarkerClass::Map(1));
        assert_eq!(class_of(INT_32), MarkerClass::Int(4));
    }

    #[test]
    fn test_unsupported_markers_are_unknown() {
        // byte arrays and wide structure headers are not part of this codec
        for marker in [0xCCu8, 0xCD, 0xCE, 0xDC, 0xDD, 0xC4, 0xE0, 0xEF] {
            assert_eq!(class_of(marker), MarkerClass::Unknown, "0x{:02X}", marker);
        }
    }
}
