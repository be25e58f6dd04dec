//! Bolt protocol version definitions.

use std::cmp::Ordering;
use std::fmt;

/// Bolt protocol versions this client can speak.
///
/// On the wire a version is a 4-byte word `[0, range, minor, major]`; the
/// discriminant is that word read big-endian with a zero range, so
/// 5.4 = `0x0000_0405`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BoltVersion {
    /// Bolt 4.4
    V4_4 = 0x0000_0404,
    /// Bolt 5.0 - element ids on entities
    V5_0 = 0x0000_0005,
    /// Bolt 5.1 - authentication moves from HELLO to LOGON
    V5_1 = 0x0000_0105,
    /// Bolt 5.2
    V5_2 = 0x0000_0205,
    /// Bolt 5.3 - bolt_agent in HELLO
    V5_3 = 0x0000_0305,
    /// Bolt 5.4
    V5_4 = 0x0000_0405,
}

impl BoltVersion {
    /// Every version in the capability table, newest first.
    pub const ALL: [BoltVersion; 6] = [
        BoltVersion::V5_4,
        BoltVersion::V5_3,
        BoltVersion::V5_2,
        BoltVersion::V5_1,
        BoltVersion::V5_0,
        BoltVersion::V4_4,
    ];

    /// Versions proposed when none are configured.
    pub const DEFAULT_PROPOSALS: [BoltVersion; 2] = [BoltVersion::V5_4, BoltVersion::V4_4];

    /// Look up a version by major/minor number.
    pub fn new(major: u8, minor: u8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.major() == major && v.minor() == minor)
    }

    /// Get the major version number.
    pub fn major(self) -> u8 {
        (self as u32 & 0xFF) as u8
    }

    /// Get the minor version number.
    pub fn minor(self) -> u8 {
        ((self as u32 >> 8) & 0xFF) as u8
    }

    /// Handshake word for this version.
    pub fn to_bytes(self) -> [u8; 4] {
        (self as u32).to_be_bytes()
    }

    /// Parse a handshake word. The range byte is ignored.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        Self::new(bytes[3], bytes[2])
    }

    /// Authentication is sent in a separate LOGON message.
    pub fn requires_logon(self) -> bool {
        self >= BoltVersion::V5_1
    }

    /// Nodes and relationships carry string element ids.
    pub fn uses_element_ids(self) -> bool {
        self >= BoltVersion::V5_0
    }

    /// HELLO carries a `bolt_agent` map.
    pub fn supports_bolt_agent(self) -> bool {
        self >= BoltVersion::V5_3
    }
}

impl fmt::Display for BoltVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

impl PartialOrd for BoltVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BoltVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major(), self.minor()).cmp(&(other.major(), other.minor()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_words() {
        assert_eq!(BoltVersion::V5_4.to_bytes(), [0x00, 0x00, 0x04, 0x05]);
        assert_eq!(BoltVersion::V4_4.to_bytes(), [0x00, 0x00, 0x04, 0x04]);
        assert_eq!(BoltVersion::V5_0.to_bytes(), [0x00, 0x00, 0x00, 0x05]);
    }

    #[test]
    fn test_from_bytes() {
        assert_eq!(BoltVersion::from_bytes([0, 0, 4, 5]), Some(BoltVersion::V5_4));
        assert_eq!(BoltVersion::from_bytes([0, 3, 4, 5]), Some(BoltVersion::V5_4));
        assert_eq!(BoltVersion::from_bytes([0, 0, 2, 5]), Some(BoltVersion::V5_2));
        assert_eq!(BoltVersion::from_bytes([0, 0, 0, 3]), None);
        assert_eq!(BoltVersion::from_bytes([0, 0, 0, 0]), None);
    }

    #[test]
    fn test_ordering_and_display() {
        assert!(BoltVersion::V5_0 > BoltVersion::V4_4);
        assert!(BoltVersion::V5_4 > BoltVersion::V5_3);
        assert_eq!(BoltVersion::V5_1.to_string(), "5.1");
        let mut sorted = BoltVersion::ALL;
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(sorted, BoltVersion::ALL);
    }

    #[test]
    fn test_capabilities() {
        assert!(!BoltVersion::V4_4.requires_logon());
        assert!(!BoltVersion::V5_0.requires_logon());
        assert!(BoltVersion::V5_1.requires_logon());
        assert!(BoltVersion::V5_4.requires_logon());
        assert!(!BoltVersion::V4_4.uses_element_ids());
        assert!(BoltVersion::V5_0.uses_element_ids());
        assert!(BoltVersion::V5_3.supports_bolt_agent());
        assert!(!BoltVersion::V5_2.supports_bolt_agent());
    }
}
