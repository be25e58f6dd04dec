//! Client side of the version negotiation.

use super::{BoltVersion, HandshakeError, BOLT_MAGIC, HANDSHAKE_SIZE};

/// Bolt handshake handler.
///
/// The handshake process:
/// 1. Client sends 20 bytes: 4-byte magic + 4 x 4-byte version proposals
/// 2. Server picks the first proposal it supports
/// 3. Server responds with the 4-byte agreed version (or zeros if none)
#[derive(Debug, Clone)]
pub struct Handshake {
    proposals: Vec<BoltVersion>,
}

impl Handshake {
    /// Handshake proposing [`BoltVersion::DEFAULT_PROPOSALS`].
    pub fn new() -> Self {
        Self {
            proposals: BoltVersion::DEFAULT_PROPOSALS.to_vec(),
        }
    }

    /// Handshake proposing `versions`, highest preference first.
    pub fn with_versions(versions: Vec<BoltVersion>) -> Result<Self, HandshakeError> {
        if versions.is_empty() {
            return Err(HandshakeError::NoCompatibleVersion);
        }
        if versions.len() > 4 {
            return Err(HandshakeError::TooManyProposals(versions.len()));
        }
        Ok(Self { proposals: versions })
    }

    /// Proposed versions.
    pub fn proposals(&self) -> &[BoltVersion] {
        &self.proposals
    }

    /// The 20 bytes the client opens the connection with.
    pub fn request_bytes(&self) -> [u8; HANDSHAKE_SIZE] {
        let mut out = [0u8; HANDSHAKE_SIZE];
        out[..4].copy_from_slice(&BOLT_MAGIC);
        for (slot, version) in out[4..].chunks_exact_mut(4).zip(&self.proposals) {
            slot.copy_from_slice(&version.to_bytes());
        }
        out
    }

    /// Interpret the server's 4-byte answer.
    ///
    /// Only a version that was proposed is accepted.
    pub fn parse_response(&self, response: [u8; 4]) -> Result<BoltVersion, HandshakeError> {
        if response == [0; 4] {
            return Err(HandshakeError::NoCompatibleVersion);
        }
        BoltVersion::from_bytes(response)
            .filter(|version| self.proposals.contains(version))
            .ok_or(HandshakeError::UnsupportedVersion(response))
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_bytes() {
        let bytes = Handshake::new().request_bytes();
        assert_eq!(
            bytes,
            [
                0x60, 0x60, 0xB0, 0x17, //
                0x00, 0x00, 0x04, 0x05, //
                0x00, 0x00, 0x04, 0x04, //
                0x00, 0x00, 0x00, 0x00, //
                0x00, 0x00, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn test_custom_proposals() {
        let hs = Handshake::with_versions(vec![BoltVersion::V5_0]).unwrap();
        assert_eq!(&hs.request_bytes()[4..8], &[0, 0, 0, 5]);
        assert_eq!(&hs.request_bytes()[8..], &[0; 12]);
        assert!(matches!(
            Handshake::with_versions(vec![BoltVersion::V4_4; 5]),
            Err(HandshakeError::TooManyProposals(5))
        ));
        assert!(Handshake::with_versions(vec![]).is_err());
    }

    #[test]
    fn test_parse_response() {
        let hs = Handshake::new();
        assert_eq!(hs.parse_response([0, 0, 4, 5]).unwrap(), BoltVersion::V5_4);
        assert_eq!(hs.parse_response([0, 0, 4, 4]).unwrap(), BoltVersion::V4_4);
        assert_eq!(hs.parse_response([0; 4]), Err(HandshakeError::NoCompatibleVersion));
        assert_eq!(
            hs.parse_response([0, 0, 0, 3]),
            Err(HandshakeError::UnsupportedVersion([0, 0, 0, 3]))
        );
        // the HTTP answer a web server gives to the magic preamble
        assert!(hs.parse_response(*b"HTTP").is_err());
    }

    #[test]
    fn test_parse_response_rejects_unproposed_version() {
        // 5.2 is a known version, but not one of the default proposals
        let hs = Handshake::new();
        assert_eq!(
            hs.parse_response([0, 0, 2, 5]),
            Err(HandshakeError::UnsupportedVersion([0, 0, 2, 5]))
        );

        let hs = Handshake::with_versions(vec![BoltVersion::V5_2]).unwrap();
        assert_eq!(hs.parse_response([0, 0, 2, 5]).unwrap(), BoltVersion::V5_2);
        assert!(hs.parse_response([0, 0, 4, 5]).is_err());
    }
}
