//! Bolt chunked message framing.
//!
//! Each message travels as a sequence of chunks, every chunk prefixed by a
//! 2-byte big-endian length, and the message is terminated by a zero-length
//! chunk. [`ChunkCodec`] implements the `tokio_util` codec traits over a
//! `BytesMut`, so the same framing logic serves the blocking connection and
//! unit tests that feed it partial input.

use std::fmt::Write as _;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::BoltError;

/// Maximum chunk size, the largest value a 2-byte length can hold
pub const MAX_CHUNK_SIZE: usize = 65535;

/// End of message marker (0x00 0x00)
pub const END_MARKER: [u8; 2] = [0x00, 0x00];

/// Default limit for one reassembled message (128 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 128 * 1024 * 1024;

/// A reassembled inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Message payload bytes received on this connection before this one.
    pub offset: usize,
    /// Concatenated chunk payloads.
    pub payload: Bytes,
}

/// Chunk framing codec.
#[derive(Debug)]
pub struct ChunkCodec {
    max_message_size: usize,
    message_buffer: BytesMut,
    /// Payload bytes handed out so far, for error offsets
    consumed: usize,
}

impl ChunkCodec {
    /// Create a new codec with default settings.
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a codec with custom max message size.
    pub fn with_max_size(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            message_buffer: BytesMut::with_capacity(4096),
            consumed: 0,
        }
    }

    /// Whether a message is partially reassembled.
    pub fn in_message(&self) -> bool {
        !self.message_buffer.is_empty()
    }

    /// Total payload bytes of completed messages.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkCodec {
    type Item = InboundMessage;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < 2 {
                return Ok(None);
            }

            let chunk_size = u16::from_be_bytes([src[0], src[1]]) as usize;

            if chunk_size == 0 {
                src.advance(2);

                if self.message_buffer.is_empty() {
                    // NOOP keep-alive
                    continue;
                }

                let payload = self.message_buffer.split().freeze();
                let offset = self.consumed;
                self.consumed += payload.len();
                return Ok(Some(InboundMessage { offset, payload }));
            }

            if src.len() < 2 + chunk_size {
                return Ok(None);
            }

            if self.message_buffer.len() + chunk_size > self.max_message_size {
                return Err(BoltError::MessageTooLarge {
                    size: self.message_buffer.len() + chunk_size,
                    max: self.max_message_size,
                });
            }

            src.advance(2);
            self.message_buffer.extend_from_slice(&src[..chunk_size]);
            src.advance(chunk_size);
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() && !self.in_message() => Ok(None),
            None => Err(BoltError::ConnectionClosed),
        }
    }
}

impl Encoder<&[u8]> for ChunkCodec {
    type Error = BoltError;

    fn encode(&mut self, data: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(data.len() + 2 * (data.len() / MAX_CHUNK_SIZE + 2));
        for chunk in data.chunks(MAX_CHUNK_SIZE) {
            dst.put_u16(chunk.len() as u16);
            dst.put_slice(chunk);
        }
        dst.put_slice(&END_MARKER);
        Ok(())
    }
}

/// Render bytes as offset-prefixed hex lines, 16 bytes per line.
pub fn hex_dump(data: &[u8], base_offset: usize) -> String {
    let mut out = String::with_capacity(data.len() * 4);
    for (i, line) in data.chunks(16).enumerate() {
        let _ = write!(out, "{:08x} ", base_offset + i * 16);
        for byte in line {
            let _ = write!(out, " {:02x}", byte);
        }
        for _ in line.len()..16 {
            out.push_str("   ");
        }
        out.push_str("  |");
        out.extend(line.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: &[u8]) -> BytesMut {
        let mut codec = ChunkCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(data, &mut dst).unwrap();
        dst
    }

    #[test]
    fn test_small_message_framing() {
        assert_eq!(&frame(&[0xB0, 0x0F])[..], &[0x00, 0x02, 0xB0, 0x0F, 0x00, 0x00]);
    }

    #[test]
    fn test_large_message_is_split() {
        let data = vec![0xAB; MAX_CHUNK_SIZE + 10];
        let framed = frame(&data);
        assert_eq!(&framed[..2], &[0xFF, 0xFF]);
        let second = 2 + MAX_CHUNK_SIZE;
        assert_eq!(&framed[second..second + 2], &[0x00, 0x0A]);
        assert_eq!(&framed[framed.len() - 2..], &END_MARKER);
        assert_eq!(framed.len(), data.len() + 6);

        let mut codec = ChunkCodec::new();
        let mut src = framed;
        let message = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(&message.payload[..], &data[..]);
        assert!(src.is_empty());
    }

    #[test]
    fn test_exact_chunk_boundary() {
        let data = vec![0x01; MAX_CHUNK_SIZE];
        let framed = frame(&data);
        assert_eq!(framed.len(), MAX_CHUNK_SIZE + 4);
    }

    #[test]
    fn test_partial_chunk() {
        let mut codec = ChunkCodec::new();
        let mut src = BytesMut::from(&[0x00, 0x03, 0x01][..]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(&[0x02, 0x03]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        assert!(codec.in_message());
        src.extend_from_slice(&END_MARKER);
        let message = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(&message.payload[..], &[1, 2, 3]);
        assert_eq!(message.offset, 0);
    }

    #[test]
    fn test_offsets_accumulate_and_noops_skipped() {
        let mut codec = ChunkCodec::new();
        let mut src = BytesMut::new();
        src.extend_from_slice(&[0x00, 0x00]);
        src.extend_from_slice(&frame(&[1, 2, 3, 4]));
        src.extend_from_slice(&[0x00, 0x00]);
        src.extend_from_slice(&frame(&[5, 6]));

        let first = codec.decode(&mut src).unwrap().unwrap();
        let second = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, 4);
        assert_eq!(&second.payload[..], &[5, 6]);
        assert_eq!(codec.consumed(), 6);
    }

    #[test]
    fn test_message_too_large() {
        let mut codec = ChunkCodec::with_max_size(4);
        let mut src = BytesMut::from(&[0x00, 0x05, 1, 2, 3, 4, 5, 0x00, 0x00][..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(BoltError::MessageTooLarge { size: 5, max: 4 })
        ));
    }

    #[test]
    fn test_eof_mid_message() {
        let mut codec = ChunkCodec::new();
        let mut src = BytesMut::from(&[0x00, 0x02, 0x01, 0x02][..]);
        assert!(matches!(codec.decode_eof(&mut src), Err(BoltError::ConnectionClosed)));

        let mut clean = BytesMut::new();
        assert!(ChunkCodec::new().decode_eof(&mut clean).unwrap().is_none());
    }

    #[test]
    fn test_hex_dump() {
        let dump = hex_dump(b"\xB1\x70\xA0hello", 16);
        assert!(dump.starts_with("00000010  b1 70 a0 68"));
        assert!(dump.trim_end().ends_with("|.p.hello|"));
    }
}
