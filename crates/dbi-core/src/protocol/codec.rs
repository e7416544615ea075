//! Binary codec for the fixed 16-byte command header and the FILE_RANGE
//! request payload.
//!
//! Wire format (all integers little-endian):
//! ```text
//! header:        [magic:4 = "DBI0"][command_type:4][command_id:4][payload_size:4]
//! range request: [range_size:4][range_offset:8][name_len:4][name:name_len]
//! ```
//! This layer is a pure transform. It checks layout and the magic marker but
//! nothing else; in particular `payload_size` is not bounds-checked here,
//! that is the dispatch loop's responsibility. All field extraction is
//! explicit offset reads behind a length check, so short buffers produce
//! errors instead of out-of-bounds access.

use crate::protocol::commands::{
    CommandId, CommandType, HEADER_SIZE, MAGIC, RANGE_REQUEST_PREFIX_SIZE,
};
use thiserror::Error;

/// Errors that can occur while decoding headers or request payloads.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The first four header bytes are not the `"DBI0"` marker.
    #[error("invalid magic: expected \"DBI0\", got {found:02X?}")]
    InvalidMagic { found: [u8; 4] },

    /// The request payload violates the declared layout.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

/// One decoded 16-byte command header.
///
/// `command_type` and `command_id` stay raw `u32`s on decode: unrecognized
/// ids must reach the dispatch loop (which ends the session for them) instead
/// of failing inside the codec. Convert with [`CommandId::try_from`] at the
/// dispatch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub command_type: u32,
    pub command_id: u32,
    /// Byte length of the payload that follows the header (0 if none).
    pub payload_size: u32,
}

/// A parsed FILE_RANGE request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRangeRequest {
    /// Number of file bytes the client wants streamed.
    pub range_size: u32,
    /// File offset the range starts at.
    pub range_offset: u64,
    /// Short title name (resolved through the title index) or a literal
    /// path relative to the titles root.
    pub name: String,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a command header into its fixed 16-byte wire form.
///
/// # Examples
///
/// ```rust
/// use dbi_core::protocol::codec::{decode_header, encode_header};
/// use dbi_core::protocol::commands::{CommandId, CommandType};
///
/// let bytes = encode_header(CommandType::Response, CommandId::List, 9);
/// let header = decode_header(&bytes).unwrap();
/// assert_eq!(header.command_id, CommandId::List as u32);
/// assert_eq!(header.payload_size, 9);
/// ```
pub fn encode_header(
    command_type: CommandType,
    command_id: CommandId,
    payload_size: u32,
) -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    buf[0..4].copy_from_slice(&MAGIC);
    buf[4..8].copy_from_slice(&(command_type as u32).to_le_bytes());
    buf[8..12].copy_from_slice(&(command_id as u32).to_le_bytes());
    buf[12..16].copy_from_slice(&payload_size.to_le_bytes());
    buf
}

/// Decodes one command header from the beginning of `bytes`.
///
/// # Errors
///
/// [`ProtocolError::InsufficientData`] when fewer than 16 bytes are
/// available, [`ProtocolError::InvalidMagic`] when the sync marker does not
/// match. The dispatch loop treats both as resynchronization events (discard
/// and wait for the next header), not session failures.
pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    if bytes[0..4] != MAGIC {
        return Err(ProtocolError::InvalidMagic {
            found: [bytes[0], bytes[1], bytes[2], bytes[3]],
        });
    }

    Ok(FrameHeader {
        command_type: read_u32(bytes, 4),
        command_id: read_u32(bytes, 8),
        payload_size: read_u32(bytes, 12),
    })
}

/// Decodes a FILE_RANGE request payload.
///
/// `name_len` must agree with the actual number of name bytes present
/// (`payload.len() - 16`) and the name must be valid UTF-8.
///
/// # Errors
///
/// [`ProtocolError::MalformedRequest`] for payloads shorter than the 16-byte
/// prefix, a disagreeing `name_len`, or non-UTF-8 name bytes. All of these
/// are fatal to the session.
pub fn decode_range_request(payload: &[u8]) -> Result<FileRangeRequest, ProtocolError> {
    if payload.len() < RANGE_REQUEST_PREFIX_SIZE {
        return Err(ProtocolError::MalformedRequest(format!(
            "payload of {} bytes is shorter than the {RANGE_REQUEST_PREFIX_SIZE}-byte prefix",
            payload.len()
        )));
    }

    let range_size = read_u32(payload, 0);
    let range_offset = read_u64(payload, 4);
    let name_len = read_u32(payload, 12) as usize;

    let tail = &payload[RANGE_REQUEST_PREFIX_SIZE..];
    if name_len != tail.len() {
        return Err(ProtocolError::MalformedRequest(format!(
            "name_len says {name_len} bytes but {} are present",
            tail.len()
        )));
    }

    let name = std::str::from_utf8(tail)
        .map_err(|e| ProtocolError::MalformedRequest(format!("name is not valid UTF-8: {e}")))?
        .to_string();

    Ok(FileRangeRequest {
        range_size,
        range_offset,
        name,
    })
}

/// Encodes a FILE_RANGE request payload into its wire form.
///
/// The host only ever decodes these; the encoder is the client-side mirror
/// used to drive the engine in tests and benchmarks.
pub fn encode_range_request(request: &FileRangeRequest) -> Vec<u8> {
    let name_bytes = request.name.as_bytes();
    let mut buf = Vec::with_capacity(RANGE_REQUEST_PREFIX_SIZE + name_bytes.len());
    buf.extend_from_slice(&request.range_size.to_le_bytes());
    buf.extend_from_slice(&request.range_offset.to_le_bytes());
    buf.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(name_bytes);
    buf
}

// ── Utility helpers ───────────────────────────────────────────────────────────

// Both helpers assume the caller has already length-checked the buffer.

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
        buf[offset + 4],
        buf[offset + 5],
        buf[offset + 6],
        buf[offset + 7],
    ])
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Header encoding ───────────────────────────────────────────────────────

    #[test]
    fn test_encode_header_produces_exact_wire_layout() {
        // Arrange / Act
        let bytes = encode_header(CommandType::Response, CommandId::List, 0x0102_0304);

        // Assert: magic, then the three little-endian u32 fields
        assert_eq!(&bytes[0..4], b"DBI0");
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_header_round_trip_for_all_known_commands() {
        for ct in [CommandType::Request, CommandType::Response, CommandType::Ack] {
            for id in [
                CommandId::Exit,
                CommandId::ListDeprecated,
                CommandId::FileRange,
                CommandId::List,
            ] {
                for size in [0u32, 1, 16, u32::MAX] {
                    let header = decode_header(&encode_header(ct, id, size)).expect("decode");
                    assert_eq!(header.command_type, ct as u32);
                    assert_eq!(header.command_id, id as u32);
                    assert_eq!(header.payload_size, size);
                }
            }
        }
    }

    #[test]
    fn test_encoded_header_is_exactly_16_bytes() {
        let bytes = encode_header(CommandType::Ack, CommandId::FileRange, 24);
        assert_eq!(bytes.len(), HEADER_SIZE);
    }

    // ── Header decoding errors ────────────────────────────────────────────────

    #[test]
    fn test_decode_empty_buffer_returns_insufficient_data() {
        let result = decode_header(&[]);
        assert_eq!(
            result,
            Err(ProtocolError::InsufficientData {
                needed: 16,
                available: 0
            })
        );
    }

    #[test]
    fn test_decode_truncated_header_returns_insufficient_data() {
        let result = decode_header(&[b'D', b'B', b'I', b'0', 0, 0]);
        assert!(matches!(
            result,
            Err(ProtocolError::InsufficientData { available: 6, .. })
        ));
    }

    #[test]
    fn test_decode_wrong_magic_is_rejected() {
        // Arrange: valid length, wrong marker
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(b"DBI1");

        // Act / Assert
        assert_eq!(
            decode_header(&bytes),
            Err(ProtocolError::InvalidMagic {
                found: *b"DBI1"
            })
        );
    }

    #[test]
    fn test_decode_all_zero_header_is_rejected() {
        let bytes = [0u8; 16];
        assert!(matches!(
            decode_header(&bytes),
            Err(ProtocolError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_decode_keeps_unknown_command_id_raw() {
        // An id of 99 is not a codec error; dispatch decides what to do.
        let mut bytes = encode_header(CommandType::Request, CommandId::Exit, 0);
        bytes[8..12].copy_from_slice(&99u32.to_le_bytes());

        let header = decode_header(&bytes).expect("decode");
        assert_eq!(header.command_id, 99);
        assert!(CommandId::try_from(header.command_id).is_err());
    }

    // ── Range request decoding ────────────────────────────────────────────────

    #[test]
    fn test_range_request_round_trip() {
        // Arrange
        let request = FileRangeRequest {
            range_size: 5,
            range_offset: 2,
            name: "game.nsp".to_string(),
        };

        // Act
        let encoded = encode_range_request(&request);
        let decoded = decode_range_request(&encoded).expect("decode");

        // Assert
        assert_eq!(decoded, request);
        assert_eq!(encoded.len(), RANGE_REQUEST_PREFIX_SIZE + "game.nsp".len());
    }

    #[test]
    fn test_range_request_wire_layout() {
        // Arrange
        let request = FileRangeRequest {
            range_size: 0x11223344,
            range_offset: 0x0102030405060708,
            name: "a".to_string(),
        };

        // Act
        let encoded = encode_range_request(&request);

        // Assert: little-endian fields at fixed offsets, name appended
        assert_eq!(&encoded[0..4], &[0x44, 0x33, 0x22, 0x11]);
        assert_eq!(
            &encoded[4..12],
            &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
        assert_eq!(&encoded[12..16], &1u32.to_le_bytes());
        assert_eq!(&encoded[16..], b"a");
    }

    #[test]
    fn test_range_request_with_empty_name_round_trips() {
        let request = FileRangeRequest {
            range_size: 0,
            range_offset: 0,
            name: String::new(),
        };
        let decoded = decode_range_request(&encode_range_request(&request)).expect("decode");
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_range_request_with_large_offset_round_trips() {
        // Offsets beyond 4 GiB need the full u64 field.
        let request = FileRangeRequest {
            range_size: 0x10_0000,
            range_offset: 5 * 1024 * 1024 * 1024,
            name: "big.xci".to_string(),
        };
        let decoded = decode_range_request(&encode_range_request(&request)).expect("decode");
        assert_eq!(decoded.range_offset, 5 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_range_request_shorter_than_prefix_is_malformed() {
        let result = decode_range_request(&[0u8; 15]);
        assert!(matches!(result, Err(ProtocolError::MalformedRequest(_))));
    }

    #[test]
    fn test_range_request_empty_payload_is_malformed() {
        let result = decode_range_request(&[]);
        assert!(matches!(result, Err(ProtocolError::MalformedRequest(_))));
    }

    #[test]
    fn test_range_request_name_len_mismatch_is_malformed() {
        // Arrange: name_len claims 4 bytes, only 3 follow
        let mut payload = encode_range_request(&FileRangeRequest {
            range_size: 1,
            range_offset: 0,
            name: "abc".to_string(),
        });
        payload[12..16].copy_from_slice(&4u32.to_le_bytes());

        // Act / Assert
        assert!(matches!(
            decode_range_request(&payload),
            Err(ProtocolError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_range_request_invalid_utf8_name_is_malformed() {
        // Arrange: a well-formed prefix with a non-UTF-8 tail
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&0u64.to_le_bytes());
        payload.extend_from_slice(&2u32.to_le_bytes());
        payload.extend_from_slice(&[0xFF, 0xFE]);

        // Act / Assert
        assert!(matches!(
            decode_range_request(&payload),
            Err(ProtocolError::MalformedRequest(_))
        ));
    }
}
