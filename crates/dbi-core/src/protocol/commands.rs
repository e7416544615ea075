//! Command codes and wire constants for the DBI transfer protocol.
//!
//! The numeric values are fixed by the protocol the console-side client
//! speaks; they must never change.

// ── Wire constants ────────────────────────────────────────────────────────────

/// Frame sync marker; the first four bytes of every valid header.
pub const MAGIC: [u8; 4] = *b"DBI0";

/// Total size of the fixed command header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Size of the fixed prefix of a FILE_RANGE request payload
/// (range_size + range_offset + name_len, before the name bytes).
pub const RANGE_REQUEST_PREFIX_SIZE: usize = 16;

/// Maximum number of file bytes moved per transport write while streaming a
/// range (1 MiB).
pub const CHUNK_SIZE: usize = 0x10_0000;

// ── Command type codes ────────────────────────────────────────────────────────

/// Handshake phase marker carried in every header.
///
/// Commands from the client arrive as `Request`; the host answers with `Ack`
/// (ready for payload) and `Response` (data follows) headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandType {
    Request = 0,
    Response = 1,
    Ack = 2,
}

impl TryFrom<u32> for CommandType {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            0 => Ok(CommandType::Request),
            1 => Ok(CommandType::Response),
            2 => Ok(CommandType::Ack),
            _ => Err(()),
        }
    }
}

// ── Command id codes ──────────────────────────────────────────────────────────

/// All command ids the client can issue.
///
/// `ListDeprecated` is still assigned on the wire but no longer served; the
/// dispatch loop ends the session when it sees one, the same as any
/// unrecognized id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandId {
    Exit = 0,
    ListDeprecated = 1,
    FileRange = 2,
    List = 3,
}

impl TryFrom<u32> for CommandId {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            0 => Ok(CommandId::Exit),
            1 => Ok(CommandId::ListDeprecated),
            2 => Ok(CommandId::FileRange),
            3 => Ok(CommandId::List),
            _ => Err(()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
