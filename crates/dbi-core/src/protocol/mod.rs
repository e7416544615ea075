//! Protocol module containing command codes and the header/payload codec.

pub mod codec;
pub mod commands;

pub use codec::{
    decode_header, decode_range_request, encode_header, encode_range_request, FileRangeRequest,
    FrameHeader, ProtocolError,
};
pub use commands::{
    CommandId, CommandType, CHUNK_SIZE, HEADER_SIZE, MAGIC, RANGE_REQUEST_PREFIX_SIZE,
};
