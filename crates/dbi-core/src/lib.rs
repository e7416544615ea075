//! # dbi-core
//!
//! Shared library for the DBI backend containing the wire protocol codec,
//! the title index, and the session engine that serves file ranges to an
//! installer client.
//!
//! This crate has zero dependencies on USB APIs or any specific link; the
//! host binary supplies the actual device I/O through the [`Transport`]
//! trait.
//!
//! # Architecture overview (for beginners)
//!
//! The DBI backend is a file server for a console-side installer: the
//! console asks "what titles do you have?" and then pulls the bytes of one
//! title, range by range, over a USB bulk link.  The host never initiates
//! anything; it answers commands.
//!
//! This crate (`dbi-core`) is the protocol side of that. It defines:
//!
//! - **`protocol`** – How bytes travel over the link.  Every frame starts
//!   with a 16-byte header (magic, command type, command id, payload size)
//!   and the codec converts between those bytes and typed Rust structs.
//!
//! - **`titles`** – The title index.  A recursive scan of one directory
//!   maps installable file names (`.nsp`, `.nsz`, `.xci`) to their
//!   absolute paths, so the console can request a title by bare name no
//!   matter how deep it sits.
//!
//! - **`session`** – The command loop.  One [`Session`] owns one transport
//!   and dispatches EXIT, LIST, and FILE_RANGE commands until the client
//!   disconnects, streaming requested file ranges in 1 MiB chunks.
//!
//! - **`transport`** – The seam between protocol logic and device I/O: the
//!   [`Transport`] trait plus a scripted mock for tests.

// Declare the four top-level modules.  Rust will look for each in a file
// or subdirectory with the same name (e.g., src/protocol/mod.rs).
pub mod protocol;
pub mod session;
pub mod titles;
pub mod transport;

// Re-export the most-used types at the crate root so callers can write
// `dbi_core::Session` instead of `dbi_core::session::Session`.
pub use protocol::codec::{
    decode_header, decode_range_request, encode_header, encode_range_request, FileRangeRequest,
    FrameHeader, ProtocolError,
};
pub use protocol::commands::{CommandId, CommandType, CHUNK_SIZE, HEADER_SIZE, MAGIC};
pub use session::{Session, SessionError};
pub use titles::{TitleError, TitleIndex, ELIGIBLE_EXTENSIONS};
pub use transport::{Transport, TransportError, NO_TIMEOUT};
