//! Session engine: the command dispatch loop and the range streamer.
//!
//! One session serves one client over one exclusively-owned transport. The
//! loop blocks for a 16-byte header, silently discards anything short or
//! not magic-marked (resynchronization, the client may still be settling),
//! and dispatches on the command id: EXIT answers with a bare response and
//! ends the session, LIST rebuilds the title index and sends the listing,
//! FILE_RANGE streams a byte range of one file in 1 MiB chunks, and any
//! other id is answered like EXIT. Every data-bearing command follows the
//! request/response/ack handshake the client expects.
//!
//! All errors other than resynchronization are fatal: the loop returns and
//! the caller tears the transport down.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::protocol::codec::{self, FrameHeader, ProtocolError};
use crate::protocol::commands::{CommandId, CommandType, CHUNK_SIZE, HEADER_SIZE};
use crate::titles::{TitleError, TitleIndex};
use crate::transport::{Transport, TransportError, NO_TIMEOUT};

/// Error type for a protocol session. Every variant ends the session; none
/// is retried.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The link failed mid-command.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A request violated the wire layout.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The titles root could not be scanned.
    #[error("title scan failed: {0}")]
    Titles(#[from] TitleError),

    /// The requested file does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The requested file exists but could not be opened.
    #[error("cannot open {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the requested range out of the file failed.
    #[error("error reading {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested range extends past the end of the file.
    #[error("range {offset}+{size} exceeds length {file_len} of {path}")]
    RangeOutOfBounds {
        path: PathBuf,
        offset: u64,
        size: u32,
        file_len: u64,
    },
}

/// One protocol session.
///
/// Owns the transport and the current title index for its whole lifetime.
/// The index starts empty and is rebuilt by every LIST; a FILE_RANGE that
/// arrives first resolves names as literal paths only.
pub struct Session<T: Transport> {
    transport: T,
    titles_root: PathBuf,
    titles: TitleIndex,
}

impl<T: Transport> Session<T> {
    /// Creates a session over an already-established transport.
    pub fn new(transport: T, titles_root: PathBuf) -> Self {
        Self {
            transport,
            titles_root,
            titles: TitleIndex::new(),
        }
    }

    /// Runs the dispatch loop until the client ends the session or a fatal
    /// error occurs.
    ///
    /// Returns `Ok(())` on graceful termination (EXIT or an unrecognized
    /// command id). After termination no further reads or writes happen.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] on any transport, protocol, or resource
    /// failure. The caller is expected to tear down the transport.
    pub fn run(&mut self) -> Result<(), SessionError> {
        info!("entering command loop");
        loop {
            let Some(header) = self.await_header()? else {
                continue;
            };
            debug!(
                command_type = header.command_type,
                command_id = header.command_id,
                payload_size = header.payload_size,
                "command header received"
            );

            match CommandId::try_from(header.command_id) {
                Ok(CommandId::Exit) => {
                    info!("exit requested");
                    self.respond_exit()?;
                    return Ok(());
                }
                Ok(CommandId::List) => self.handle_list()?,
                Ok(CommandId::FileRange) => self.handle_file_range(header.payload_size)?,
                Ok(CommandId::ListDeprecated) | Err(()) => {
                    warn!(
                        command_id = header.command_id,
                        "unrecognized command id, ending session"
                    );
                    self.respond_exit()?;
                    return Ok(());
                }
            }
        }
    }

    /// The title index retained from the most recent LIST.
    pub fn titles(&self) -> &TitleIndex {
        &self.titles
    }

    /// Returns the transport, consuming the session.
    pub fn into_transport(self) -> T {
        self.transport
    }

    // ── Dispatch states ───────────────────────────────────────────────────────

    /// Blocks for the next header. `None` means the bytes read do not form
    /// a valid header (short transfer or wrong magic) and the caller should
    /// keep waiting; only link failures are errors here.
    fn await_header(&mut self) -> Result<Option<FrameHeader>, SessionError> {
        let mut buf = [0u8; HEADER_SIZE];
        let transferred = self.transport.read(&mut buf, NO_TIMEOUT)?;
        if transferred != HEADER_SIZE {
            debug!(transferred, "short header read, waiting for next frame");
            return Ok(None);
        }
        match codec::decode_header(&buf) {
            Ok(header) => Ok(Some(header)),
            Err(e) => {
                debug!(error = %e, "discarding invalid header");
                Ok(None)
            }
        }
    }

    /// Answers EXIT (and any unrecognized command) with a bare response
    /// header.
    fn respond_exit(&mut self) -> Result<(), SessionError> {
        let header = codec::encode_header(CommandType::Response, CommandId::Exit, 0);
        self.transport.write(&header, NO_TIMEOUT)?;
        Ok(())
    }

    /// Serves LIST: rebuilds the title index, announces the listing size,
    /// waits for the client's ack, then sends the listing bytes. The fresh
    /// index stays behind for subsequent FILE_RANGE lookups.
    fn handle_list(&mut self) -> Result<(), SessionError> {
        self.titles = TitleIndex::scan(&self.titles_root)?;
        let listing = self.titles.render_listing();
        info!(
            titles = self.titles.len(),
            bytes = listing.len(),
            root = %self.titles_root.display(),
            "serving title list"
        );

        let header =
            codec::encode_header(CommandType::Response, CommandId::List, listing.len() as u32);
        self.transport.write(&header, NO_TIMEOUT)?;
        self.read_ack()?;
        self.transport.write(listing.as_bytes(), NO_TIMEOUT)?;
        Ok(())
    }

    /// Serves FILE_RANGE: ack the request header, read and parse the
    /// request payload, announce the transfer size, wait for the client's
    /// ack, then stream the range.
    fn handle_file_range(&mut self, payload_size: u32) -> Result<(), SessionError> {
        let ack = codec::encode_header(CommandType::Ack, CommandId::FileRange, payload_size);
        self.transport.write(&ack, NO_TIMEOUT)?;

        let mut payload = vec![0u8; payload_size as usize];
        self.read_exact(&mut payload)?;
        let request = codec::decode_range_request(&payload)?;
        info!(
            name = %request.name,
            offset = request.range_offset,
            size = request.range_size,
            "serving file range"
        );

        let path = self.resolve_request_path(&request.name);

        let response =
            codec::encode_header(CommandType::Response, CommandId::FileRange, request.range_size);
        self.transport.write(&response, NO_TIMEOUT)?;
        self.read_ack()?;

        self.stream_range(&path, request.range_offset, request.range_size)
    }

    /// Resolves a client-supplied name to the path to open: the cached
    /// absolute path when the index knows the name, otherwise the literal
    /// name relative to the titles root.
    fn resolve_request_path(&self, name: &str) -> PathBuf {
        match self.titles.resolve(name) {
            Some(cached) => cached.to_path_buf(),
            None => self.titles_root.join(name),
        }
    }

    // ── Range streaming ───────────────────────────────────────────────────────

    /// Streams `size` bytes of `path` starting at `offset`, in chunks of at
    /// most [`CHUNK_SIZE`]. The whole range is bounds-checked against the
    /// file length before any byte moves, so an over-long request transfers
    /// nothing. The file handle is scoped to this call.
    fn stream_range(&mut self, path: &Path, offset: u64, size: u32) -> Result<(), SessionError> {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(SessionError::FileOpen {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let file_len = file
            .metadata()
            .map_err(|source| SessionError::FileRead {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        match offset.checked_add(u64::from(size)) {
            Some(end) if end <= file_len => {}
            _ => {
                return Err(SessionError::RangeOutOfBounds {
                    path: path.to_path_buf(),
                    offset,
                    size,
                    file_len,
                });
            }
        }

        file.seek(SeekFrom::Start(offset))
            .map_err(|source| SessionError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;

        let mut chunk = vec![0u8; CHUNK_SIZE.min(size as usize)];
        let mut remaining = size as usize;
        while remaining > 0 {
            let take = CHUNK_SIZE.min(remaining);
            file.read_exact(&mut chunk[..take])
                .map_err(|source| SessionError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?;
            self.transport.write(&chunk[..take], NO_TIMEOUT)?;
            remaining -= take;
        }

        debug!(bytes = size, path = %path.display(), "range transfer complete");
        Ok(())
    }

    // ── Transport helpers ─────────────────────────────────────────────────────

    /// Reads the 16-byte ack the client sends between our response header
    /// and the data. Its contents are logged, never validated.
    fn read_ack(&mut self) -> Result<(), SessionError> {
        let mut buf = [0u8; HEADER_SIZE];
        let transferred = self.transport.read(&mut buf, NO_TIMEOUT)?;
        if transferred != HEADER_SIZE {
            debug!(transferred, "short ack read");
            return Ok(());
        }
        match codec::decode_header(&buf) {
            Ok(header) => debug!(
                command_type = header.command_type,
                command_id = header.command_id,
                payload_size = header.payload_size,
                "ack received"
            ),
            Err(e) => debug!(error = %e, "unparseable ack received"),
        }
        Ok(())
    }

    /// Reads until `buf` is full. Payload reads need exactly-n semantics;
    /// a link that returns no data while bytes are outstanding is dead.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SessionError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.transport.read(&mut buf[filled..], NO_TIMEOUT)?;
            if n == 0 {
                return Err(SessionError::Transport(TransportError::Read(format!(
                    "link returned no data with {} bytes outstanding",
                    buf.len() - filled
                ))));
            }
            filled += n;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
