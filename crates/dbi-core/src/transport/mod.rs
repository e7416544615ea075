//! Transport boundary: blocking byte-oriented read/write over the bulk link.
//!
//! The session engine exclusively owns one [`Transport`] for its whole
//! lifetime. The USB implementation lives in the host binary; tests drive
//! the engine with the in-memory [`mock::MockTransport`].
//!
//! Establishing and re-establishing the link is the caller's concern. An
//! implementation is handed over ready to use, and once a call fails the
//! session is over; the engine never retries.

pub mod mock;

use std::time::Duration;

use thiserror::Error;

/// Timeout value meaning "wait indefinitely", following the underlying
/// bulk-transfer convention.
pub const NO_TIMEOUT: Duration = Duration::ZERO;

/// Error type for transport operations. Either variant is fatal to the
/// session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A read from the link failed.
    #[error("read failed: {0}")]
    Read(String),

    /// A write to the link failed or moved fewer bytes than requested.
    #[error("write failed: {0}")]
    Write(String),
}

/// Blocking byte transport with a per-call timeout.
///
/// Reads may return fewer bytes than the buffer holds; the caller decides
/// what a short transfer means (the dispatch loop treats short header reads
/// as resynchronization). Writes are all-or-nothing.
pub trait Transport {
    /// Reads up to `buf.len()` bytes, returning how many were transferred.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Read`] on link failure.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// Writes all of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Write`] on link failure or a short write.
    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<(), TransportError>;
}
