//! Mock transport for unit and integration testing.
//!
//! # Why a mock transport?
//!
//! The real transport is a USB bulk link to a physical console. It cannot
//! exist in CI, and even on a developer machine a test run must not depend
//! on a device being plugged in. The `MockTransport` replaces the link with
//! two in-memory queues:
//!
//! - **reads**: byte chunks scripted by the test, handed out one chunk per
//!   `read` call. This models the packet-at-a-time arrival of bulk
//!   transfers, including deliberately short ones.
//! - **writes**: every buffer the engine writes, recorded in order, so
//!   assertions can check the exact frame sequence a client would see.
//!
//! # Failure injection
//!
//! Set `should_fail_reads` or `should_fail_writes` to make every following
//! call on that side fail, exercising the fatal-error paths. A `read` with
//! an exhausted script also fails, which doubles as proof that the engine
//! attempted no further reads after a terminating command.

use std::collections::VecDeque;
use std::time::Duration;

use crate::transport::{Transport, TransportError};

/// Scripted in-memory [`Transport`].
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Chunks handed out one per `read` call.
    pub reads: VecDeque<Vec<u8>>,
    /// Every buffer passed to `write`, in order.
    pub writes: Vec<Vec<u8>>,
    /// When set, every read fails with a link error.
    pub should_fail_reads: bool,
    /// When set, every write fails with a link error.
    pub should_fail_writes: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one scripted read chunk.
    pub fn script_read(&mut self, chunk: impl Into<Vec<u8>>) {
        self.reads.push_back(chunk.into());
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, TransportError> {
        if self.should_fail_reads {
            return Err(TransportError::Read("injected link failure".to_string()));
        }
        let chunk = self
            .reads
            .pop_front()
            .ok_or_else(|| TransportError::Read("read script exhausted".to_string()))?;
        assert!(
            chunk.len() <= buf.len(),
            "scripted chunk of {} bytes does not fit read buffer of {}",
            chunk.len(),
            buf.len()
        );
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    fn write(&mut self, buf: &[u8], _timeout: Duration) -> Result<(), TransportError> {
        if self.should_fail_writes {
            return Err(TransportError::Write("injected link failure".to_string()));
        }
        self.writes.push(buf.to_vec());
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
