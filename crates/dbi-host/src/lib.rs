//! dbi-host library crate.
//!
//! The host side of the DBI backend is split in two: this library holds the
//! USB implementation of the [`dbi_core::Transport`] trait, and `main.rs`
//! owns everything process-shaped (CLI parsing, logging setup, the
//! wait-for-device loop, exit codes).
//!
//! Keeping the transport in a library module means its open sequence and
//! error taxonomy are documented and unit-testable apart from the entry
//! point, and the binary stays a thin driver:
//!
//! ```text
//! DBI installer (console)
//!       ↕  USB bulk transfer
//! dbi-host           ← this process
//!   usb/             rusb-backed Transport implementation
//!       ↕  Transport trait
//! dbi-core           frame codec, title index, session engine
//! ```

/// USB transport: device discovery, the open sequence, and bulk I/O.
pub mod usb;
