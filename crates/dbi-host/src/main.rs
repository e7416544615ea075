//! DBI backend host entry point.
//!
//! This binary serves a directory of installable titles to the DBI
//! installer running on a console attached over USB.  The console drives
//! the whole exchange: it lists the available titles, then pulls byte
//! ranges of one title at a time until the install completes.
//!
//! # Usage
//!
//! ```text
//! dbi-host [OPTIONS] <TITLES_DIR>
//!
//! Arguments:
//!   <TITLES_DIR>  Directory scanned (recursively) for .nsp/.nsz/.xci files
//!
//! Options:
//!   --vid <ID>  USB vendor id of the console, hex or decimal [default: 0x057E]
//!   --pid <ID>  USB product id of the console, hex or decimal [default: 0x3000]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI arguments take precedence when both are present.
//!
//! | Variable         | Default  | Description                         |
//! |------------------|----------|-------------------------------------|
//! | `DBI_TITLES_DIR` | (none)   | Titles directory (positional arg)   |
//! | `DBI_VID`        | `0x057E` | USB vendor id to wait for           |
//! | `DBI_PID`        | `0x3000` | USB product id to wait for          |
//! | `RUST_LOG`       | `info`   | Log filter (`tracing` EnvFilter)    |
//!
//! # Lifecycle
//!
//! ```text
//! parse CLI → validate titles dir → wait for device (1 s poll)
//!     → run session ──── clean EXIT ──────────→ exit 0
//!            └───────── link lost ──→ back to waiting
//!            └───────── other fatal error ───→ exit non-zero
//! ```
//!
//! A lost link (cable pulled, console rebooted) sends the host back to
//! waiting for the device; a clean EXIT from the installer ends the
//! process.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dbi_core::{Session, SessionError};
use dbi_host::usb::{UsbError, UsbTransport};

/// Delay between open attempts while no device is attached.
const DEVICE_POLL_INTERVAL: Duration = Duration::from_secs(1);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// DBI backend host.
///
/// Serves installable titles from a directory to the DBI installer over
/// USB.  The `#[derive(Parser)]` macro from `clap` generates the argument
/// parser from the struct fields and their `#[arg(...)]` attributes.
#[derive(Debug, Parser)]
#[command(
    name = "dbi-host",
    about = "USB file server for the DBI installer",
    version
)]
struct Cli {
    /// Directory scanned recursively for installable titles.
    ///
    /// Every regular file ending in `.nsp`, `.nsz`, or `.xci` under this
    /// directory (at any depth) is offered to the console by bare file
    /// name.
    #[arg(env = "DBI_TITLES_DIR")]
    titles_dir: PathBuf,

    /// USB vendor id of the console, hex (`0x057E`) or decimal.
    #[arg(long, default_value = "0x057E", value_parser = parse_usb_id, env = "DBI_VID")]
    vid: u16,

    /// USB product id of the console, hex (`0x3000`) or decimal.
    #[arg(long, default_value = "0x3000", value_parser = parse_usb_id, env = "DBI_PID")]
    pid: u16,
}

/// Parses a USB id in either `0x`-prefixed hex or plain decimal.
///
/// USB ids are conventionally written in hex (`lsusb` prints `057e:3000`),
/// but decimal is accepted so scripted callers don't have to format.
fn parse_usb_id(s: &str) -> Result<u16, String> {
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    u16::from_str_radix(digits, radix).map_err(|e| format!("invalid USB id '{s}': {e}"))
}

/// Checks that the titles path exists and is a directory before any USB
/// work starts, so a typo fails in milliseconds instead of after a replug.
fn validate_titles_root(path: &Path) -> anyhow::Result<PathBuf> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("cannot access titles directory '{}'", path.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("titles path '{}' is not a directory", path.display());
    }
    Ok(path.to_path_buf())
}

// ── Device polling ────────────────────────────────────────────────────────────

/// Polls for the console until a transport opens.
///
/// `DeviceNotFound` is the normal state while the user is still starting
/// the installer, so it logs at info level once per attempt; any other
/// open failure (permissions, a half-enumerated device) is warned about
/// and retried on the same schedule.
fn wait_for_device(vendor_id: u16, product_id: u16) -> UsbTransport {
    loop {
        match UsbTransport::open(vendor_id, product_id) {
            Ok(transport) => {
                info!("console connected");
                return transport;
            }
            Err(UsbError::DeviceNotFound { .. }) => {
                info!("waiting for the console to connect");
            }
            Err(e) => {
                warn!(error = %e, "USB open failed, retrying");
            }
        }
        thread::sleep(DEVICE_POLL_INTERVAL);
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. `tracing_subscriber` is initialised; the log level is controlled by
///    the `RUST_LOG` environment variable (e.g. `RUST_LOG=debug`).
/// 2. CLI arguments are parsed with `clap` into a [`Cli`] struct.
/// 3. The titles directory is validated up front.
/// 4. The host polls for the console, then runs one session over the
///    opened transport.  A transport failure returns to polling; a clean
///    EXIT ends the process.
fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `EnvFilter::try_from_default_env()` reads the `RUST_LOG` environment
    // variable.  If it is absent or invalid, we fall back to `info` level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Parse CLI arguments ───────────────────────────────────────────────────
    //
    // `Cli::parse()` reads from `std::env::args()` and exits with a usage
    // message if the titles directory is missing or a value is invalid.
    let cli = Cli::parse();
    let titles_root = validate_titles_root(&cli.titles_dir)?;

    info!(
        "dbi-host starting: serving '{}' to device {:04X}:{:04X}",
        titles_root.display(),
        cli.vid,
        cli.pid
    );

    // ── Serve loop ────────────────────────────────────────────────────────────
    loop {
        let transport = wait_for_device(cli.vid, cli.pid);
        let mut session = Session::new(transport, titles_root.clone());
        match session.run() {
            Ok(()) => {
                info!("installer ended the session, shutting down");
                return Ok(());
            }
            Err(SessionError::Transport(e)) => {
                // Dropping the session releases the claimed interface, so
                // a replugged console can be reopened cleanly.
                warn!(error = %e, "link lost, waiting for the console to return");
            }
            Err(e) => {
                return Err(e).context("session aborted");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
