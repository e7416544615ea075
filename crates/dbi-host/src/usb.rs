//! USB transport over libusb bulk transfers.
//!
//! Implements [`Transport`] for the console's USB link using `rusb`.  The
//! installer running on the console presents itself as a vendor-specific
//! device with one interface carrying a bulk IN / bulk OUT endpoint pair;
//! everything the protocol exchanges moves through those two endpoints.
//!
//! # What is a bulk transfer? (for beginners)
//!
//! USB defines several transfer types; *bulk* is the one for large,
//! non-time-critical data with guaranteed delivery.  A bulk read blocks
//! until the device sends data (or the timeout expires), a bulk write
//! blocks until the device accepts the bytes.  That blocking behaviour is
//! exactly what the synchronous command loop in `dbi-core` is built
//! around.
//!
//! # The open sequence
//!
//! ```text
//! open by VID:PID → reset → set configuration 1 → claim interface 0
//!                 → read config descriptor → find bulk IN + OUT addresses
//! ```
//!
//! The reset clears any half-finished exchange left over from a previous
//! host process; without it the first header read can return stale bytes
//! from an aborted transfer.
//!
//! # Timeouts
//!
//! libusb treats a zero timeout as "wait forever", and [`Transport`]
//! carries that convention: the command loop passes `Duration::ZERO` to
//! block indefinitely for the next frame.

use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, Direction, TransferType, UsbContext};
use thiserror::Error;
use tracing::debug;

use dbi_core::transport::{Transport, TransportError};

// ── Device identity ───────────────────────────────────────────────────────────

/// USB vendor id the console enumerates with.
pub const DEFAULT_VENDOR_ID: u16 = 0x057E;

/// USB product id the console enumerates with.
pub const DEFAULT_PRODUCT_ID: u16 = 0x3000;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Error type for device discovery and the open sequence.
///
/// `DeviceNotFound` is the only variant the wait-for-device loop treats as
/// routine; everything else indicates a device or permission problem worth
/// surfacing loudly.
#[derive(Debug, Error)]
pub enum UsbError {
    /// libusb itself could not be initialised.
    #[error("USB context initialisation failed")]
    Context(#[source] rusb::Error),

    /// No device with the requested identity is attached.
    #[error("no device {vendor_id:04X}:{product_id:04X} attached")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// One step of the open sequence failed on an attached device.
    #[error("device setup failed while {stage}")]
    Setup {
        stage: &'static str,
        #[source]
        source: rusb::Error,
    },

    /// Interface 0 does not expose the expected bulk endpoint pair.
    #[error("interface 0 has no bulk {direction} endpoint")]
    MissingBulkEndpoint { direction: &'static str },
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// A claimed bulk link to the console.
///
/// Owns the device handle exclusively; dropping the transport releases the
/// claimed interface and closes the handle.
pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    endpoint_in: u8,
    endpoint_out: u8,
}

impl UsbTransport {
    /// Opens the device with the given identity and runs the full open
    /// sequence described in the module docs.
    ///
    /// # Errors
    ///
    /// Returns [`UsbError::DeviceNotFound`] when no matching device is
    /// attached (the caller's cue to keep polling), and other [`UsbError`]
    /// variants when an attached device refuses a setup step or lacks the
    /// bulk endpoint pair.
    pub fn open(vendor_id: u16, product_id: u16) -> Result<Self, UsbError> {
        let context = Context::new().map_err(UsbError::Context)?;
        let mut handle = context
            .open_device_with_vid_pid(vendor_id, product_id)
            .ok_or(UsbError::DeviceNotFound {
                vendor_id,
                product_id,
            })?;

        handle.reset().map_err(|source| UsbError::Setup {
            stage: "resetting the device",
            source,
        })?;
        handle
            .set_active_configuration(1)
            .map_err(|source| UsbError::Setup {
                stage: "selecting configuration 1",
                source,
            })?;
        handle.claim_interface(0).map_err(|source| UsbError::Setup {
            stage: "claiming interface 0",
            source,
        })?;

        let (endpoint_in, endpoint_out) = discover_bulk_endpoints(&handle.device())?;
        debug!(
            "USB link ready: device {vendor_id:04X}:{product_id:04X}, \
             bulk IN 0x{endpoint_in:02X}, bulk OUT 0x{endpoint_out:02X}"
        );

        Ok(Self {
            handle,
            endpoint_in,
            endpoint_out,
        })
    }
}

impl Transport for UsbTransport {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        self.handle
            .read_bulk(self.endpoint_in, buf, timeout)
            .map_err(|e| TransportError::Read(e.to_string()))
    }

    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<(), TransportError> {
        let written = self
            .handle
            .write_bulk(self.endpoint_out, buf, timeout)
            .map_err(|e| TransportError::Write(e.to_string()))?;
        if written != buf.len() {
            return Err(TransportError::Write(format!(
                "short bulk write: {written} of {} bytes",
                buf.len()
            )));
        }
        Ok(())
    }
}

/// Finds the bulk IN and OUT endpoint addresses on interface 0, first alt
/// setting, of the active configuration.  The installer exposes exactly one
/// pair there; additional endpoints of other types are skipped.
fn discover_bulk_endpoints(device: &Device<Context>) -> Result<(u8, u8), UsbError> {
    let config = device
        .active_config_descriptor()
        .map_err(|source| UsbError::Setup {
            stage: "reading the config descriptor",
            source,
        })?;

    let mut bulk_in = None;
    let mut bulk_out = None;
    if let Some(descriptor) = config
        .interfaces()
        .next()
        .and_then(|interface| interface.descriptors().next())
    {
        for endpoint in descriptor.endpoint_descriptors() {
            if endpoint.transfer_type() != TransferType::Bulk {
                continue;
            }
            match endpoint.direction() {
                Direction::In if bulk_in.is_none() => bulk_in = Some(endpoint.address()),
                Direction::Out if bulk_out.is_none() => bulk_out = Some(endpoint.address()),
                _ => {}
            }
        }
    }

    match (bulk_in, bulk_out) {
        (Some(input), Some(output)) => Ok((input, output)),
        (None, _) => Err(UsbError::MissingBulkEndpoint { direction: "IN" }),
        (_, None) => Err(UsbError::MissingBulkEndpoint { direction: "OUT" }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_identity_matches_the_console() {
        // These values are what the installer enumerates with; changing
        // them silently would break every existing setup.
        assert_eq!(DEFAULT_VENDOR_ID, 0x057E);
        assert_eq!(DEFAULT_PRODUCT_ID, 0x3000);
    }

    #[test]
    fn test_device_not_found_formats_identity_as_hex() {
        let err = UsbError::DeviceNotFound {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
        };

        assert_eq!(err.to_string(), "no device 057E:3000 attached");
    }

    #[test]
    fn test_setup_error_names_the_failed_stage() {
        let err = UsbError::Setup {
            stage: "claiming interface 0",
            source: rusb::Error::Busy,
        };

        assert!(err.to_string().contains("claiming interface 0"));
    }

    #[test]
    fn test_missing_endpoint_error_names_the_direction() {
        let err = UsbError::MissingBulkEndpoint { direction: "IN" };

        assert_eq!(err.to_string(), "interface 0 has no bulk IN endpoint");
    }
}
