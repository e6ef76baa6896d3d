//! HID transport abstraction.
//!
//! Handles are closed by dropping them, so every successfully opened handle is
//! closed exactly once no matter which path releases it.

use std::ffi::{CStr, CString};

use hidapi::{HidApi, HidDevice};
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::registry::DeviceId;

/// Requested device access.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub struct Access {
    pub read: bool,
    pub write: bool,
    pub shared: bool,
    pub overlapped: bool,
}

impl Access {
    /// Synchronous write-only access.
    pub const fn write_only() -> Self {
        Self { read: false, write: true, shared: false, overlapped: false }
    }
}

/// Open connection to a HID device.
pub trait HidHandle {
    /// Issue a synchronous output report.
    fn write(&self, report: &[u8]) -> Result<usize, TransportError>;
}

/// Platform HID access.
pub trait HidTransport {
    type Handle: HidHandle;

    /// Open every attached HID device.
    fn enumerate(&self) -> Result<Vec<RawDevice<Self::Handle>>, TransportError>;

    /// Open an additional handle to the device at `path`.
    fn open(&self, path: &CStr, access: Access) -> Result<Self::Handle, TransportError>;
}

/// Enumerated device which has not been registered yet.
pub struct RawDevice<H> {
    pub id: DeviceId,
    pub path: CString,
    pub handle: H,
}

impl<H> RawDevice<H> {
    /// Close the device handle without registering it.
    pub fn close(self) {
        trace!("Closing unregistered device {} ({:?})", self.id, self.path);
        drop(self.handle);
    }
}

/// Transport backed by the system HID library.
pub struct HidApiTransport {
    api: HidApi,
}

impl HidApiTransport {
    pub fn new() -> Result<Self, TransportError> {
        let api = HidApi::new().map_err(|err| TransportError::Api(err.to_string()))?;
        Ok(Self { api })
    }
}

impl HidHandle for HidDevice {
    fn write(&self, report: &[u8]) -> Result<usize, TransportError> {
        HidDevice::write(self, report).map_err(|err| TransportError::Write(err.to_string()))
    }
}

impl HidTransport for HidApiTransport {
    type Handle = HidDevice;

    fn enumerate(&self) -> Result<Vec<RawDevice<HidDevice>>, TransportError> {
        let mut devices = Vec::new();

        for info in self.api.device_list() {
            let id = DeviceId::new(info.vendor_id(), info.product_id());

            // Devices we are not permitted to open are not attached as far as we care.
            match self.api.open_path(info.path()) {
                Ok(handle) => {
                    devices.push(RawDevice { id, path: info.path().to_owned(), handle })
                },
                Err(err) => debug!("Skipping device {} ({:?}): {}", id, info.path(), err),
            }
        }

        if devices.is_empty() {
            return Err(TransportError::Enumerate("no HID devices could be opened".into()));
        }

        Ok(devices)
    }

    fn open(&self, path: &CStr, access: Access) -> Result<HidDevice, TransportError> {
        // hidapi always opens devices for shared, synchronous reading and writing.
        if access.overlapped || !access.shared {
            debug!("Ignoring unsupported access mode {:?} for {:?}", access, path);
        }

        let handle =
            self.api.open_path(path).map_err(|err| TransportError::Open(err.to_string()))?;

        if access.write && !access.read {
            debug!("Opened {:?} for writing", path);
        }

        Ok(handle)
    }
}
