//! Enumerated HID devices.

use std::collections::TryReserveError;
use std::ffi::{CStr, CString};
use std::fmt::{self, Display, Formatter};

use tracing::{debug, error, trace, warn};

use crate::error::RegistryError;
use crate::transport::{HidTransport, RawDevice};

/// USB vendor/product identifier pair.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct DeviceId {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceId {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self { vendor_id, product_id }
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Registered HID device.
pub struct DeviceRecord<H> {
    id: DeviceId,
    path: CString,
    handle: Option<H>,
}

impl<H> DeviceRecord<H> {
    fn new(raw: RawDevice<H>) -> Self {
        Self { id: raw.id, path: raw.path, handle: Some(raw.handle) }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Path for opening additional handles to the same device.
    pub fn path(&self) -> &CStr {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Close the registry's handle to this device.
    fn close(&mut self) {
        if self.handle.take().is_some() {
            trace!("Closed device {} ({:?})", self.id, self.path);
        }
    }
}

/// Ordered collection of enumerated devices.
///
/// The registry owns every registered handle until [`Registry::destroy_all`], which
/// also runs when the registry is dropped.
pub struct Registry<H> {
    records: Vec<DeviceRecord<H>>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self { records: Vec::new() }
    }
}

impl<H> Registry<H> {
    /// Register all currently attached devices.
    ///
    /// Enumeration and allocation failures are logged and leave the registry empty.
    pub fn build<T>(transport: &T) -> Self
    where
        T: HidTransport<Handle = H>,
    {
        let raw = match transport.enumerate() {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Failed to find HID devices: {}", err);
                return Self::default();
            },
        };

        match Self::from_raw(raw, |records| records.try_reserve(1)) {
            Ok(registry) => {
                debug!("Registered {} HID devices", registry.len());
                registry
            },
            Err(err) => {
                error!("{}", err);
                Self::default()
            },
        }
    }

    /// Wrap enumerated devices in records, using `reserve` to grow the record storage.
    ///
    /// On failure every handle, registered or not, is closed before returning.
    fn from_raw<F>(raw: Vec<RawDevice<H>>, mut reserve: F) -> Result<Self, RegistryError>
    where
        F: FnMut(&mut Vec<DeviceRecord<H>>) -> Result<(), TryReserveError>,
    {
        let mut registry = Self::default();
        let mut raw = raw.into_iter();

        while let Some(device) = raw.next() {
            if let Err(err) = reserve(&mut registry.records) {
                registry.destroy_all();
                device.close();
                raw.for_each(RawDevice::close);
                return Err(err.into());
            }

            registry.records.push(DeviceRecord::new(device));
        }

        Ok(registry)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord<H>> {
        self.records.iter()
    }

    /// Close all handles and remove all records.
    pub fn destroy_all(&mut self) {
        for record in &mut self.records {
            record.close();
        }
        self.records.clear();
    }
}

impl<H> Drop for Registry<H> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

/// Lookup of a fixed device identity.
#[derive(Debug, Copy, Clone)]
pub struct DeviceFinder {
    target: DeviceId,
}

impl DeviceFinder {
    pub const fn new(target: DeviceId) -> Self {
        Self { target }
    }

    pub fn target(&self) -> DeviceId {
        self.target
    }

    /// First registered device matching the target identity.
    pub fn find<'a, H>(&self, registry: &'a Registry<H>) -> Option<&'a DeviceRecord<H>> {
        registry.iter().find(|record| record.id() == self.target)
    }
}
