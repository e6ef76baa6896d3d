//! Webmail Window LED control.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::Error;
use crate::pattern::LedMask;
use crate::registry::DeviceRecord;
use crate::transport::{Access, HidHandle, HidTransport};

/// Output report ID.
const REPORT_ID: u8 = 0x00;

/// Output report payload length, excluding the report ID.
const REPORT_LEN: usize = 5;

/// Build the output report carrying an LED mask.
pub fn report(mask: LedMask) -> Bytes {
    let mut buf = BytesMut::with_capacity(REPORT_LEN + 1);

    buf.put_u8(REPORT_ID);
    buf.put_u8(mask.bits());

    // Padding.
    buf.put_bytes(0x00, REPORT_LEN - 1);

    buf.freeze()
}

/// Write an LED mask to a registered device.
///
/// This uses a separate write-only handle, the registry's handle is left untouched.
pub fn set_led<T: HidTransport>(
    transport: &T,
    record: &DeviceRecord<T::Handle>,
    mask: LedMask,
) -> Result<(), Error> {
    let handle = transport.open(record.path(), Access::write_only()).map_err(Error::Open)?;

    debug!(
        "Setting LED pattern {} on {} (registry handle open: {})",
        mask,
        record.id(),
        record.is_open()
    );

    // The handle is closed when it goes out of scope, even if the write failed.
    handle.write(&report(mask)).map_err(Error::Write)?;

    Ok(())
}
