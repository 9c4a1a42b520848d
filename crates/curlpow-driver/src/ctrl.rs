//! Control-device handle
//!
//! Mirrors the character-device contract of the original `ctrl` node:
//! `open` records the association with the shared device context, `write`
//! accepts the one-byte MWM configuration at offset 0, and `read` runs a
//! hardware round. The computed counters are deliberately not copied into
//! the caller's buffer — `read` reports zero bytes and the numbers stay
//! retrievable through [`CtrlHandle::last_stats`], so callers choose
//! whether `read` is a pure wait-for-completion trigger or a fetch.

use crate::device::{ComputeStats, CurlDevice};
use crate::error::{CurlError, Result};

/// Largest permissible write offset: the configuration slot holds exactly
/// one byte at offset 0.
pub const CONFIG_SLOT_END: u64 = 1;

/// An open handle on the control device.
///
/// Handles are cheap; any number may be open against one device at a time
/// and all operate on the same shared context.
#[derive(Debug)]
pub struct CtrlHandle {
    device: CurlDevice,
}

impl CtrlHandle {
    /// Open a handle. Records the association; always succeeds.
    #[must_use]
    pub fn open(device: &CurlDevice) -> Self {
        tracing::debug!("ctrl handle opened");
        Self {
            device: device.clone(),
        }
    }

    /// The device this handle is associated with.
    #[must_use]
    pub const fn device(&self) -> &CurlDevice {
        &self.device
    }

    /// Write the MWM configuration byte at a file offset.
    ///
    /// The slot is a single byte at offset 0; the count is truncated so the
    /// write never extends past it. The consumed byte is the minimum weight
    /// magnitude; its derived mask `(1 << mwm) - 1` is delivered to the
    /// mask register. Returns the number of bytes consumed. A zero-length
    /// write consumes nothing and touches no register.
    ///
    /// # Errors
    ///
    /// - [`CurlError::OffsetOutOfRange`] if `offset > 1`.
    /// - [`CurlError::NoSpace`] if `offset == 1` (slot already full).
    /// - [`CurlError::InvalidMwm`] if the byte exceeds the mask register.
    pub fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize> {
        if offset > CONFIG_SLOT_END {
            return Err(CurlError::OffsetOutOfRange {
                offset,
                limit: CONFIG_SLOT_END,
            });
        }
        if offset == CONFIG_SLOT_END {
            return Err(CurlError::NoSpace { offset });
        }

        // offset is 0 here; never consume past the end of the slot.
        #[allow(clippy::cast_possible_truncation)] // slot length is 1
        let count = buf.len().min((CONFIG_SLOT_END - offset) as usize);
        if count == 0 {
            return Ok(0);
        }

        self.device.set_min_weight_magnitude(buf[0])?;
        Ok(count)
    }

    /// Trigger one hardware round and block until it completes.
    ///
    /// Nothing is copied into `buf`; the return value is 0 on success. The
    /// drained counters are logged and stored on the device context
    /// (fetch with [`last_stats`](Self::last_stats)).
    ///
    /// # Errors
    ///
    /// Propagates [`CurlError::Interrupted`], [`CurlError::Timeout`] and
    /// transfer errors from the round.
    pub fn read(&self, _buf: &mut [u8]) -> Result<usize> {
        let stats = self.device.compute()?;
        tracing::debug!(
            hash_count = stats.hash_count,
            tick_count = stats.tick_count,
            "ctrl read finished"
        );
        Ok(0)
    }

    /// Counters from the most recent completed round on this device.
    #[must_use]
    pub fn last_stats(&self) -> Option<ComputeStats> {
        self.device.last_stats()
    }
}

impl Drop for CtrlHandle {
    fn drop(&mut self) {
        tracing::debug!("ctrl handle released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sim::simulated_device;
    use std::time::Duration;

    fn handle() -> (CtrlHandle, std::sync::Arc<crate::backends::sim::FakeRegisters>) {
        let (device, fake) = simulated_device(Duration::from_millis(1));
        (device.open_ctrl(), fake)
    }

    #[test]
    fn write_past_slot_is_range_error_and_touches_nothing() {
        let (h, fake) = handle();
        for offset in [2u64, 3, 100, u64::MAX] {
            let err = h.write_at(&[9], offset).unwrap_err();
            assert!(matches!(err, CurlError::OffsetOutOfRange { .. }));
        }
        assert!(fake.log().is_empty());
    }

    #[test]
    fn write_at_slot_end_is_no_space_regardless_of_contents() {
        let (h, fake) = handle();
        for buf in [&[][..], &[9][..], &[1, 2, 3][..]] {
            let err = h.write_at(buf, 1).unwrap_err();
            assert!(matches!(err, CurlError::NoSpace { offset: 1 }));
        }
        assert!(fake.log().is_empty());
    }

    #[test]
    fn write_truncates_to_one_byte() {
        let (h, fake) = handle();
        let consumed = h.write_at(&[14, 0xAA, 0xBB], 0).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(fake.peek(curlpow_chip::regs::MWM_MASK), 0x3FFF);
    }

    #[test]
    fn zero_length_write_consumes_nothing() {
        let (h, fake) = handle();
        assert_eq!(h.write_at(&[], 0).unwrap(), 0);
        assert!(fake.log().is_empty());
    }

    #[test]
    fn read_reports_zero_bytes_and_records_snapshot() {
        let (h, _fake) = handle();
        let mut buf = [0u8; 16];
        assert_eq!(h.read(&mut buf).unwrap(), 0);
        assert!(buf.iter().all(|&b| b == 0), "caller buffer untouched");
        assert!(h.last_stats().is_some());
    }
}
