//! Curl device context and register-level transactions
//!
//! One `CurlDevice` wraps the shared hardware context: the register bus,
//! the completion flag the interrupt side raises, and the transaction lock
//! that serializes start→wait→drain sequences. Handles and clones all
//! refer to the same context, matching one physical engine.

use crate::backends::uio::UioBackend;
use crate::bus::RegisterBus;
use crate::completion::Completion;
use crate::ctrl::CtrlHandle;
use crate::discovery::DeviceInfo;
use crate::error::{CurlError, Result};
use curlpow_chip::{mwm, regs, ticks};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default bound on how long a computation may take before the wait gives
/// up. Covers the highest supported MWM with wide margin on real gateware.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Counters latched by the engine when a computation finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeStats {
    /// Hashes evaluated during the round.
    pub hash_count: u32,
    /// Fabric clock cycles the round took, composed from the two 32-bit
    /// tick registers.
    pub tick_count: u64,
}

#[derive(Debug)]
struct Shared {
    regs: Arc<dyn RegisterBus>,
    completion: Arc<Completion>,
    /// Serializes the whole start→wait→drain sequence. Concurrent readers
    /// must never overlap start commands on one engine.
    xact: Mutex<()>,
    last: Mutex<Option<ComputeStats>>,
    wait_timeout: Option<Duration>,
    /// Keeps the UIO interrupt listener alive for hardware-backed devices.
    _backend: Option<UioBackend>,
}

/// Handle to one curl engine.
///
/// Cloning is cheap and yields another reference to the same shared
/// context.
#[derive(Debug, Clone)]
pub struct CurlDevice {
    shared: Arc<Shared>,
}

impl CurlDevice {
    /// Open a discovered UIO device.
    ///
    /// Maps the control block and spawns the interrupt listener that
    /// raises the completion flag. Uses [`DEFAULT_WAIT_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns an error if the device node cannot be opened or mapped.
    pub fn open(info: &DeviceInfo) -> Result<Self> {
        Self::open_with_timeout(info, Some(DEFAULT_WAIT_TIMEOUT))
    }

    /// Open a discovered UIO device with an explicit wait bound.
    ///
    /// `None` waits indefinitely, matching the original interruptible
    /// kernel wait.
    ///
    /// # Errors
    ///
    /// Returns an error if the device node cannot be opened or mapped.
    pub fn open_with_timeout(info: &DeviceInfo, wait_timeout: Option<Duration>) -> Result<Self> {
        let backend = UioBackend::open(info)?;
        let regs: Arc<dyn RegisterBus> = backend.registers();
        let completion = backend.completion();

        tracing::info!(
            "Opened curl device {}: {}",
            info.index,
            info.dev_path.display()
        );

        Ok(Self::build(regs, completion, wait_timeout, Some(backend)))
    }

    /// Assemble a device from an explicit bus and completion flag.
    ///
    /// This is the seam the simulated backend and the tests use; hardware
    /// callers go through [`open`](Self::open).
    #[must_use]
    pub fn new(
        regs: Arc<dyn RegisterBus>,
        completion: Arc<Completion>,
        wait_timeout: Option<Duration>,
    ) -> Self {
        Self::build(regs, completion, wait_timeout, None)
    }

    fn build(
        regs: Arc<dyn RegisterBus>,
        completion: Arc<Completion>,
        wait_timeout: Option<Duration>,
        backend: Option<UioBackend>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                regs,
                completion,
                xact: Mutex::new(()),
                last: Mutex::new(None),
                wait_timeout,
                _backend: backend,
            }),
        }
    }

    /// Open a control handle on this device (the char-device `open`).
    /// Always succeeds; the handle only records the association.
    #[must_use]
    pub fn open_ctrl(&self) -> CtrlHandle {
        CtrlHandle::open(self)
    }

    /// Configure the minimum weight magnitude.
    ///
    /// Writes `(1 << mwm) - 1` to the mask register; every subsequent
    /// computation uses it.
    ///
    /// # Errors
    ///
    /// Returns [`CurlError::InvalidMwm`] if the magnitude does not fit the
    /// 32-bit mask register, or a transfer error from the bus.
    pub fn set_min_weight_magnitude(&self, magnitude: u8) -> Result<()> {
        let mask = mwm::mask(magnitude).ok_or(CurlError::InvalidMwm {
            mwm: magnitude,
            max: mwm::MAX_MWM,
        })?;

        self.shared.regs.write32(regs::MWM_MASK, mask)?;
        tracing::debug!(mwm = magnitude, mask = format_args!("{mask:#x}"), "MWM mask configured");
        Ok(())
    }

    /// Run one computation: trigger the engine, block until it raises
    /// completion, then drain the counters.
    ///
    /// The whole sequence holds the per-device transaction lock, so
    /// concurrent callers serialize instead of racing on the completion
    /// flag and overlapping start commands. On cancellation or timeout the
    /// completion flag is left reset and no counter is read.
    ///
    /// # Errors
    ///
    /// - [`CurlError::Interrupted`] if [`cancel`](Self::cancel) aborted the wait.
    /// - [`CurlError::Timeout`] if the engine never raised completion.
    /// - [`CurlError::TransferFailed`] on register access failure.
    pub fn compute(&self) -> Result<ComputeStats> {
        let shared = &self.shared;
        let _xact = shared.xact.lock().unwrap_or_else(PoisonError::into_inner);

        shared.completion.reset();
        shared.regs.write32(regs::MAIN_CTRL, regs::ctrl::START)?;
        tracing::debug!("start command issued, waiting for completion");

        shared.completion.wait(shared.wait_timeout)?;

        let hash_count = shared.regs.read32(regs::HASH_CNT)?;
        let tick_low = shared.regs.read32(regs::TICK_CNT_LOW)?;
        let tick_high = shared.regs.read32(regs::TICK_CNT_HI)?;

        let stats = ComputeStats {
            hash_count,
            tick_count: ticks::compose(tick_high, tick_low),
        };

        tracing::debug!(
            hash_count = stats.hash_count,
            tick_count = stats.tick_count,
            "computation complete"
        );

        *shared.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(stats);
        Ok(stats)
    }

    /// Counters from the most recent completed computation, if any.
    ///
    /// The control-device read contract reports zero bytes; callers that
    /// want the numbers fetch them here.
    #[must_use]
    pub fn last_stats(&self) -> Option<ComputeStats> {
        *self.shared.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Abort a blocked [`compute`](Self::compute), if one is waiting.
    ///
    /// The waiter returns [`CurlError::Interrupted`]; the completion flag
    /// is reset so the next round starts clean.
    pub fn cancel(&self) {
        self.shared.completion.cancel();
    }
}
