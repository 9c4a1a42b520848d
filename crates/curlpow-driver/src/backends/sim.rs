//! Simulated curl engine
//!
//! [`FakeRegisters`] is a plain backing store behind the
//! [`RegisterBus`] seam that records every handler-side access, so tests
//! can assert exactly which registers an operation touched and in what
//! order. [`SimEngine`] wires a reaction onto it: when the start command
//! lands in the control register it latches deterministic counters after a
//! configurable latency and raises the completion flag — the same
//! observable behavior the gateware plus interrupt handler produce.

// Counter latching narrows u64 tick math into the two 32-bit halves.
#![allow(clippy::cast_possible_truncation)]

use crate::bus::RegisterBus;
use crate::completion::Completion;
use crate::device::CurlDevice;
use crate::error::{CurlError, Result};
use curlpow_chip::regs;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Fabric cycles the simulated engine charges per hash (one curl
/// transform per hash, 81 rounds).
pub const SIM_TICKS_PER_HASH: u64 = 81;

type WriteHook = Arc<dyn Fn(usize, u32) + Send + Sync>;

/// One recorded register access, in handler-issued order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// A 32-bit register read.
    Read {
        /// Byte offset of the register.
        offset: usize,
    },
    /// A 32-bit register write.
    Write {
        /// Byte offset of the register.
        offset: usize,
        /// Value delivered.
        value: u32,
    },
}

/// Recording register file standing in for the mapped control block.
#[derive(Default)]
pub struct FakeRegisters {
    store: Mutex<[u32; regs::BLOCK_SIZE / 4]>,
    log: Mutex<Vec<Access>>,
    write_hook: Mutex<Option<WriteHook>>,
}

impl std::fmt::Debug for FakeRegisters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeRegisters")
            .field("accesses", &self.log().len())
            .finish()
    }
}

impl FakeRegisters {
    /// Create an all-zero register file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn word(offset: usize) -> Result<usize> {
        if offset % 4 != 0 || offset + 4 > regs::BLOCK_SIZE {
            return Err(CurlError::transfer_failed(format!(
                "register offset {offset:#x} outside control block"
            )));
        }
        Ok(offset / 4)
    }

    /// Set a register from the engine side, without logging. Used to
    /// latch counters and preload state in tests.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is outside the control block.
    pub fn preload(&self, offset: usize, value: u32) {
        let word = Self::word(offset).unwrap_or_else(|_| {
            panic!("preload offset {offset:#x} outside control block")
        });
        self.store.lock().unwrap_or_else(PoisonError::into_inner)[word] = value;
    }

    /// Read a register from the engine side, without logging.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is outside the control block.
    #[must_use]
    pub fn peek(&self, offset: usize) -> u32 {
        let word = Self::word(offset)
            .unwrap_or_else(|_| panic!("peek offset {offset:#x} outside control block"));
        self.store.lock().unwrap_or_else(PoisonError::into_inner)[word]
    }

    /// Every handler-side access so far, oldest first.
    #[must_use]
    pub fn log(&self) -> Vec<Access> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forget the recorded accesses.
    pub fn clear_log(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Offsets at which the start command was written, as log positions.
    #[must_use]
    pub fn start_positions(&self) -> Vec<usize> {
        self.log()
            .iter()
            .enumerate()
            .filter_map(|(i, a)| match a {
                Access::Write { offset, value }
                    if *offset == regs::MAIN_CTRL && *value == regs::ctrl::START =>
                {
                    Some(i)
                }
                _ => None,
            })
            .collect()
    }

    /// Install a reaction invoked after every handler-side write.
    pub fn set_write_hook(&self, hook: impl Fn(usize, u32) + Send + Sync + 'static) {
        *self.write_hook.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
    }
}

impl RegisterBus for FakeRegisters {
    fn read32(&self, offset: usize) -> Result<u32> {
        let word = Self::word(offset)?;
        let value = self.store.lock().unwrap_or_else(PoisonError::into_inner)[word];
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Access::Read { offset });
        Ok(value)
    }

    fn write32(&self, offset: usize, value: u32) -> Result<()> {
        let word = Self::word(offset)?;
        self.store.lock().unwrap_or_else(PoisonError::into_inner)[word] = value;
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Access::Write { offset, value });

        // Run the hook outside the store lock so it may touch registers.
        let hook = self
            .write_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook(offset, value);
        }
        Ok(())
    }
}

/// Simulated engine: reacts to the start command like the gateware and its
/// interrupt handler would.
///
/// Difficulty model: with the mask register holding `(1 << mwm) - 1`, the
/// engine reports `2^mwm` hashes and [`SIM_TICKS_PER_HASH`] cycles per
/// hash — the expected trial count at that difficulty, deterministic so
/// tests can assert on it.
#[derive(Debug)]
pub struct SimEngine {
    regs: Arc<FakeRegisters>,
    completion: Arc<Completion>,
}

impl SimEngine {
    /// Create an engine with the given completion latency.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        let regs = Arc::new(FakeRegisters::new());
        let completion = Arc::new(Completion::new());

        // Weak reference: the register file owns the hook, so a strong
        // reference here would cycle and never drop.
        let engine_regs = Arc::downgrade(&regs);
        let engine_done = Arc::clone(&completion);
        regs.set_write_hook(move |offset, value| {
            if offset != regs::MAIN_CTRL || value != regs::ctrl::START {
                return;
            }
            let Some(regfile) = engine_regs.upgrade() else {
                return;
            };
            let done = Arc::clone(&engine_done);
            thread::spawn(move || {
                thread::sleep(latency);
                let mask = regfile.peek(regs::MWM_MASK);
                let hashes = u64::from(mask) + 1;
                let ticks = hashes * SIM_TICKS_PER_HASH;
                regfile.preload(regs::HASH_CNT, hashes as u32);
                regfile.preload(regs::TICK_CNT_LOW, ticks as u32);
                regfile.preload(regs::TICK_CNT_HI, (ticks >> 32) as u32);
                done.complete();
            });
        });

        Self { regs, completion }
    }

    /// The register file the engine reacts to.
    #[must_use]
    pub fn registers(&self) -> Arc<FakeRegisters> {
        Arc::clone(&self.regs)
    }

    /// The completion flag the engine raises.
    #[must_use]
    pub fn completion(&self) -> Arc<Completion> {
        Arc::clone(&self.completion)
    }
}

/// Build a [`CurlDevice`] driven by a fresh [`SimEngine`], returning the
/// register file alongside for log assertions.
#[must_use]
pub fn simulated_device(latency: Duration) -> (CurlDevice, Arc<FakeRegisters>) {
    let engine = SimEngine::new(latency);
    let fake = engine.registers();
    let device = CurlDevice::new(
        engine.registers(),
        engine.completion(),
        Some(Duration::from_secs(5)),
    );
    (device, fake)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accesses_are_recorded_in_order() {
        let fake = FakeRegisters::new();
        fake.write32(regs::MWM_MASK, 0x1FF).unwrap();
        let _ = fake.read32(regs::HASH_CNT).unwrap();
        assert_eq!(
            fake.log(),
            vec![
                Access::Write { offset: regs::MWM_MASK, value: 0x1FF },
                Access::Read { offset: regs::HASH_CNT },
            ]
        );
    }

    #[test]
    fn out_of_block_access_fails() {
        let fake = FakeRegisters::new();
        assert!(fake.read32(regs::BLOCK_SIZE).is_err());
        assert!(fake.write32(0x3, 1).is_err());
        assert!(fake.log().is_empty());
    }

    #[test]
    fn preload_and_peek_bypass_the_log() {
        let fake = FakeRegisters::new();
        fake.preload(regs::HASH_CNT, 42);
        assert_eq!(fake.peek(regs::HASH_CNT), 42);
        assert!(fake.log().is_empty());
    }

    #[test]
    fn engine_latches_difficulty_scaled_counters() {
        let engine = SimEngine::new(Duration::from_millis(1));
        let fake = engine.registers();
        let done = engine.completion();

        fake.write32(regs::MWM_MASK, 0x1FF).unwrap(); // mwm = 9
        fake.write32(regs::MAIN_CTRL, regs::ctrl::START).unwrap();
        done.wait(Some(Duration::from_secs(1))).unwrap();

        assert_eq!(fake.peek(regs::HASH_CNT), 512);
        assert_eq!(
            u64::from(fake.peek(regs::TICK_CNT_LOW)),
            512 * SIM_TICKS_PER_HASH
        );
        assert_eq!(fake.peek(regs::TICK_CNT_HI), 0);
    }
}
