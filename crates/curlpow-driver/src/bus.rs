//! Register bus abstraction
//!
//! The control-device handler only ever issues 32-bit register
//! transactions. `RegisterBus` is the seam between the handler and the
//! transport: memory-mapped UIO hardware in production, a recording
//! register file in tests and simulation.

use crate::error::Result;
use std::fmt::Debug;

/// 32-bit register access to the curl engine's control block.
///
/// Offsets are byte offsets from the start of the block; implementations
/// bounds-check against the mapped size. Writes may trigger hardware side
/// effects, so implementations must not reorder or elide them.
pub trait RegisterBus: Debug + Send + Sync {
    /// Read a 32-bit register.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is outside the register block or the
    /// transport fails.
    fn read32(&self, offset: usize) -> Result<u32>;

    /// Write a 32-bit register.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is outside the register block or the
    /// transport fails.
    fn write32(&self, offset: usize, value: u32) -> Result<()>;
}
