//! Control block register map for the curl engine.
//!
//! The gateware exposes a small AXI-lite register block. The control
//! register is write-only from software's point of view (the engine never
//! reflects the start command back); the counters are read-only and latched
//! by the engine when a computation finishes.

/// Main control register. Write [`ctrl::START`] to begin a computation.
pub const MAIN_CTRL: usize = 0x00;

/// Minimum-weight-magnitude mask register (write-only).
///
/// Holds the value produced by [`crate::mwm::mask`], consumed by every
/// subsequent computation until rewritten.
pub const MWM_MASK: usize = 0x04;

/// Hash counter (read-only): number of hashes the engine evaluated during
/// the last completed computation.
pub const HASH_CNT: usize = 0x08;

/// Tick counter, low 32 bits (read-only).
pub const TICK_CNT_LOW: usize = 0x0C;

/// Tick counter, high 32 bits (read-only).
pub const TICK_CNT_HI: usize = 0x10;

/// Total size of the control block in bytes.
pub const BLOCK_SIZE: usize = 0x14;

/// Command encodings for [`MAIN_CTRL`].
pub mod ctrl {
    /// Start a proof-of-work computation.
    pub const START: u32 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_are_word_aligned_and_inside_block() {
        for off in [MAIN_CTRL, MWM_MASK, HASH_CNT, TICK_CNT_LOW, TICK_CNT_HI] {
            assert_eq!(off % 4, 0, "offset {off:#x} not word aligned");
            assert!(off + 4 <= BLOCK_SIZE, "offset {off:#x} outside block");
        }
    }

    #[test]
    fn start_command_encoding() {
        assert_eq!(ctrl::START, 2);
    }
}
