//! The 64-bit tick counter.
//!
//! The engine counts fabric clock cycles per computation in a 64-bit
//! counter exposed as two 32-bit registers, low half first.

/// Compose the 64-bit tick count from the two register halves.
#[must_use]
pub const fn compose(high: u32, low: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pairs() {
        assert_eq!(compose(0, 0), 0);
        assert_eq!(compose(0, 1), 1);
        assert_eq!(compose(1, 0), 4_294_967_296);
        assert_eq!(compose(0, u32::MAX), 4_294_967_295);
        assert_eq!(compose(u32::MAX, u32::MAX), u64::MAX);
    }

    #[test]
    fn low_half_does_not_leak_into_high() {
        assert_eq!(compose(0x0000_0001, 0xFFFF_FFFF), 0x1_FFFF_FFFF);
    }
}
