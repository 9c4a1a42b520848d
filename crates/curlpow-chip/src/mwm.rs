//! Minimum-weight-magnitude mask derivation.
//!
//! The MWM is the proof-of-work difficulty parameter: a hash is accepted
//! when its `mwm` trailing trits are zero. The gateware checks this with a
//! bitmask register holding `(1 << mwm) - 1`.

/// Largest MWM the 32-bit mask register can express.
pub const MAX_MWM: u8 = 31;

/// Derive the mask register value for a given minimum weight magnitude.
///
/// Returns `None` when `mwm` exceeds [`MAX_MWM`] — the shift would not fit
/// the 32-bit mask register.
#[must_use]
pub const fn mask(mwm: u8) -> Option<u32> {
    if mwm > MAX_MWM {
        None
    } else {
        Some((1u32 << mwm).wrapping_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_values() {
        assert_eq!(mask(0), Some(0));
        assert_eq!(mask(1), Some(1));
        assert_eq!(mask(9), Some(0x1FF));
        assert_eq!(mask(14), Some(0x3FFF));
        assert_eq!(mask(31), Some(0x7FFF_FFFF));
    }

    #[test]
    fn mask_is_all_ones_below_the_magnitude() {
        for m in 0..=MAX_MWM {
            let v = mask(m).unwrap();
            assert_eq!(v.count_ones(), u32::from(m));
            assert_eq!(v.trailing_ones(), u32::from(m));
        }
    }

    #[test]
    fn oversized_mwm_rejected() {
        assert_eq!(mask(32), None);
        assert_eq!(mask(255), None);
    }
}
