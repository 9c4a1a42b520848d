//! Silicon model for the FPGA curl proof-of-work engine.
//!
//! This crate has **no dependencies** and **no hardware access** — it is a
//! pure model of the gateware's software-visible surface: the control
//! register block, the start command encoding, the minimum-weight-magnitude
//! mask derivation, and the split 64-bit tick counter.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Control block register map — offsets and command values |
//! | [`mwm`] | Minimum-weight-magnitude mask derivation |
//! | [`ticks`] | 64-bit tick counter composed from two 32-bit halves |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod mwm;
pub mod regs;
pub mod ticks;

/// Name the gateware registers under in the UIO sysfs tree
/// (`/sys/class/uio/uio*/name`). Set by the device-tree node.
pub const UIO_DEVICE_NAME: &str = "fpga-curl";
