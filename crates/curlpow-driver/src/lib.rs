//! Pure Rust userspace driver for the FPGA curl proof-of-work accelerator.
//!
//! The gateware does the hashing; this crate drives its control block:
//! configure the minimum-weight-magnitude mask, fire the start command,
//! block until the interrupt-backed completion flag rises, and drain the
//! hash and tick counters.
//!
//! # Backends
//!
//! ```text
//! Hardware:   UioBackend — /dev/uioN mmap + interrupt listener thread
//! CI / tests: SimEngine  — recording register file + simulated engine
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use curlpow_driver::DeviceManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mgr = DeviceManager::discover()?;
//! let dev = mgr.open_first()?;
//!
//! dev.set_min_weight_magnitude(14)?;
//! let stats = dev.compute()?;
//! println!("{} hashes in {} ticks", stats.hash_count, stats.tick_count);
//! # Ok(())
//! # }
//! ```
//!
//! Multiple handles may be open against one engine; start→wait→drain
//! sequences serialize on a per-device transaction lock instead of racing
//! on the completion flag.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod backends;
mod bus;
mod completion;
mod ctrl;
mod device;
mod discovery;
mod error;

/// Register layout constants (re-exported from curlpow-chip).
pub mod chip {
    pub use curlpow_chip::{mwm, regs, ticks, UIO_DEVICE_NAME};
}

pub use backends::sim::{simulated_device, Access, FakeRegisters, SimEngine};
pub use backends::uio::{UioBackend, UioRegisters};
pub use bus::RegisterBus;
pub use completion::Completion;
pub use ctrl::{CtrlHandle, CONFIG_SLOT_END};
pub use device::{ComputeStats, CurlDevice, DEFAULT_WAIT_TIMEOUT};
pub use discovery::{DeviceInfo, DeviceManager};
pub use error::{CurlError, Result};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        ComputeStats, CtrlHandle, CurlDevice, CurlError, DeviceManager, RegisterBus, Result,
    };
}
