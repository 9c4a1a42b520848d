//! Register bus backends
//!
//! Two transports implement [`crate::bus::RegisterBus`]:
//! - **UIO**: memory-mapped control block plus an interrupt listener
//!   thread, for real gateware;
//! - **Sim**: a recording register file with an optional engine thread,
//!   for CI and for validating handler semantics without hardware.

pub mod sim;
pub mod uio;

pub use sim::{simulated_device, Access, FakeRegisters, SimEngine};
pub use uio::UioBackend;
