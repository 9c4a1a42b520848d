//! `curlpow` — command-line interface for the FPGA curl accelerator.
//!
//! ```text
//! USAGE:
//!   curlpow enumerate                List curl engines and their map sizes
//!   curlpow set-mwm <mwm>            Configure the difficulty mask
//!   curlpow compute [--mwm N]        Run one round and print the counters
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use curlpow_driver::{CurlDevice, DeviceManager, SimEngine};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "curlpow", about = "FPGA curl proof-of-work accelerator CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List all curl engines discovered via UIO.
    Enumerate,
    /// Write the minimum weight magnitude to the mask register.
    SetMwm {
        /// Minimum weight magnitude (0..=31).
        mwm: u8,
        /// UIO device index.
        #[arg(long, default_value_t = 0)]
        device: usize,
    },
    /// Run one computation round and print the drained counters.
    Compute {
        /// Configure this MWM before the round.
        #[arg(long)]
        mwm: Option<u8>,
        /// UIO device index.
        #[arg(long, default_value_t = 0)]
        device: usize,
        /// Abort the wait after this many milliseconds.
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
        /// Run against the simulated engine instead of hardware.
        #[arg(long)]
        sim: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Enumerate => cmd_enumerate()?,
        Cmd::SetMwm { mwm, device } => cmd_set_mwm(mwm, device)?,
        Cmd::Compute {
            mwm,
            device,
            timeout_ms,
            sim,
        } => cmd_compute(mwm, device, timeout_ms, sim)?,
    }

    Ok(())
}

fn cmd_enumerate() -> Result<()> {
    let mgr = DeviceManager::discover()?;

    println!("Curl devices: {}", mgr.device_count());
    for info in mgr.devices() {
        println!(
            "[{}] {} @ {}  (map0 {:#x} bytes)",
            info.index,
            info.name,
            info.dev_path.display(),
            info.map_size
        );
    }

    Ok(())
}

fn cmd_set_mwm(mwm: u8, device: usize) -> Result<()> {
    let mgr = DeviceManager::discover()?;
    let dev = mgr.open(device)?;
    dev.set_min_weight_magnitude(mwm)?;
    println!("MWM set to {mwm} on device {device}");
    Ok(())
}

fn cmd_compute(mwm: Option<u8>, device: usize, timeout_ms: u64, sim: bool) -> Result<()> {
    let timeout = Duration::from_millis(timeout_ms);

    let dev: CurlDevice = if sim {
        sim_device(Duration::from_millis(10), timeout)
    } else {
        let mgr = DeviceManager::discover()?;
        let info = mgr.device(device)?;
        CurlDevice::open_with_timeout(info, Some(timeout))?
    };

    if let Some(mwm) = mwm {
        dev.set_min_weight_magnitude(mwm)?;
        println!("MWM      {mwm}");
    }

    let stats = dev.compute()?;
    println!("hash_cnt {}", stats.hash_count);
    println!("tick_cnt {}", stats.tick_count);

    Ok(())
}

/// Simulated engine with the same wait bound a hardware device would get.
fn sim_device(latency: Duration, timeout: Duration) -> CurlDevice {
    let engine = SimEngine::new(latency);
    CurlDevice::new(engine.registers(), engine.completion(), Some(timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curlpow_driver::CurlError;

    #[test]
    fn sim_device_honors_requested_timeout() {
        let dev = sim_device(Duration::from_millis(200), Duration::from_millis(10));
        assert!(matches!(
            dev.compute().unwrap_err(),
            CurlError::Timeout { duration_ms: 10 }
        ));

        let dev = sim_device(Duration::from_millis(1), Duration::from_secs(1));
        assert!(dev.compute().is_ok());
    }
}
