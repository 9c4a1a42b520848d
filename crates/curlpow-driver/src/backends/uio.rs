//! UIO backend for real gateware
//!
//! The kernel exposes the curl engine as a UIO platform device: `map0` is
//! the control register block, and a blocking read on the device fd
//! delivers interrupts. This module maps the block for volatile register
//! access and runs a listener thread that re-arms the irq, blocks on the
//! fd, and raises the shared completion flag — the userspace counterpart
//! of the kernel-side interrupt handler that set `write_done`.

// MMIO registers are naturally aligned by hardware, so pointer casts are safe
#![allow(clippy::cast_ptr_alignment)]

use crate::bus::RegisterBus;
use crate::completion::Completion;
use crate::discovery::DeviceInfo;
use crate::error::{CurlError, Result};
use rustix::event::{poll, PollFd, PollFlags};
use rustix::io::{read, write, Errno};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use rustix::event::Timespec;
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsFd;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// How often the interrupt listener wakes to check for shutdown.
const POLL_TICK: Timespec = Timespec {
    tv_sec: 0,
    tv_nsec: 100_000_000,
};

/// Memory-mapped control block of one curl engine.
pub struct UioRegisters {
    ptr: NonNull<u8>,
    size: usize,
    /// Keeps the UIO fd open for the lifetime of the mapping.
    _file: Arc<File>,
}

impl std::fmt::Debug for UioRegisters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UioRegisters")
            .field("ptr", &format_args!("{:p}", self.ptr))
            .field("size", &self.size)
            .finish()
    }
}

// SAFETY: Send - UioRegisters owns the mapping exclusively; mmap'd memory is
// process-wide and moving the handle between threads does not invalidate it.
unsafe impl Send for UioRegisters {}

// SAFETY: Sync - all accesses are bounds-checked volatile 32-bit operations;
// MMIO reads are idempotent and the hardware serializes register writes.
unsafe impl Sync for UioRegisters {}

impl UioRegisters {
    /// Map `map0` of an open UIO device.
    fn map(file: &Arc<File>, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(CurlError::transfer_failed(
                "UIO map0 size is 0 (device not probed?)",
            ));
        }

        // SAFETY: mmap is required for MMIO. The fd was just opened
        // read-write, size comes from the kernel's map0/size attribute and
        // is non-zero, and UIO places map N at page offset N (map0 at 0).
        // The mapping is unmapped exactly once in Drop.
        let ptr = unsafe {
            let addr = mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )
            .map_err(|e| CurlError::transfer_failed(format!("mmap of map0 failed: {e}")))?;

            NonNull::new(addr.cast::<u8>())
                .ok_or_else(|| CurlError::transfer_failed("mmap returned null"))?
        };

        tracing::debug!("Mapped control block: {size:#x} bytes at {ptr:p}");

        Ok(Self {
            ptr,
            size,
            _file: Arc::clone(file),
        })
    }

    fn check_bounds(&self, offset: usize) -> Result<()> {
        if offset % 4 != 0 || offset + 4 > self.size {
            return Err(CurlError::transfer_failed(format!(
                "register access out of bounds: offset={offset:#x}, limit={:#x}",
                self.size
            )));
        }
        Ok(())
    }
}

impl RegisterBus for UioRegisters {
    fn read32(&self, offset: usize) -> Result<u32> {
        self.check_bounds(offset)?;

        // SAFETY: read_volatile is required for MMIO (hardware changes the
        // value). Bounds checked above; the block is word-aligned.
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };

        tracing::trace!("read32  @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn write32(&self, offset: usize, value: u32) -> Result<()> {
        self.check_bounds(offset)?;

        tracing::trace!("write32 @ {offset:#x} = {value:#x}");

        // SAFETY: write_volatile is required for MMIO (the write triggers
        // hardware side effects). Bounds checked above.
        unsafe {
            self.ptr
                .as_ptr()
                .add(offset)
                .cast::<u32>()
                .write_volatile(value);
        }
        Ok(())
    }
}

impl Drop for UioRegisters {
    fn drop(&mut self) {
        // SAFETY: ptr/size are exactly what mmap returned in map(); Drop
        // runs at most once and no references outlive the mapping.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
        tracing::debug!("Unmapped control block");
    }
}

/// Interrupt listener thread handle. Raises the shared completion flag on
/// every interrupt the UIO device delivers; stops when dropped.
#[derive(Debug)]
struct IrqListener {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl IrqListener {
    fn spawn(file: Arc<File>, completion: Arc<Completion>) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("curl-irq".into())
            .spawn(move || Self::run(&file, &completion, &stop))
            .ok();

        if handle.is_none() {
            tracing::error!("Failed to spawn irq listener thread");
        }

        Self { shutdown, handle }
    }

    fn run(file: &File, completion: &Completion, stop: &AtomicBool) {
        let mut armed = false;

        while !stop.load(Ordering::Relaxed) {
            if !armed {
                // UIO irqcontrol: writing 1 unmasks the interrupt.
                if let Err(e) = write(file, &1u32.to_ne_bytes()) {
                    tracing::error!("irq unmask failed: {e}");
                    return;
                }
                armed = true;
            }

            let mut fds = [PollFd::new(file, PollFlags::IN)];
            match poll(&mut fds, Some(&POLL_TICK)) {
                Ok(0) => {} // tick: re-check shutdown
                Ok(_) => {
                    let mut count = [0u8; 4];
                    match read(file, &mut count) {
                        Ok(_) => {
                            armed = false;
                            tracing::trace!(
                                total = u32::from_ne_bytes(count),
                                "curl interrupt"
                            );
                            completion.complete();
                        }
                        Err(e) if e == Errno::INTR => {}
                        Err(e) => {
                            tracing::error!("irq read failed: {e}");
                            return;
                        }
                    }
                }
                Err(e) if e == Errno::INTR => {}
                Err(e) => {
                    tracing::error!("irq poll failed: {e}");
                    return;
                }
            }
        }
    }
}

impl Drop for IrqListener {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("irq listener thread panicked");
            }
        }
    }
}

/// An opened UIO curl device: mapped registers, completion flag, and the
/// interrupt listener keeping the two connected.
#[derive(Debug)]
pub struct UioBackend {
    regs: Arc<UioRegisters>,
    completion: Arc<Completion>,
    _listener: IrqListener,
}

impl UioBackend {
    /// Open a discovered device node and map its control block.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is missing, cannot be opened, or the
    /// mapping fails.
    pub fn open(info: &DeviceInfo) -> Result<Self> {
        if !info.dev_path.exists() {
            return Err(CurlError::device_not_found(&info.dev_path));
        }

        let file = Arc::new(
            OpenOptions::new()
                .read(true)
                .write(true)
                .open(&info.dev_path)?,
        );

        let regs = Arc::new(UioRegisters::map(&file, info.map_size)?);
        let completion = Arc::new(Completion::new());
        let listener = IrqListener::spawn(file, Arc::clone(&completion));

        tracing::info!(
            "UIO backend ready for {} ({} bytes mapped)",
            info.dev_path.display(),
            info.map_size
        );

        Ok(Self {
            regs,
            completion,
            _listener: listener,
        })
    }

    /// The mapped register block.
    #[must_use]
    pub fn registers(&self) -> Arc<UioRegisters> {
        Arc::clone(&self.regs)
    }

    /// The completion flag the interrupt listener raises.
    #[must_use]
    pub fn completion(&self) -> Arc<Completion> {
        Arc::clone(&self.completion)
    }
}
