//! Error types for curl engine operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for curl engine operations
pub type Result<T> = std::result::Result<T, CurlError>;

/// Errors that can occur while driving the curl engine
#[derive(Debug, Error)]
pub enum CurlError {
    /// Device not found at the expected path
    #[error("Device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// No curl engines detected on the system
    #[error("No curl devices detected")]
    NoDevicesFound,

    /// Device index out of range
    #[error("Device index {index} out of range (have {count} devices)")]
    InvalidIndex {
        /// Requested index
        index: usize,
        /// Number of available devices
        count: usize,
    },

    /// Configuration write past the single-byte MWM slot
    #[error("Write offset {offset} past configuration slot (limit {limit})")]
    OffsetOutOfRange {
        /// Requested file offset
        offset: u64,
        /// Largest permissible offset
        limit: u64,
    },

    /// Configuration slot is already full at this offset
    #[error("No space left in configuration slot at offset {offset}")]
    NoSpace {
        /// Offset the write landed on
        offset: u64,
    },

    /// Minimum weight magnitude does not fit the 32-bit mask register
    #[error("Minimum weight magnitude {mwm} out of range (max {max})")]
    InvalidMwm {
        /// Requested magnitude
        mwm: u8,
        /// Largest supported magnitude
        max: u8,
    },

    /// Register access or data transfer failed
    #[error("Transfer failed: {reason}")]
    TransferFailed {
        /// Reason for failure
        reason: String,
    },

    /// Blocking wait was cancelled before the engine completed
    #[error("Wait for completion interrupted")]
    Interrupted,

    /// Engine did not raise completion in time
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// I/O error during device communication
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl CurlError {
    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    /// Create a transfer failed error
    pub fn transfer_failed(reason: impl Into<String>) -> Self {
        Self::TransferFailed {
            reason: reason.into(),
        }
    }
}
