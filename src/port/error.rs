//! Serial device error types.
//!
//! Kept separate from the bridge-level errors so the port layer can be used
//! (and mocked) without pulling in networking concerns.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while opening or writing to a serial device.
#[derive(Debug, Error)]
pub enum PortError {
    /// The serial device path does not exist on this system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred while talking to the device.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device rejected its configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The write did not complete in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The device accepted zero bytes of a non-empty write.
    #[error("Serial port accepted 0 of {0} bytes")]
    WriteZero(usize),

    /// The serial writer task is gone, so nothing can reach the device.
    #[error("Serial writer is closed")]
    WriterClosed,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a device path.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout(duration)
    }
}
