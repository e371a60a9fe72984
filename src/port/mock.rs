//! Mock serial device for tests.
//!
//! `MockSerialPort` records every write without touching hardware. Clones
//! share state, so a test can hand one clone to the bridge and inspect the
//! other.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockPortState {
    /// One entry per `write_bytes` call that was accepted.
    write_log: Vec<Vec<u8>>,
    /// Number of upcoming writes that should fail.
    failures_pending: usize,
    /// Largest number of bytes accepted per call, if limited.
    max_chunk: Option<usize>,
    /// Sleep inside every write, to widen race windows in tests.
    write_delay: Option<Duration>,
    flush_count: usize,
    timeout: Duration,
}

/// Mock serial device implementation for testing.
///
/// # Example
/// ```
/// use telnet_uart_bridge::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.write_bytes(b"Response").unwrap();
///
/// assert_eq!(port.get_write_log(), vec![b"Response".to_vec()]);
/// assert_eq!(port.written(), b"Response");
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock device with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                timeout: Duration::from_secs(1),
                ..Default::default()
            })),
        }
    }

    /// Make the next `count` writes fail with a timeout.
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().failures_pending = count;
    }

    /// Accept at most `max` bytes per write call.
    pub fn set_max_chunk(&self, max: usize) {
        self.state.lock().max_chunk = Some(max);
    }

    /// Sleep for `delay` inside every write call.
    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().write_delay = Some(delay);
    }

    /// Get a copy of every accepted write call.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// All accepted bytes, concatenated in write order.
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().write_log.concat()
    }

    /// Clear the write log.
    pub fn clear_write_log(&self) {
        self.state.lock().write_log.clear();
    }

    /// Number of times `flush` was called.
    pub fn flush_count(&self) -> usize {
        self.state.lock().flush_count
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let delay = self.state.lock().write_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if state.failures_pending > 0 {
            state.failures_pending -= 1;
            return Err(PortError::timeout(state.timeout));
        }

        let n = state.max_chunk.map_or(data.len(), |max| data.len().min(max));
        state.write_log.push(data[..n].to_vec());
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.state.lock().flush_count += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("writes", &self.state.lock().write_log.len())
            .finish()
    }
}
