//! Single-writer queue in front of the serial device.
//!
//! The device is owned by one blocking task. Everyone else holds a cloneable
//! `SerialWriter` and submits whole payloads; the task writes each payload
//! completely and flushes before taking the next one, so payloads from
//! different connections never interleave on the wire.

use crate::port::{PortAdapter, PortError};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

struct WriteRequest {
    payload: Vec<u8>,
    reply: oneshot::Sender<Result<usize, PortError>>,
}

/// Totals reported when the writer task ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Payloads fully written.
    pub writes: u64,
    /// Bytes fully written.
    pub bytes: u64,
    /// Payloads that failed.
    pub failures: u64,
}

/// Cloneable handle for submitting writes to the serial device.
#[derive(Debug, Clone)]
pub struct SerialWriter {
    tx: mpsc::Sender<WriteRequest>,
    device: Arc<str>,
}

impl SerialWriter {
    /// Move `port` onto a blocking task and return a handle to it.
    ///
    /// The task ends, returning its totals, once every `SerialWriter` clone
    /// has been dropped. Must be called from within a Tokio runtime.
    pub fn spawn(mut port: PortAdapter, queue_depth: usize) -> (Self, JoinHandle<WriterStats>) {
        let (tx, mut rx) = mpsc::channel::<WriteRequest>(queue_depth.max(1));
        let device: Arc<str> = Arc::from(port.name());

        let task = tokio::task::spawn_blocking(move || {
            let mut stats = WriterStats::default();
            while let Some(request) = rx.blocking_recv() {
                let result = port
                    .write_all_bytes(&request.payload)
                    .and_then(|n| port.flush().map(|()| n));
                match &result {
                    Ok(n) => {
                        stats.writes += 1;
                        stats.bytes += *n as u64;
                        trace!(device = port.name(), bytes = n, "serial write complete");
                    }
                    Err(_) => stats.failures += 1,
                }
                // The requester may have given up waiting.
                let _ = request.reply.send(result);
            }
            debug!(device = port.name(), ?stats, "serial writer stopped");
            stats
        });

        (Self { tx, device }, task)
    }

    /// Name of the device behind this writer.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Write `payload` to the device and wait for the outcome.
    pub async fn write(&self, payload: Vec<u8>) -> Result<usize, PortError> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(WriteRequest { payload, reply })
            .await
            .map_err(|_| PortError::WriterClosed)?;
        outcome.await.map_err(|_| PortError::WriterClosed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockSerialPort;
    use std::time::Duration;

    #[tokio::test]
    async fn test_write_reaches_device() {
        let mock = MockSerialPort::new("MOCK0");
        let (writer, task) = SerialWriter::spawn(Box::new(mock.clone()), 4);

        assert_eq!(writer.device(), "MOCK0");
        assert_eq!(writer.write(b"~20004642E00200FD37\r".to_vec()).await.unwrap(), 20);
        drop(writer);

        let stats = task.await.unwrap();
        assert_eq!(stats, WriterStats { writes: 1, bytes: 20, failures: 0 });
        assert_eq!(mock.written(), b"~20004642E00200FD37\r");
        assert_eq!(mock.flush_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_writer_survives() {
        let mock = MockSerialPort::new("MOCK0");
        mock.fail_next_writes(1);
        let (writer, task) = SerialWriter::spawn(Box::new(mock.clone()), 4);

        assert!(matches!(
            writer.write(b"lost".to_vec()).await,
            Err(PortError::Timeout(_))
        ));
        assert_eq!(writer.write(b"kept".to_vec()).await.unwrap(), 4);
        drop(writer);

        let stats = task.await.unwrap();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(mock.written(), b"kept");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_payloads_do_not_interleave() {
        let mock = MockSerialPort::new("MOCK0");
        mock.set_max_chunk(3);
        mock.set_write_delay(Duration::from_micros(200));
        let (writer, task) = SerialWriter::spawn(Box::new(mock.clone()), 2);

        let letters = [b'a', b'b', b'c', b'd'];
        let mut producers = Vec::new();
        for letter in letters {
            let writer = writer.clone();
            producers.push(tokio::spawn(async move {
                for _ in 0..5 {
                    writer.write(vec![letter; 40]).await.unwrap();
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }
        drop(writer);
        task.await.unwrap();

        let written = mock.written();
        assert_eq!(written.len(), 4 * 5 * 40);
        for run in written.chunks(40) {
            assert!(
                run.iter().all(|b| *b == run[0]),
                "payload interleaved: {:?}",
                String::from_utf8_lossy(run)
            );
        }
    }
}
