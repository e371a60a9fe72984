//! The bridge service: forwards client bytes to the serial device and
//! acknowledges them.
//!
//! # Architecture
//!
//! ```text
//! client ─┐  reader tasks            reactor              serial writer
//! client ─┼──> BridgeEvent ──> BridgeService handlers ──> (blocking task) ──> UART
//! client ─┘        ^                    │
//!                  └── writer tasks <───┘  "Received your command: " + bytes
//! ```

use super::connection::spawn_connection;
use super::events::{BridgeEvent, ClientHandle, ConnectionId, DisconnectReason};
use super::reactor::{EventHandler, Reactor};
use super::writer::{SerialWriter, WriterStats};
use crate::config::Config;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::DeviceRegistry;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Literal written back to the client ahead of the echoed bytes.
pub const ACK_PREFIX: &[u8] = b"Received your command: ";

/// Build the acknowledgment for one data event: the prefix followed by an
/// exact copy of `payload`.
pub fn acknowledgment(payload: &[u8]) -> Vec<u8> {
    let mut ack = Vec::with_capacity(ACK_PREFIX.len() + payload.len());
    ack.extend_from_slice(ACK_PREFIX);
    ack.extend_from_slice(payload);
    ack
}

/// Event handlers of the bridge.
///
/// Holds only the serial writer and a count of open connections; nothing is
/// kept per client.
#[derive(Debug)]
pub struct BridgeService {
    writer: SerialWriter,
    open_connections: usize,
}

impl BridgeService {
    pub fn new(writer: SerialWriter) -> Self {
        Self {
            writer,
            open_connections: 0,
        }
    }

    /// Number of clients currently connected.
    pub fn open_connections(&self) -> usize {
        self.open_connections
    }

    /// Resolve the configured serial device, then start listening.
    ///
    /// `bridge.serial_device` goes through `serial.aliases` first. If the
    /// device cannot be resolved nothing is bound and
    /// `BridgeError::DeviceResolution` is returned.
    pub async fn start(config: &Config, registry: &mut DeviceRegistry) -> BridgeResult<RunningBridge> {
        config.validate()?;
        let bridge = &config.bridge;

        let name = config.serial.resolve_name(&bridge.serial_device);
        let device = registry.resolve(name)?;
        let device_name = device.name;
        let (writer, writer_task) = SerialWriter::spawn(device.port, config.serial.queue_depth);

        let addr = bridge.listen_addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                drop(writer);
                let _ = writer_task.await;
                return Err(BridgeError::Bind { addr, source });
            }
        };
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (reactor, events) = Reactor::new(Self::new(writer), bridge.tick_interval());
        let reactor_task = tokio::spawn(reactor.run(shutdown_rx.clone()));
        let acceptor_task = tokio::spawn(accept_loop(
            listener,
            events,
            shutdown_rx,
            bridge.read_buffer_size,
        ));

        info!(
            addr = %local_addr,
            device = %device_name,
            "bridge listening"
        );

        Ok(RunningBridge {
            local_addr,
            device_name,
            shutdown_tx,
            acceptor_task,
            reactor_task,
            writer_task,
        })
    }
}

#[async_trait]
impl EventHandler for BridgeService {
    async fn on_connect(&mut self, client: &ClientHandle) {
        self.open_connections += 1;
        info!(conn = %client.id(), peer = %client.peer(), "client connected");
    }

    async fn on_disconnect(&mut self, client: &ClientHandle, reason: &DisconnectReason) {
        self.open_connections = self.open_connections.saturating_sub(1);
        info!(conn = %client.id(), peer = %client.peer(), %reason, "client disconnected");
    }

    async fn on_data(&mut self, client: &ClientHandle, payload: &[u8]) {
        debug!(
            conn = %client.id(),
            peer = %client.peer(),
            bytes = payload.len(),
            "received data from client"
        );

        match self.writer.write(payload.to_vec()).await {
            Ok(n) => trace!(
                conn = %client.id(),
                device = self.writer.device(),
                bytes = n,
                "forwarded to serial"
            ),
            Err(e) => warn!(
                conn = %client.id(),
                peer = %client.peer(),
                device = self.writer.device(),
                error = %e,
                "serial write failed"
            ),
        }

        if client.is_closed() {
            debug!(
                conn = %client.id(),
                peer = %client.peer(),
                "client gone, acknowledgment dropped"
            );
            return;
        }
        if let Err(e) = client.send(acknowledgment(payload)) {
            warn!(conn = %client.id(), peer = %client.peer(), error = %e, "acknowledgment not sent");
        }
    }

    async fn on_tick(&mut self) {
        trace!(open_connections = self.open_connections, "tick");
    }
}

async fn accept_loop(
    listener: TcpListener,
    events: mpsc::Sender<BridgeEvent>,
    mut shutdown: watch::Receiver<bool>,
    read_buffer_size: usize,
) {
    let mut next_id: u64 = 1;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let id = ConnectionId(next_id);
                    next_id += 1;
                    spawn_connection(
                        stream,
                        id,
                        peer,
                        events.clone(),
                        shutdown.clone(),
                        read_buffer_size,
                    );
                }
                Err(e) => {
                    // Usually descriptor exhaustion; back off instead of spinning.
                    error!(error = %e, "accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            },
        }
    }
    debug!("acceptor stopped");
}

/// A started bridge.
#[derive(Debug)]
pub struct RunningBridge {
    local_addr: SocketAddr,
    device_name: String,
    shutdown_tx: watch::Sender<bool>,
    acceptor_task: JoinHandle<()>,
    reactor_task: JoinHandle<BridgeService>,
    writer_task: JoinHandle<WriterStats>,
}

impl RunningBridge {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Logical name of the serial device in use.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Stop accepting, close every connection and wait for the serial
    /// writer to drain.
    pub async fn shutdown(self) -> BridgeResult<WriterStats> {
        let _ = self.shutdown_tx.send(true);
        self.acceptor_task.await?;
        let service = self.reactor_task.await?;
        drop(service);
        let stats = self.writer_task.await?;
        info!(
            device = %self.device_name,
            writes = stats.writes,
            bytes = stats.bytes,
            failures = stats.failures,
            "bridge stopped"
        );
        Ok(stats)
    }

    /// Run until `signal` resolves, then shut down.
    pub async fn run_until<F>(self, signal: F) -> BridgeResult<WriterStats>
    where
        F: std::future::Future<Output = ()>,
    {
        signal.await;
        self.shutdown().await
    }
}
