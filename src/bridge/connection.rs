//! Per-connection tasks.
//!
//! Each accepted socket is split: a reader task turns socket reads into
//! `BridgeEvent`s for the reactor, and a writer task drains the connection's
//! outbound queue onto the socket. The reader emits `Connected` first and
//! `Disconnected` last, so the reactor sees a connection's events in
//! transport order.

use super::events::{BridgeEvent, ClientHandle, ConnectionId, DisconnectReason};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Start the reader and writer tasks for an accepted socket.
pub(crate) fn spawn_connection(
    stream: TcpStream,
    id: ConnectionId,
    peer: SocketAddr,
    events: mpsc::Sender<BridgeEvent>,
    shutdown: watch::Receiver<bool>,
    read_buffer_size: usize,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(conn = %id, peer = %peer, error = %e, "could not set TCP_NODELAY");
    }

    let (reader, writer) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let client = ClientHandle::new(id, peer, outbound_tx);

    tokio::spawn(write_loop(writer, outbound_rx, id, peer));
    tokio::spawn(read_loop(reader, client, events, shutdown, read_buffer_size));
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    client: ClientHandle,
    events: mpsc::Sender<BridgeEvent>,
    mut shutdown: watch::Receiver<bool>,
    read_buffer_size: usize,
) {
    if events
        .send(BridgeEvent::Connected(client.clone()))
        .await
        .is_err()
    {
        return;
    }

    let mut buf = vec![0u8; read_buffer_size];
    let reason = loop {
        tokio::select! {
            _ = shutdown.changed() => break DisconnectReason::Shutdown,
            read = reader.read(&mut buf) => match read {
                Ok(0) => break DisconnectReason::PeerClosed,
                Ok(n) => {
                    let event = BridgeEvent::Data(client.clone(), buf[..n].to_vec());
                    if events.send(event).await.is_err() {
                        break DisconnectReason::Shutdown;
                    }
                }
                Err(e) => break DisconnectReason::Error(e.to_string()),
            },
        }
    };

    // The reactor may already be gone during shutdown.
    let _ = events.send(BridgeEvent::Disconnected(client, reason)).await;
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    id: ConnectionId,
    peer: SocketAddr,
) {
    while let Some(bytes) = outbound.recv().await {
        if let Err(e) = writer.write_all(&bytes).await {
            warn!(conn = %id, peer = %peer, error = %e, "failed to write to client");
            return;
        }
    }
    let _ = writer.shutdown().await;
}
