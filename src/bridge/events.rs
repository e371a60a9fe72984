//! Events produced by client connections and consumed by the reactor.

use crate::error::{BridgeError, BridgeResult};
use std::fmt;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Identifier assigned to each accepted connection, unique per bridge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to one client connection: who it is and a way to write back to it.
///
/// Cloning the handle does not duplicate the connection.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ConnectionId,
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl ClientHandle {
    pub(crate) fn new(
        id: ConnectionId,
        peer: SocketAddr,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self { id, peer, outbound }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address of the client.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queue `bytes` to be written to the client as one contiguous write.
    pub fn send(&self, bytes: Vec<u8>) -> BridgeResult<()> {
        self.outbound
            .send(bytes)
            .map_err(|_| BridgeError::ConnectionClosed(self.id))
    }

    /// Whether the client's writer has gone away.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed its side.
    PeerClosed,
    /// A read failed.
    Error(String),
    /// The bridge is shutting down.
    Shutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "peer closed"),
            Self::Error(e) => write!(f, "read error: {e}"),
            Self::Shutdown => write!(f, "bridge shutdown"),
        }
    }
}

/// The three things that can happen on a connection.
#[derive(Debug)]
pub enum BridgeEvent {
    /// A client was accepted.
    Connected(ClientHandle),
    /// A client went away.
    Disconnected(ClientHandle, DisconnectReason),
    /// One read's worth of bytes arrived from a client.
    Data(ClientHandle, Vec<u8>),
}
