//! TCP to serial bridge.
//!
//! - `events`: the connect / disconnect / data events and client handles
//! - `connection`: per-socket reader and writer tasks
//! - `reactor`: dispatches events to handlers one at a time
//! - `writer`: single-writer queue owning the serial device
//! - `service`: the bridge handlers and startup

mod connection;
pub mod events;
pub mod reactor;
pub mod service;
pub mod writer;

pub use events::{BridgeEvent, ClientHandle, ConnectionId, DisconnectReason};
pub use reactor::{EventHandler, Reactor};
pub use service::{acknowledgment, BridgeService, RunningBridge, ACK_PREFIX};
pub use writer::{SerialWriter, WriterStats};
