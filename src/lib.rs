//! Telnet UART Bridge Library
//!
//! Forwards bytes from TCP clients (the conventional Telnet port, without
//! Telnet negotiation) to a serial device and acknowledges each chunk with
//! `"Received your command: "` followed by the bytes themselves.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `error`: Unified error handling
//! - `logging`: `tracing` subscriber setup
//! - `port`: Serial device abstraction (real and mock)
//! - `registry`: Resolve serial devices by logical name
//! - `bridge`: Listener, connection tasks, reactor and serial writer
//! - `client`: Client for a running bridge

pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod port;
pub mod registry;

// Re-export commonly used types for convenience
pub use bridge::{
    acknowledgment, BridgeService, ClientHandle, ConnectionId, DisconnectReason, EventHandler,
    RunningBridge, SerialWriter, WriterStats, ACK_PREFIX,
};
pub use client::{BridgeClient, ClientError};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use error::{BridgeError, BridgeResult};
pub use port::{MockSerialPort, PortConfiguration, PortError, SerialPortAdapter, SyncSerialPort};
pub use registry::{DeviceRegistry, RegistryError};
