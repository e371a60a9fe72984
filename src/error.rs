use crate::bridge::ConnectionId;
use crate::config::ConfigError;
use crate::registry::RegistryError;
use thiserror::Error;

/// A specialized `Result` type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Unified error type for starting and running the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The configured serial device could not be resolved; the bridge refuses to start.
    #[error("Cannot start bridge: {0}")]
    DeviceResolution(#[from] RegistryError),

    /// The TCP listener could not be bound.
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The client's connection has already closed.
    #[error("Connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    /// Logging could not be initialised.
    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    /// A background task panicked or was cancelled.
    #[error("Bridge task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// An I/O error occurred.
    #[error("An I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}
