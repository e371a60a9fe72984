//! Configuration for the bridge.
//!
//! TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! 1. `TELNET_UART_CONFIG` environment variable (explicit path)
//! 2. `./telnet-uart-bridge.toml` (current directory)
//! 3. The platform config directory, e.g. `~/.config/telnet-uart-bridge/`
//! 4. Built-in defaults (no file required)
//!
//! # Example
//!
//! ```toml
//! [bridge]
//! port = 23
//! serial_device = "uart_0"
//!
//! [serial.devices.uart_0]
//! path = "/dev/ttyUSB0"
//! baud_rate = 19200
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{
    BridgeConfig, Config, DeviceConfig, LogFormat, LoggingConfig, SerialConfig,
    DEFAULT_DEVICE_NAME, DEFAULT_TELNET_PORT, MAX_READ_BUFFER_SIZE,
};
