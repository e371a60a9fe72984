//! Configuration schema definitions.
//!
//! Every section derives serde with `#[serde(default)]`, so a config file only
//! needs the keys it wants to change.

use super::error::{ConfigError, ConfigResult};
use crate::port::PortConfiguration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Port the bridge listens on unless configured otherwise.
pub const DEFAULT_TELNET_PORT: u16 = 23;

/// Logical serial device name the bridge binds to by default.
pub const DEFAULT_DEVICE_NAME: &str = "uart_0";

/// Largest accepted `bridge.read_buffer_size`; every connection allocates one.
pub const MAX_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP side of the bridge
    pub bridge: BridgeConfig,
    /// Serial devices and the writer queue
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values that would make the bridge unusable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.bridge.serial_device.trim().is_empty() {
            return Err(ConfigError::invalid(
                "bridge.serial_device",
                "must name a serial device",
            ));
        }
        if self.bridge.read_buffer_size == 0 {
            return Err(ConfigError::invalid(
                "bridge.read_buffer_size",
                "must be greater than zero",
            ));
        }
        if self.bridge.read_buffer_size > MAX_READ_BUFFER_SIZE {
            return Err(ConfigError::invalid(
                "bridge.read_buffer_size",
                format!("must be at most {MAX_READ_BUFFER_SIZE} bytes"),
            ));
        }
        if self.serial.queue_depth == 0 {
            return Err(ConfigError::invalid(
                "serial.queue_depth",
                "must be greater than zero",
            ));
        }
        for (name, device) in &self.serial.devices {
            if device.path.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("serial.devices.{name}.path"),
                    "must not be empty",
                ));
            }
            if device.framing.baud_rate == 0 {
                return Err(ConfigError::invalid(
                    format!("serial.devices.{name}.baud_rate"),
                    "must be greater than zero",
                ));
            }
        }
        Ok(())
    }
}

/// Bridge (TCP listener) configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Host address to bind to
    pub host: String,
    /// Listening port, 23 by convention
    pub port: u16,
    /// Logical name of the serial device to forward to
    pub serial_device: String,
    /// Size of the per-connection read buffer, i.e. the largest data chunk
    pub read_buffer_size: usize,
    /// Interval of the periodic tick in milliseconds (0 disables it)
    pub tick_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_TELNET_PORT,
            serial_device: DEFAULT_DEVICE_NAME.to_string(),
            read_buffer_size: 1024,
            tick_interval_ms: 1000,
        }
    }
}

impl BridgeConfig {
    /// `host:port` string for binding.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Tick interval, or `None` when disabled.
    pub fn tick_interval(&self) -> Option<Duration> {
        (self.tick_interval_ms > 0).then(|| Duration::from_millis(self.tick_interval_ms))
    }
}

/// Serial configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Capacity of the single-writer queue in front of the device
    pub queue_depth: usize,
    /// Alternative names for configured devices
    pub aliases: HashMap<String, String>,
    /// Devices by logical name
    pub devices: BTreeMap<String, DeviceConfig>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        let mut devices = BTreeMap::new();
        devices.insert(DEFAULT_DEVICE_NAME.to_string(), DeviceConfig::default());
        Self {
            queue_depth: 64,
            aliases: HashMap::new(),
            devices,
        }
    }
}

impl SerialConfig {
    /// Resolve a device name through aliases.
    pub fn resolve_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// One serial device: where it lives and how it is framed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// System path, e.g. `/dev/ttyUSB0` or `COM3`
    pub path: String,
    #[serde(flatten)]
    pub framing: PortConfiguration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: default_device_path().to_string(),
            framing: PortConfiguration::default(),
        }
    }
}

fn default_device_path() -> &'static str {
    if cfg!(windows) {
        "COM1"
    } else {
        "/dev/ttyUSB0"
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
