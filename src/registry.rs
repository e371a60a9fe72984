//! Serial device lookup by logical name.
//!
//! The bridge never holds an unchecked device reference: it asks the registry
//! to resolve a name and either gets an open device or a `RegistryError`.
//! Resolving hands out the device exclusively, so a name resolves once.

use crate::config::{DeviceConfig, SerialConfig};
use crate::port::{PortAdapter, PortError, SerialPortAdapter, SyncSerialPort};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from resolving a serial device.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No device is registered under this name (after alias resolution).
    #[error("No serial device named '{name}' (known: {known})")]
    NotFound { name: String, known: String },

    /// The device is configured but could not be opened.
    #[error("Failed to open serial device '{name}' at '{path}': {source}")]
    Open {
        name: String,
        path: String,
        #[source]
        source: PortError,
    },
}

#[derive(Debug)]
enum DeviceEntry {
    /// Opened on resolution from its configuration.
    Configured(DeviceConfig),
    /// Already open, e.g. a mock supplied by a test.
    Attached(PortAdapter),
}

/// A device handed out by the registry.
#[derive(Debug)]
pub struct ResolvedDevice {
    /// Logical name the device was registered under.
    pub name: String,
    /// The open device.
    pub port: PortAdapter,
}

/// Registry of serial devices keyed by logical name.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    aliases: HashMap<String, String>,
    entries: BTreeMap<String, DeviceEntry>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `[serial]` configuration section.
    pub fn from_config(config: &SerialConfig) -> Self {
        let entries = config
            .devices
            .iter()
            .map(|(name, device)| (name.clone(), DeviceEntry::Configured(device.clone())))
            .collect();
        Self {
            aliases: config.aliases.clone(),
            entries,
        }
    }

    /// Register an already-open device under `name`, replacing any entry.
    pub fn attach(&mut self, name: impl Into<String>, port: impl SerialPortAdapter + 'static) {
        self.entries
            .insert(name.into(), DeviceEntry::Attached(Box::new(port)));
    }

    /// Make `alias` resolve to `target`.
    pub fn alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Whether `name` (or the alias target) is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(self.canonical(name))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Resolve `name` to an open device, removing it from the registry.
    pub fn resolve(&mut self, name: &str) -> Result<ResolvedDevice, RegistryError> {
        let canonical = self.canonical(name).to_string();
        if canonical != name {
            debug!(alias = name, device = %canonical, "resolved serial device alias");
        }

        let entry = self
            .entries
            .remove(&canonical)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
                known: self.names().join(", "),
            })?;

        let port: PortAdapter = match entry {
            DeviceEntry::Attached(port) => port,
            DeviceEntry::Configured(device) => {
                let port = SyncSerialPort::open(&device.path, &device.framing).map_err(
                    |source| RegistryError::Open {
                        name: canonical.clone(),
                        path: device.path.clone(),
                        source,
                    },
                )?;
                info!(
                    device = %canonical,
                    path = %device.path,
                    baud = device.framing.baud_rate,
                    "opened serial device"
                );
                Box::new(port)
            }
        };

        Ok(ResolvedDevice {
            name: canonical,
            port,
        })
    }
}
