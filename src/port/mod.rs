//! Serial device abstraction layer.
//!
//! The bridge only ever writes to its device, so the abstraction is a
//! transmit-side trait with a `serialport`-backed implementation and a mock.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::MockSerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::*;

/// Owned, type-erased serial device as handed out by the registry.
pub type PortAdapter = Box<dyn SerialPortAdapter>;

/// A serial port visible to the operating system.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
}

/// List the serial ports the operating system currently reports.
pub fn available_ports() -> Result<Vec<PortInfo>, PortError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let kind = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => match info.product {
                    Some(product) => format!("usb ({product})"),
                    None => "usb".to_string(),
                },
                serialport::SerialPortType::PciPort => "pci".to_string(),
                serialport::SerialPortType::BluetoothPort => "bluetooth".to_string(),
                serialport::SerialPortType::Unknown => "unknown".to_string(),
            };
            PortInfo {
                name: p.port_name,
                kind,
            }
        })
        .collect())
}
