//! Shared test utilities for the bridge integration tests.
//!
//! - Starting a bridge on an ephemeral loopback port with a mock device
//! - Reading acknowledgments off a raw TCP stream
//! - Waiting for the mock device to observe writes

#![allow(dead_code)]

use std::time::Duration;
use telnet_uart_bridge::config::Config;
use telnet_uart_bridge::{acknowledgment, BridgeService, DeviceRegistry, MockSerialPort, RunningBridge};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// How long any single step of a test may take before it is a failure.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Config listening on an ephemeral loopback port, bound to `uart_0`, no tick.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.bridge.host = "127.0.0.1".to_string();
    config.bridge.port = 0;
    config.bridge.tick_interval_ms = 0;
    config
}

/// Start a bridge whose `uart_0` is a mock; returns the bridge and a handle
/// sharing the mock's state.
pub async fn start_bridge() -> (RunningBridge, MockSerialPort) {
    start_bridge_with(test_config()).await
}

pub async fn start_bridge_with(config: Config) -> (RunningBridge, MockSerialPort) {
    let mock = MockSerialPort::new("MOCK0");
    let mut registry = DeviceRegistry::new();
    registry.attach("uart_0", mock.clone());

    let bridge = BridgeService::start(&config, &mut registry)
        .await
        .expect("bridge should start with a mock device");
    (bridge, mock)
}

/// Open a raw TCP connection to the bridge.
pub async fn connect(bridge: &RunningBridge) -> TcpStream {
    let stream = tokio::time::timeout(STEP_TIMEOUT, TcpStream::connect(bridge.local_addr()))
        .await
        .expect("connect timed out")
        .expect("connect failed");
    stream.set_nodelay(true).unwrap();
    stream
}

/// Read exactly `len` bytes or fail the test.
pub async fn read_exactly(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    tokio::time::timeout(STEP_TIMEOUT, stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for bridge response")
        .expect("read failed");
    buf
}

/// Write `payload` and read back its acknowledgment.
pub async fn send_and_ack(stream: &mut TcpStream, payload: &[u8]) -> Vec<u8> {
    stream.write_all(payload).await.unwrap();
    read_exactly(stream, acknowledgment(payload).len()).await
}

/// Poll the mock until `check` holds for its concatenated output.
pub async fn wait_for_serial<F>(mock: &MockSerialPort, check: F)
where
    F: Fn(&[u8]) -> bool,
{
    let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
    loop {
        if check(&mock.written()) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "serial device never saw expected bytes; got {:?}",
            String::from_utf8_lossy(&mock.written())
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Assert that nothing more arrives on `stream` for a short while.
pub async fn assert_silent(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    match tokio::time::timeout(Duration::from_millis(150), stream.read(&mut buf)).await {
        Err(_) => {}
        Ok(Ok(n)) => panic!(
            "unexpected {} bytes: {:?}",
            n,
            String::from_utf8_lossy(&buf[..n])
        ),
        Ok(Err(e)) => panic!("read failed: {e}"),
    }
}
