//! End-to-end tests of the bridge over real loopback TCP with a mock UART.

#[path = "common/mod.rs"]
mod common;

use common::*;
use pretty_assertions::assert_eq;
use std::time::Duration;
use telnet_uart_bridge::{
    acknowledgment, BridgeError, BridgeService, ConfigError, DeviceRegistry, MockSerialPort,
    RegistryError,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[tokio::test]
async fn test_echo_and_forward() {
    let (bridge, mock) = start_bridge().await;
    let mut stream = connect(&bridge).await;

    let ack = send_and_ack(&mut stream, b"~20004642E00200FD37\r").await;

    assert_eq!(ack, b"Received your command: ~20004642E00200FD37\r".to_vec());
    assert_eq!(mock.get_write_log(), vec![b"~20004642E00200FD37\r".to_vec()]);
    assert_silent(&mut stream).await;

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_binary_payload_is_forwarded_verbatim() {
    let (bridge, mock) = start_bridge().await;
    let mut stream = connect(&bridge).await;

    // IAC sequences are not interpreted: the bridge is a raw relay.
    let payload: Vec<u8> = vec![0xff, 0xfb, 0x01, 0x00, b'\r', b'\n', 0x7f];
    let ack = send_and_ack(&mut stream, &payload).await;

    assert_eq!(ack, acknowledgment(&payload));
    assert_eq!(mock.written(), payload);

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_consecutive_events_are_acknowledged_independently() {
    let (bridge, mock) = start_bridge().await;
    let mut stream = connect(&bridge).await;

    let first = send_and_ack(&mut stream, b"first").await;
    let second = send_and_ack(&mut stream, b"second").await;

    assert_eq!(first, b"Received your command: first".to_vec());
    assert_eq!(second, b"Received your command: second".to_vec());
    assert_eq!(
        mock.get_write_log(),
        vec![b"first".to_vec(), b"second".to_vec()]
    );

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_connections_are_independent() {
    let (bridge, mock) = start_bridge().await;
    let mut alice = connect(&bridge).await;
    let mut bob = connect(&bridge).await;

    let from_alice = send_and_ack(&mut alice, b"alice-1").await;
    let from_bob = send_and_ack(&mut bob, b"bob-1").await;
    let again_alice = send_and_ack(&mut alice, b"alice-2").await;

    assert_eq!(from_alice, acknowledgment(b"alice-1"));
    assert_eq!(from_bob, acknowledgment(b"bob-1"));
    assert_eq!(again_alice, acknowledgment(b"alice-2"));
    assert_silent(&mut alice).await;
    assert_silent(&mut bob).await;
    assert_eq!(mock.written(), b"alice-1bob-1alice-2".to_vec());

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_does_not_stop_service() {
    let (bridge, mock) = start_bridge().await;

    let mut first = connect(&bridge).await;
    send_and_ack(&mut first, b"one").await;
    first.shutdown().await.unwrap();
    drop(first);

    let mut second = connect(&bridge).await;
    let ack = send_and_ack(&mut second, b"two").await;

    assert_eq!(ack, acknowledgment(b"two"));
    assert_eq!(mock.written(), b"onetwo".to_vec());

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_serial_failure_still_acknowledges() {
    let (bridge, mock) = start_bridge().await;
    mock.fail_next_writes(1);
    let mut stream = connect(&bridge).await;

    let ack = send_and_ack(&mut stream, b"dropped").await;
    assert_eq!(ack, acknowledgment(b"dropped"));

    let ack = send_and_ack(&mut stream, b"delivered").await;
    assert_eq!(ack, acknowledgment(b"delivered"));
    assert_eq!(mock.written(), b"delivered".to_vec());

    let stats = bridge.shutdown().await.unwrap();
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.writes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_all_reach_serial() {
    let (bridge, mock) = start_bridge().await;
    mock.set_max_chunk(5);

    let mut clients = Vec::new();
    for letter in [b'a', b'b', b'c'] {
        let stream = connect(&bridge).await;
        clients.push(tokio::spawn(async move {
            let mut stream = stream;
            for _ in 0..10 {
                let payload = vec![letter; 32];
                let ack = send_and_ack(&mut stream, &payload).await;
                assert_eq!(ack, acknowledgment(&payload));
            }
        }));
    }
    for client in clients {
        client.await.unwrap();
    }

    let written = mock.written();
    assert_eq!(written.len(), 3 * 10 * 32);
    for letter in [b'a', b'b', b'c'] {
        assert_eq!(written.iter().filter(|b| **b == letter).count(), 320);
    }

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unresolvable_device_refuses_to_start() {
    // Find a free port, then make sure the bridge never binds it.
    let vacant = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = vacant.local_addr().unwrap().port();
    drop(vacant);

    let mut config = test_config();
    config.bridge.port = port;
    config.bridge.serial_device = "uart_missing".to_string();

    let mut registry = DeviceRegistry::new();
    registry.attach("uart_0", MockSerialPort::new("MOCK0"));

    let err = BridgeService::start(&config, &mut registry).await.unwrap_err();
    assert!(
        matches!(
            err,
            BridgeError::DeviceResolution(RegistryError::NotFound { ref name, .. }) if name == "uart_missing"
        ),
        "unexpected error: {err}"
    );
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
}

#[tokio::test]
async fn test_oversized_read_buffer_refuses_to_start() {
    let mut config = test_config();
    config.bridge.read_buffer_size = usize::MAX;

    let mut registry = DeviceRegistry::new();
    registry.attach("uart_0", MockSerialPort::new("MOCK0"));

    let err = BridgeService::start(&config, &mut registry).await.unwrap_err();
    assert!(
        matches!(
            err,
            BridgeError::Config(ConfigError::Invalid { ref key, .. })
                if key == "bridge.read_buffer_size"
        ),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config();
    config.bridge.port = occupied.local_addr().unwrap().port();

    let mut registry = DeviceRegistry::new();
    registry.attach("uart_0", MockSerialPort::new("MOCK0"));

    let err = BridgeService::start(&config, &mut registry).await.unwrap_err();
    assert!(matches!(err, BridgeError::Bind { .. }), "unexpected error: {err}");
}

#[tokio::test]
async fn test_device_alias_is_honoured() {
    let mut config = test_config();
    config.bridge.serial_device = "bms".to_string();
    config
        .serial
        .aliases
        .insert("bms".to_string(), "uart_0".to_string());

    let (bridge, mock) = start_bridge_with(config).await;
    assert_eq!(bridge.device_name(), "uart_0");

    let mut stream = connect(&bridge).await;
    send_and_ack(&mut stream, b"via alias").await;
    assert_eq!(mock.written(), b"via alias".to_vec());

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_open_connections() {
    let (bridge, _mock) = start_bridge().await;
    let mut stream = connect(&bridge).await;
    send_and_ack(&mut stream, b"hello").await;

    bridge.shutdown().await.unwrap();

    // The bridge side closes, so the client sees EOF (or a reset).
    let mut buf = [0u8; 8];
    let read = tokio::time::timeout(
        Duration::from_secs(5),
        tokio::io::AsyncReadExt::read(&mut stream, &mut buf),
    )
    .await
    .expect("connection was not closed on shutdown");
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[tokio::test]
async fn test_serial_sees_bytes_from_unacknowledged_stream() {
    let (bridge, mock) = start_bridge().await;
    let mut stream = connect(&bridge).await;

    // Several writes without waiting; chunking is up to TCP, but every byte
    // reaches the device in order.
    for part in [&b"~2000"[..], b"4642E0", b"0200FD37\r"] {
        stream.write_all(part).await.unwrap();
    }
    wait_for_serial(&mock, |w| w == b"~20004642E00200FD37\r").await;

    bridge.shutdown().await.unwrap();
}
