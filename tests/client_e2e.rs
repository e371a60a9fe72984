//! `BridgeClient` against a running bridge.

#[path = "common/mod.rs"]
mod common;

use common::*;
use pretty_assertions::assert_eq;
use std::time::Duration;
use telnet_uart_bridge::{acknowledgment, BridgeClient, ClientError};
use tokio_test::{assert_err, assert_ok};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_client_round_trip() {
    let (bridge, mock) = start_bridge().await;
    let mut client = assert_ok!(BridgeClient::connect(bridge.local_addr(), WAIT).await);

    let ack = assert_ok!(client.send(b"~20004642E00200FD37\r").await);

    assert_eq!(ack, b"Received your command: ~20004642E00200FD37\r".to_vec());
    assert_eq!(mock.written(), b"~20004642E00200FD37\r".to_vec());

    assert_ok!(client.close().await);
    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_polls_battery_commands_in_order() {
    let (bridge, mock) = start_bridge().await;
    let mut client = assert_ok!(BridgeClient::connect(bridge.local_addr(), WAIT).await);

    // Telemetry, alarm and system-parameter requests for pack 0.
    let commands = [
        "~20004642E00200FD37\r",
        "~20004644E00200FD35\r",
        "~20004647E00200FD32\r",
    ];
    let acks = assert_ok!(client.send_commands(&commands).await);

    assert_eq!(acks.len(), commands.len());
    for (ack, command) in acks.iter().zip(commands) {
        assert_eq!(ack, &acknowledgment(command.as_bytes()));
    }
    assert_eq!(mock.written(), commands.concat().into_bytes());

    assert_ok!(client.close().await);
    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_stays_in_step_with_small_read_buffer() {
    let mut config = test_config();
    config.bridge.read_buffer_size = 8;
    let (bridge, mock) = start_bridge_with(config).await;
    let mut client = assert_ok!(BridgeClient::connect(bridge.local_addr(), WAIT).await);

    // 20 bytes arrive over several 8-byte reads, each acknowledged on its own.
    let ack = assert_ok!(client.send(b"~20004642E00200FD37\r").await);
    let text = String::from_utf8(ack).unwrap();
    assert!(text.matches("Received your command: ").count() >= 2, "{text:?}");
    assert_eq!(text.replace("Received your command: ", ""), "~20004642E00200FD37\r");

    let ack = assert_ok!(client.send(b"ab").await);
    assert_eq!(ack, acknowledgment(b"ab"));
    assert_eq!(mock.written(), b"~20004642E00200FD37\rab".to_vec());

    assert_ok!(client.close().await);
    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_reports_refused_connection() {
    let vacant = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = vacant.local_addr().unwrap();
    drop(vacant);

    let err = assert_err!(BridgeClient::connect(addr, WAIT).await);
    assert!(matches!(err, ClientError::Connect { .. }), "unexpected error: {err}");
}

#[tokio::test]
async fn test_client_sees_bridge_shutdown() {
    let (bridge, _mock) = start_bridge().await;
    let mut client = assert_ok!(BridgeClient::connect(bridge.local_addr(), WAIT).await);
    assert_ok!(client.send(b"before").await);

    bridge.shutdown().await.unwrap();

    let err = assert_err!(client.send(b"after").await);
    assert!(
        matches!(err, ClientError::Closed | ClientError::Io(_)),
        "unexpected error: {err}"
    );
}
