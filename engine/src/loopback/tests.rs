//! Tests for the loopback engine

use super::network::parse_port;
use super::*;
use crate::error::EngineError;
use crate::message::{Message, SendMode};
use crate::peer::{
    ClientNotification, DisconnectReason, PeerClient, PeerServer, ServerNotification,
};

fn quiet_network() -> LoopbackNetwork {
    LoopbackNetwork::new(EngineSettings {
        log_enabled: false,
        ..Default::default()
    })
}

fn connected_pair(network: &LoopbackNetwork) -> (LoopbackServer, LoopbackClient) {
    let mut server = network.server();
    let mut client = network.client();
    server.start(7777, 4).unwrap();
    client.connect("127.0.0.1:7777").unwrap();
    server.update();
    client.update();
    (server, client)
}

fn text_message(mode: SendMode, text: &str) -> Message {
    let mut msg = Message::new(mode, 1);
    msg.add_bytes(text.as_bytes());
    msg
}

#[test]
fn test_parse_port() {
    assert_eq!(parse_port("127.0.0.1:7777"), Ok(7777));
    assert_eq!(parse_port("localhost:80"), Ok(80));
    assert!(matches!(
        parse_port("127.0.0.1"),
        Err(EngineError::InvalidAddress(_))
    ));
    assert!(parse_port(":7777").is_err());
    assert!(parse_port("host:99999").is_err());
}

#[test]
fn test_server_start_stop() {
    let network = quiet_network();
    let mut server = network.server();
    assert!(!server.is_running());

    server.start(7777, 4).unwrap();
    assert!(server.is_running());
    assert_eq!(server.port(), Some(7777));

    server.stop();
    assert!(!server.is_running());
    // Port released
    let mut other = network.server();
    other.start(7777, 4).unwrap();
}

#[test]
fn test_port_in_use() {
    let network = quiet_network();
    let mut first = network.server();
    let mut second = network.server();
    first.start(7777, 4).unwrap();

    assert_eq!(second.start(7777, 4), Err(EngineError::AddressInUse(7777)));
    assert!(!second.is_running());
}

#[test]
fn test_connect_resolves_on_update() {
    let network = quiet_network();
    let mut server = network.server();
    let mut client = network.client();
    server.start(7777, 4).unwrap();

    client.connect("127.0.0.1:7777").unwrap();
    assert!(client.is_connecting());
    assert!(!client.is_connected());

    assert_eq!(
        server.update(),
        vec![ServerNotification::ClientConnected {
            id: 1,
            address: None
        }]
    );
    assert_eq!(client.update(), vec![ClientNotification::Connected { id: 1 }]);
    assert!(client.is_connected());
    assert!(!client.is_connecting());
}

#[test]
fn test_connect_without_listener_fails() {
    let network = quiet_network();
    let mut client = network.client();
    client.connect("127.0.0.1:9000").unwrap();

    assert_eq!(client.update(), vec![ClientNotification::ConnectionFailed]);
    assert!(!client.is_connected());
    assert!(!client.is_connecting());
}

#[test]
fn test_connect_refused_when_full() {
    let network = quiet_network();
    let mut server = network.server();
    server.start(7777, 1).unwrap();

    let mut first = network.client();
    let mut second = network.client();
    first.connect("127.0.0.1:7777").unwrap();
    second.connect("127.0.0.1:7777").unwrap();
    server.update();

    assert_eq!(first.update(), vec![ClientNotification::Connected { id: 1 }]);
    assert_eq!(second.update(), vec![ClientNotification::ConnectionFailed]);
}

#[test]
fn test_ids_reused_lowest_first() {
    let network = quiet_network();
    let mut server = network.server();
    server.start(7777, 4).unwrap();

    let mut a = network.client();
    let mut b = network.client();
    a.connect("127.0.0.1:7777").unwrap();
    b.connect("127.0.0.1:7777").unwrap();
    server.update();
    a.update();
    b.update();

    a.disconnect();
    let mut c = network.client();
    c.connect("127.0.0.1:7777").unwrap();
    server.update();
    assert_eq!(c.update(), vec![ClientNotification::Connected { id: 1 }]);
}

#[test]
fn test_messages_flow_both_ways() {
    let network = quiet_network();
    let (mut server, mut client) = connected_pair(&network);

    client
        .send(text_message(SendMode::Reliable, "ping"))
        .unwrap();
    let notifications = server.update();
    assert_eq!(
        notifications,
        vec![ServerNotification::MessageReceived {
            from: 1,
            message: text_message(SendMode::Reliable, "ping"),
        }]
    );

    server
        .send(text_message(SendMode::Unreliable, "pong"), 1)
        .unwrap();
    assert_eq!(
        client.update(),
        vec![ClientNotification::MessageReceived {
            message: text_message(SendMode::Unreliable, "pong"),
        }]
    );
}

#[test]
fn test_send_checks_payload_size() {
    let network = LoopbackNetwork::new(EngineSettings {
        max_payload_size: 8,
        log_enabled: false,
    });
    let (_server, mut client) = connected_pair(&network);

    let msg = text_message(SendMode::Reliable, "too long for eight");
    assert!(matches!(
        client.send(msg),
        Err(EngineError::PayloadTooLarge { max: 8, .. })
    ));
}

#[test]
fn test_client_send_requires_connection() {
    let network = quiet_network();
    let mut client = network.client();
    assert_eq!(
        client.send(text_message(SendMode::Reliable, "x")),
        Err(EngineError::NotConnected)
    );
}

#[test]
fn test_server_send_unknown_client() {
    let network = quiet_network();
    let mut server = network.server();
    server.start(7777, 4).unwrap();
    assert_eq!(
        server.send(text_message(SendMode::Reliable, "x"), 3),
        Err(EngineError::UnknownClient(3))
    );
}

#[test]
fn test_kick_notifies_both_sides() {
    let network = quiet_network();
    let (mut server, mut client) = connected_pair(&network);

    server.disconnect_client(1).unwrap();
    assert_eq!(
        server.update(),
        vec![ServerNotification::ClientDisconnected {
            id: 1,
            reason: DisconnectReason::Kicked
        }]
    );
    assert_eq!(
        client.update(),
        vec![ClientNotification::Disconnected {
            reason: DisconnectReason::Kicked
        }]
    );
    assert!(!client.is_connected());
    assert_eq!(server.disconnect_client(1), Err(EngineError::UnknownClient(1)));
}

#[test]
fn test_client_disconnect_notifies_server_only() {
    let network = quiet_network();
    let (mut server, mut client) = connected_pair(&network);

    client.disconnect();
    assert!(client.update().is_empty());
    assert_eq!(
        server.update(),
        vec![ServerNotification::ClientDisconnected {
            id: 1,
            reason: DisconnectReason::Disconnected
        }]
    );
}

#[test]
fn test_disconnect_discards_undelivered() {
    let network = quiet_network();
    let (mut server, mut client) = connected_pair(&network);

    server
        .send(text_message(SendMode::Reliable, "late"), 1)
        .unwrap();
    client.disconnect();
    assert!(client.update().is_empty());
}

#[test]
fn test_server_stop_drops_clients() {
    let network = quiet_network();
    let (mut server, mut client) = connected_pair(&network);

    server.stop();
    assert!(server.update().is_empty());
    assert_eq!(
        client.update(),
        vec![ClientNotification::Disconnected {
            reason: DisconnectReason::ServerStopped
        }]
    );
}

#[test]
fn test_dropping_server_releases_port() {
    let network = quiet_network();
    {
        let mut server = network.server();
        server.start(7777, 4).unwrap();
    }
    let mut server = network.server();
    server.start(7777, 4).unwrap();
}

#[test]
fn test_network_debug() {
    let network = quiet_network();
    let debug = format!("{:?}", network);
    assert!(debug.contains("LoopbackNetwork"));
    assert!(debug.contains("settings"));
}

#[test]
fn test_handles_report_network_settings() {
    let settings = EngineSettings {
        max_payload_size: 512,
        log_enabled: false,
    };
    let network = LoopbackNetwork::new(settings);
    assert_eq!(network.server().settings(), settings);
    assert_eq!(network.client().settings(), settings);
}
