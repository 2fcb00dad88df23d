//! End-to-end tests for the transport over the loopback engine

use std::cell::RefCell;
use std::rc::Rc;

use riptide_engine::{LoopbackClient, LoopbackNetwork, LoopbackServer};

use crate::bridge::RiptideTransport;
use crate::channel::{RELIABLE, UNRELIABLE};
use crate::codec::Segment;
use crate::config::TransportConfig;
use crate::contract::Transport;
use crate::error::TransportError;
use crate::lifecycle::{EventQueue, TransportEvent};

type LoopbackTransport = RiptideTransport<LoopbackServer, LoopbackClient>;

struct Harness {
    network: LoopbackNetwork,
    events: Rc<RefCell<EventQueue>>,
    transport: LoopbackTransport,
}

impl Harness {
    fn new(config: TransportConfig) -> Self {
        let network = LoopbackNetwork::new(config.engine_settings());
        let events = Rc::new(RefCell::new(EventQueue::new()));
        let transport =
            RiptideTransport::loopback(&network, config, Box::new(events.clone())).unwrap();
        Self {
            network,
            events,
            transport,
        }
    }

    fn scenario_config() -> TransportConfig {
        TransportConfig {
            port: 7777,
            max_connections: 4,
            use_engine_logger: false,
            ..Default::default()
        }
    }

    fn tick(&mut self) -> Vec<TransportEvent> {
        self.transport.update();
        self.drain()
    }

    fn drain(&self) -> Vec<TransportEvent> {
        self.events.borrow_mut().drain()
    }

    /// Start the server and connect this transport's own client to it
    fn host_and_join(&mut self) {
        self.transport.server_start().unwrap();
        self.transport.client_connect("localhost").unwrap();
        self.tick();
        assert!(self.transport.client_connected());
    }
}

#[test]
fn test_host_scenario() {
    let mut h = Harness::new(Harness::scenario_config());

    h.transport.server_start().unwrap();
    assert!(h.transport.server_active());

    h.transport.client_connect("localhost").unwrap();
    assert!(h.drain().is_empty());

    // Server accepts first, then the client learns about it in the same tick
    assert_eq!(
        h.tick(),
        vec![
            TransportEvent::ServerConnected {
                id: 1,
                address: String::new()
            },
            TransportEvent::ClientConnected,
        ]
    );
    assert_eq!(h.transport.server_get_client_address(1), "");

    let data = [42u8; 10];
    h.transport
        .client_send(Segment::from(&data), RELIABLE)
        .unwrap();
    assert_eq!(
        h.tick(),
        vec![TransportEvent::ServerDataReceived {
            id: 1,
            data: data.to_vec(),
            channel: RELIABLE
        }]
    );

    h.transport.server_stop();
    assert_eq!(h.drain(), vec![TransportEvent::ServerDisconnected { id: 1 }]);
    assert!(!h.transport.server_active());

    // Client learns the server went away on the next tick
    assert_eq!(h.tick(), vec![TransportEvent::ClientDisconnected]);
    assert!(!h.transport.client_connected());
}

#[test]
fn test_server_to_client_sub_range() {
    let mut h = Harness::new(Harness::scenario_config());
    h.host_and_join();

    let buffer: Vec<u8> = (0..20).collect();
    h.transport
        .server_send(1, Segment::new(&buffer, 4, 6).unwrap(), UNRELIABLE)
        .unwrap();
    assert_eq!(
        h.tick(),
        vec![TransportEvent::ClientDataReceived {
            data: buffer[4..10].to_vec(),
            channel: UNRELIABLE
        }]
    );
}

#[test]
fn test_unknown_channel_arrives_unreliable() {
    let mut h = Harness::new(Harness::scenario_config());
    h.host_and_join();

    h.transport.client_send(Segment::from(b"x"), 5).unwrap();
    assert_eq!(
        h.tick(),
        vec![TransportEvent::ServerDataReceived {
            id: 1,
            data: b"x".to_vec(),
            channel: UNRELIABLE
        }]
    );
}

#[test]
fn test_remote_client_joins() {
    let mut h = Harness::new(Harness::scenario_config());
    h.transport.server_start().unwrap();

    // A second process-like peer on the same network
    let mut remote = RiptideTransport::loopback(
        &h.network,
        Harness::scenario_config(),
        Box::new(()),
    )
    .unwrap();
    remote.client_connect("127.0.0.1:7777").unwrap();

    assert_eq!(
        h.tick(),
        vec![TransportEvent::ServerConnected {
            id: 1,
            address: String::new()
        }]
    );
    remote.update();
    assert!(remote.client_connected());

    remote.client_disconnect();
    assert_eq!(h.tick(), vec![TransportEvent::ServerDisconnected { id: 1 }]);
}

#[test]
fn test_idempotent_server_disconnect() {
    let mut h = Harness::new(Harness::scenario_config());
    h.host_and_join();

    h.transport.server_disconnect(1).unwrap();
    h.transport.server_disconnect(1).unwrap();

    let mut events = h.drain();
    events.extend(h.tick());
    let server_disconnects = events
        .iter()
        .filter(|e| **e == TransportEvent::ServerDisconnected { id: 1 })
        .count();
    assert_eq!(server_disconnects, 1);
    assert!(events.contains(&TransportEvent::ClientDisconnected));
}

#[test]
fn test_size_limit_produces_no_envelope() {
    let config = TransportConfig {
        max_message_payload_size: 64,
        ..Harness::scenario_config()
    };
    let mut h = Harness::new(config);
    h.host_and_join();

    let max = h.transport.get_max_packet_size(RELIABLE);
    let too_big = vec![0u8; max + 1];
    assert!(matches!(
        h.transport.client_send(Segment::from(&too_big), RELIABLE),
        Err(TransportError::SizeLimitExceeded { max: 64, .. })
    ));
    assert!(matches!(
        h.transport.server_send(1, Segment::from(&too_big), RELIABLE),
        Err(TransportError::SizeLimitExceeded { .. })
    ));
    assert!(h.tick().is_empty());

    let fits = vec![1u8; max];
    h.transport
        .client_send(Segment::from(&fits), RELIABLE)
        .unwrap();
    assert_eq!(h.tick().len(), 1);
}

#[test]
fn test_unknown_connection_leaves_state_alone() {
    let mut h = Harness::new(Harness::scenario_config());
    h.host_and_join();

    assert_eq!(
        h.transport.server_send(7, Segment::from(b"x"), RELIABLE),
        Err(TransportError::UnknownConnection(7))
    );
    assert_eq!(
        h.transport.server_disconnect(7),
        Err(TransportError::UnknownConnection(7))
    );

    assert!(h.transport.server_active());
    assert_eq!(h.transport.server().connection_count(), 1);
    assert!(h.transport.client_connected());
    assert!(h.drain().is_empty());
}

#[test]
fn test_client_send_while_idle() {
    let mut h = Harness::new(Harness::scenario_config());
    assert_eq!(
        h.transport.client_send(Segment::from(b"x"), RELIABLE),
        Err(TransportError::NotConnected)
    );
    h.transport.client_disconnect();
    assert!(h.drain().is_empty());
}

#[test]
fn test_connect_failure_reports_disconnect() {
    let mut h = Harness::new(Harness::scenario_config());
    h.transport.client_connect("localhost").unwrap();

    assert_eq!(h.tick(), vec![TransportEvent::ClientDisconnected]);
    assert!(!h.transport.client_connected());
}

#[test]
fn test_client_disconnect_reports_once() {
    let mut h = Harness::new(Harness::scenario_config());
    h.host_and_join();

    h.transport.client_disconnect();
    h.transport.client_disconnect();
    assert_eq!(h.drain(), vec![TransportEvent::ClientDisconnected]);
    assert_eq!(h.tick(), vec![TransportEvent::ServerDisconnected { id: 1 }]);
}

#[test]
fn test_shutdown_ordering() {
    let mut h = Harness::new(Harness::scenario_config());
    h.host_and_join();

    h.transport.shutdown();
    assert_eq!(
        h.drain(),
        vec![
            TransportEvent::ClientDisconnected,
            TransportEvent::ServerDisconnected { id: 1 },
        ]
    );
    assert!(h.transport.is_shut_down());
    assert!(!h.transport.server_active());
    assert!(!h.transport.client_connected());

    // Nothing fires after shutdown
    assert!(h.tick().is_empty());
}

#[test]
fn test_restart_after_shutdown() {
    let mut h = Harness::new(Harness::scenario_config());
    h.host_and_join();
    h.transport.shutdown();
    h.drain();

    h.host_and_join();
    assert!(!h.transport.is_shut_down());
    assert!(h.transport.server_active());
}
