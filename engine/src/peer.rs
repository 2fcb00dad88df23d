//! Server and client surfaces of the messaging engine
//!
//! The bridge only ever talks to the engine through [`PeerServer`] and
//! [`PeerClient`]. Both are poll driven: `update()` processes pending I/O
//! and returns every notification that became due, in order.

use std::net::SocketAddr;

use crate::error::EngineError;
use crate::message::{DEFAULT_MAX_PAYLOAD_SIZE, Message};

/// Server-scoped id of an accepted peer
pub type ConnectionId = u16;

/// Engine-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Largest message body the engine accepts
    pub max_payload_size: usize,
    /// Emit the engine's internal log lines
    pub log_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            log_enabled: true,
        }
    }
}

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Closed by the local or remote side
    Disconnected,
    /// Removed by the server
    Kicked,
    /// Server shut down
    ServerStopped,
    /// Peer stopped responding
    TimedOut,
}

/// Raw notifications raised by a server during `update()`
#[derive(Debug, Clone, PartialEq)]
pub enum ServerNotification {
    /// A new peer was accepted
    ClientConnected {
        id: ConnectionId,
        /// Remote address, when the engine records one
        address: Option<SocketAddr>,
    },
    /// A peer went away
    ClientDisconnected {
        id: ConnectionId,
        reason: DisconnectReason,
    },
    /// A peer sent a message
    MessageReceived { from: ConnectionId, message: Message },
}

/// Raw notifications raised by a client during `update()`
#[derive(Debug, Clone, PartialEq)]
pub enum ClientNotification {
    /// Handshake completed, the server assigned `id`
    Connected { id: ConnectionId },
    /// Connection attempt was refused or timed out
    ConnectionFailed,
    /// Established connection ended
    Disconnected { reason: DisconnectReason },
    /// The server sent a message
    MessageReceived { message: Message },
}

/// Listening side of the engine
pub trait PeerServer {
    /// Start accepting peers on `port`
    fn start(&mut self, port: u16, max_connections: u16) -> Result<(), EngineError>;

    /// Drop every peer and release the port
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Settings this engine instance runs with
    fn settings(&self) -> EngineSettings;

    /// Queue a message for one peer
    fn send(&mut self, message: Message, to: ConnectionId) -> Result<(), EngineError>;

    /// Forcibly close one peer's connection
    fn disconnect_client(&mut self, id: ConnectionId) -> Result<(), EngineError>;

    /// Process I/O and return due notifications
    fn update(&mut self) -> Vec<ServerNotification>;
}

/// Connecting side of the engine
pub trait PeerClient {
    /// Begin an asynchronous connection attempt to `host:port`
    fn connect(&mut self, address: &str) -> Result<(), EngineError>;

    /// Close the connection or abandon the attempt
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn is_connecting(&self) -> bool;

    /// Settings this engine instance runs with
    fn settings(&self) -> EngineSettings;

    /// Queue a message for the server
    fn send(&mut self, message: Message) -> Result<(), EngineError>;

    /// Process I/O and return due notifications
    fn update(&mut self) -> Vec<ClientNotification>;
}
