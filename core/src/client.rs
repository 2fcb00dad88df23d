//! Client session
//!
//! Owns the single outbound connection to a remote server.
//!
//! ```text
//! Idle --connect--> Connecting --Connected--> Connected
//!  ^                    |                         |
//!  +------failed--------+-------disconnect--------+
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use riptide_engine::{ClientNotification, Message, PeerClient};

use crate::channel::ChannelId;
use crate::codec::{MessageCodec, Opcode, Payload, Role, Segment, route};
use crate::error::TransportError;

/// Address meaning "this machine"
pub const LOCALHOST: &str = "localhost";

/// Client session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No connection
    Idle,
    /// Attempt handed to the engine, waiting for the outcome
    Connecting,
    /// Connection established
    Connected,
}

/// Events produced by the client session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected,
    /// Connection ended or the attempt failed
    Disconnected,
    DataReceived(Payload),
}

/// Client side of the bridge
pub struct ClientSession<C: PeerClient> {
    engine: C,
    state: ClientState,
    /// Port used when the address does not name one
    port: u16,
    codec: MessageCodec,
}

impl<C: PeerClient> ClientSession<C> {
    pub fn new(engine: C, port: u16, codec: MessageCodec) -> Self {
        Self {
            engine,
            state: ClientState::Idle,
            port,
            codec,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ClientState::Connected
    }

    pub fn engine(&self) -> &C {
        &self.engine
    }

    /// Rewrite an upward address into the `host:port` form the engine takes
    ///
    /// `"localhost"` becomes the loopback address on the configured port,
    /// and a bare host or IP gets the configured port appended.
    pub fn resolve_address(&self, address: &str) -> Result<String, TransportError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(TransportError::InvalidAddress(address.to_string()));
        }

        if address.eq_ignore_ascii_case(LOCALHOST) {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.port).to_string());
        }
        if let Ok(addr) = address.parse::<SocketAddr>() {
            return Ok(addr.to_string());
        }
        let bare = address
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .unwrap_or(address);
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port).to_string());
        }
        if address.contains(':') {
            return Ok(address.to_string());
        }
        Ok(format!("{}:{}", address, self.port))
    }

    /// Begin connecting; the outcome arrives as an event on a later update
    ///
    /// Ignored unless the session is idle.
    pub fn connect(&mut self, address: &str) -> Result<(), TransportError> {
        if self.state != ClientState::Idle {
            tracing::warn!(state = ?self.state, "Client connect ignored, already active");
            return Ok(());
        }

        let resolved = self.resolve_address(address)?;
        self.engine.connect(&resolved)?;
        self.state = ClientState::Connecting;

        tracing::info!(address = %resolved, "Client connecting");
        Ok(())
    }

    /// End the connection or abandon the attempt
    ///
    /// Returns the disconnect event when there was something to end.
    pub fn disconnect(&mut self) -> Option<ClientEvent> {
        if self.state == ClientState::Idle {
            return None;
        }

        self.engine.disconnect();
        self.state = ClientState::Idle;
        tracing::info!("Client disconnected");
        Some(ClientEvent::Disconnected)
    }

    /// Hand a segment to the engine's outbound queue
    pub fn send(&mut self, segment: Segment<'_>, channel_id: ChannelId) -> Result<(), TransportError> {
        if self.state != ClientState::Connected {
            return Err(TransportError::NotConnected);
        }

        let message = self.codec.encode(Opcode::ClientMessage, segment, channel_id)?;
        self.engine.send(message)?;
        Ok(())
    }

    /// Tick the engine and translate its notifications
    pub fn update(&mut self) -> Vec<ClientEvent> {
        self.engine
            .update()
            .into_iter()
            .filter_map(|notification| self.handle_notification(notification))
            .collect()
    }

    fn handle_notification(&mut self, notification: ClientNotification) -> Option<ClientEvent> {
        match notification {
            ClientNotification::Connected { id } => {
                if self.state != ClientState::Connecting {
                    tracing::trace!(state = ?self.state, "Ignoring stale connect");
                    return None;
                }
                self.state = ClientState::Connected;
                tracing::info!(client_id = id, "Client connected");
                Some(ClientEvent::Connected)
            }
            ClientNotification::ConnectionFailed => {
                if self.state != ClientState::Connecting {
                    return None;
                }
                self.state = ClientState::Idle;
                tracing::warn!("Client connection attempt failed");
                Some(ClientEvent::Disconnected)
            }
            ClientNotification::Disconnected { reason } => {
                if self.state == ClientState::Idle {
                    return None;
                }
                self.state = ClientState::Idle;
                tracing::info!(?reason, "Client connection closed");
                Some(ClientEvent::Disconnected)
            }
            ClientNotification::MessageReceived { message } => self.handle_message(message),
        }
    }

    /// Decode a message from the server
    pub fn handle_message(&mut self, message: Message) -> Option<ClientEvent> {
        if self.state != ClientState::Connected {
            tracing::debug!("Dropping message received while not connected");
            return None;
        }

        match route(message.id()) {
            Some((_, Role::Client)) => {}
            _ => {
                tracing::warn!(opcode = message.id(), "Dropping message not routed to client");
                return None;
            }
        }

        match self.codec.decode(message) {
            Ok(payload) => Some(ClientEvent::DataReceived(payload)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode server message");
                None
            }
        }
    }
}

impl<C: PeerClient> std::fmt::Debug for ClientSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("state", &self.state)
            .field("port", &self.port)
            .finish()
    }
}
