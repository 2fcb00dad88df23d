//! Server session
//!
//! Tracks the live connection set and translates engine notifications into
//! [`ServerEvent`]s.

use std::net::SocketAddr;

use hashbrown::{HashMap, HashSet};
use riptide_engine::{ConnectionId, EngineError, Message, PeerServer, ServerNotification};

use crate::channel::ChannelId;
use crate::codec::{MessageCodec, Opcode, Payload, Role, Segment, route};
use crate::error::TransportError;

/// Events produced by the server session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A peer joined; `address` is empty when the engine does not report one
    Connected { id: ConnectionId, address: String },
    Disconnected { id: ConnectionId },
    DataReceived { id: ConnectionId, payload: Payload },
}

/// One live peer
#[derive(Debug, Clone)]
struct Connection {
    address: Option<SocketAddr>,
}

/// Server side of the bridge
pub struct ServerSession<S: PeerServer> {
    engine: S,
    codec: MessageCodec,
    connections: HashMap<ConnectionId, Connection>,
    /// Ids that were live earlier in this run
    departed: HashSet<ConnectionId>,
}

impl<S: PeerServer> ServerSession<S> {
    pub fn new(engine: S, codec: MessageCodec) -> Self {
        Self {
            engine,
            codec,
            connections: HashMap::new(),
            departed: HashSet::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_running()
    }

    pub fn engine(&self) -> &S {
        &self.engine
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Begin listening; no-op when already running
    pub fn start(&mut self, port: u16, max_connections: u16) -> Result<(), TransportError> {
        if self.is_active() {
            tracing::debug!(port, "Server already running");
            return Ok(());
        }

        self.engine
            .start(port, max_connections)
            .map_err(|e| match e {
                EngineError::AddressInUse(_) => TransportError::BindFailure {
                    port,
                    reason: e.to_string(),
                },
                other => TransportError::from(other),
            })?;

        self.connections.clear();
        self.departed.clear();

        tracing::info!(port, max_connections, "Server started");
        Ok(())
    }

    /// Stop listening, reporting every peer that was still connected
    pub fn stop(&mut self) -> Vec<ServerEvent> {
        if !self.is_active() {
            return Vec::new();
        }

        self.engine.stop();

        let mut ids: Vec<ConnectionId> = self.connections.drain().map(|(id, _)| id).collect();
        ids.sort_unstable();
        self.departed.extend(ids.iter().copied());

        tracing::info!(dropped = ids.len(), "Server stopped");
        ids.into_iter()
            .map(|id| ServerEvent::Disconnected { id })
            .collect()
    }

    /// Hand a segment for one peer to the engine's outbound queue
    pub fn send(
        &mut self,
        id: ConnectionId,
        segment: Segment<'_>,
        channel_id: ChannelId,
    ) -> Result<(), TransportError> {
        if !self.is_connected(id) {
            return Err(TransportError::UnknownConnection(id));
        }

        let message = self.codec.encode(Opcode::ServerMessage, segment, channel_id)?;
        self.engine.send(message, id)?;
        Ok(())
    }

    /// Close one peer's connection
    ///
    /// Ids that were live earlier in this run are already gone and yield
    /// `Ok(None)`. Ids never seen are an error.
    pub fn disconnect_client(
        &mut self,
        id: ConnectionId,
    ) -> Result<Option<ServerEvent>, TransportError> {
        if self.connections.remove(&id).is_none() {
            if self.departed.contains(&id) {
                tracing::debug!(client_id = id, "Client already disconnected");
                return Ok(None);
            }
            return Err(TransportError::UnknownConnection(id));
        }

        self.departed.insert(id);
        if let Err(e) = self.engine.disconnect_client(id) {
            tracing::warn!(client_id = id, error = %e, "Engine disconnect failed");
        }

        tracing::info!(client_id = id, "Client kicked");
        Ok(Some(ServerEvent::Disconnected { id }))
    }

    /// Remote address of a live peer, empty when unknown
    pub fn client_address(&self, id: ConnectionId) -> String {
        self.connections
            .get(&id)
            .and_then(|conn| conn.address)
            .map(|addr| addr.to_string())
            .unwrap_or_default()
    }

    /// Tick the engine and translate its notifications
    pub fn update(&mut self) -> Vec<ServerEvent> {
        if !self.is_active() {
            return Vec::new();
        }

        self.engine
            .update()
            .into_iter()
            .filter_map(|notification| self.handle_notification(notification))
            .collect()
    }

    fn handle_notification(&mut self, notification: ServerNotification) -> Option<ServerEvent> {
        match notification {
            ServerNotification::ClientConnected { id, address } => {
                self.departed.remove(&id);
                self.connections.insert(id, Connection { address });
                tracing::info!(client_id = id, ?address, "Client connected");
                Some(ServerEvent::Connected {
                    id,
                    address: address.map(|a| a.to_string()).unwrap_or_default(),
                })
            }
            ServerNotification::ClientDisconnected { id, reason } => {
                // Already reported when the disconnect was requested locally
                self.connections.remove(&id)?;
                self.departed.insert(id);
                tracing::info!(client_id = id, ?reason, "Client disconnected");
                Some(ServerEvent::Disconnected { id })
            }
            ServerNotification::MessageReceived { from, message } => {
                self.handle_message(from, message)
            }
        }
    }

    /// Decode a message from a peer
    pub fn handle_message(&mut self, from: ConnectionId, message: Message) -> Option<ServerEvent> {
        if !self.is_connected(from) {
            tracing::debug!(client_id = from, "Dropping message from unknown peer");
            return None;
        }

        match route(message.id()) {
            Some((_, Role::Server)) => {}
            _ => {
                tracing::warn!(
                    client_id = from,
                    opcode = message.id(),
                    "Dropping message not routed to server"
                );
                return None;
            }
        }

        match self.codec.decode(message) {
            Ok(payload) => Some(ServerEvent::DataReceived { id: from, payload }),
            Err(e) => {
                tracing::warn!(client_id = from, error = %e, "Failed to decode client message");
                None
            }
        }
    }
}

impl<S: PeerServer> std::fmt::Debug for ServerSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSession")
            .field("active", &self.is_active())
            .field("connections", &self.connections.len())
            .finish()
    }
}
