//! Shared state of the in-process network

use std::collections::{BTreeMap, VecDeque};

use hashbrown::HashMap;

use crate::error::EngineError;
use crate::message::Message;
use crate::peer::{
    ClientNotification, ConnectionId, DisconnectReason, EngineSettings, ServerNotification,
};

/// Identifies one client handle on the hub
pub(super) type EndpointKey = u64;

/// First id handed to an accepted peer
const FIRST_CONNECTION_ID: ConnectionId = 1;

/// A bound server port
struct Listener {
    max_connections: u16,
    connections: BTreeMap<ConnectionId, EndpointKey>,
    inbox: VecDeque<ServerNotification>,
}

impl Listener {
    /// Lowest id not currently in use
    fn next_free_id(&self) -> Option<ConnectionId> {
        (FIRST_CONNECTION_ID..=ConnectionId::MAX).find(|id| !self.connections.contains_key(id))
    }
}

#[derive(Debug, Clone, Copy)]
struct Link {
    port: u16,
    id: ConnectionId,
}

#[derive(Default)]
struct ClientEndpoint {
    link: Option<Link>,
    connecting: Option<u16>,
    inbox: VecDeque<ClientNotification>,
}

/// Routing state shared by every handle created from one network
pub(super) struct Hub {
    pub(super) settings: EngineSettings,
    listeners: HashMap<u16, Listener>,
    clients: HashMap<EndpointKey, ClientEndpoint>,
    pending: VecDeque<(EndpointKey, u16)>,
    next_key: EndpointKey,
}

impl Hub {
    pub(super) fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            listeners: HashMap::new(),
            clients: HashMap::new(),
            pending: VecDeque::new(),
            next_key: 0,
        }
    }

    pub(super) fn check_size(&self, message: &Message) -> Result<(), EngineError> {
        if message.len() > self.settings.max_payload_size {
            return Err(EngineError::PayloadTooLarge {
                size: message.len(),
                max: self.settings.max_payload_size,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Servers
    // ------------------------------------------------------------------

    pub(super) fn bind(&mut self, port: u16, max_connections: u16) -> Result<(), EngineError> {
        if self.listeners.contains_key(&port) {
            return Err(EngineError::AddressInUse(port));
        }

        self.listeners.insert(
            port,
            Listener {
                max_connections,
                connections: BTreeMap::new(),
                inbox: VecDeque::new(),
            },
        );

        engine_log!(self.settings.log_enabled, info, port, max_connections, "Server started");
        Ok(())
    }

    /// Release a port, dropping every peer connected to it
    pub(super) fn unbind(&mut self, port: u16) {
        let Some(listener) = self.listeners.remove(&port) else {
            return;
        };

        for key in listener.connections.values() {
            if let Some(client) = self.clients.get_mut(key) {
                client.link = None;
                client.inbox.push_back(ClientNotification::Disconnected {
                    reason: DisconnectReason::ServerStopped,
                });
            }
        }

        engine_log!(
            self.settings.log_enabled,
            info,
            port,
            dropped = listener.connections.len(),
            "Server stopped"
        );
    }

    pub(super) fn kick(&mut self, port: u16, id: ConnectionId) -> Result<(), EngineError> {
        let listener = self.listeners.get_mut(&port).ok_or(EngineError::NotRunning)?;
        let key = listener
            .connections
            .remove(&id)
            .ok_or(EngineError::UnknownClient(id))?;

        listener.inbox.push_back(ServerNotification::ClientDisconnected {
            id,
            reason: DisconnectReason::Kicked,
        });

        if let Some(client) = self.clients.get_mut(&key) {
            client.link = None;
            client.inbox.push_back(ClientNotification::Disconnected {
                reason: DisconnectReason::Kicked,
            });
        }

        engine_log!(self.settings.log_enabled, info, port, client = id, "Client kicked");
        Ok(())
    }

    pub(super) fn deliver_to_client(
        &mut self,
        port: u16,
        to: ConnectionId,
        message: Message,
    ) -> Result<(), EngineError> {
        let listener = self.listeners.get(&port).ok_or(EngineError::NotRunning)?;
        let key = listener
            .connections
            .get(&to)
            .copied()
            .ok_or(EngineError::UnknownClient(to))?;

        if let Some(client) = self.clients.get_mut(&key) {
            client
                .inbox
                .push_back(ClientNotification::MessageReceived { message });
        }
        Ok(())
    }

    pub(super) fn drain_server(&mut self, port: u16) -> Vec<ServerNotification> {
        self.listeners
            .get_mut(&port)
            .map(|listener| listener.inbox.drain(..).collect())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------

    pub(super) fn register_client(&mut self) -> EndpointKey {
        let key = self.next_key;
        self.next_key += 1;
        self.clients.insert(key, ClientEndpoint::default());
        key
    }

    pub(super) fn remove_client(&mut self, key: EndpointKey) {
        self.client_disconnect(key);
        self.clients.remove(&key);
    }

    pub(super) fn request_connect(&mut self, key: EndpointKey, port: u16) {
        if let Some(client) = self.clients.get_mut(&key) {
            client.connecting = Some(port);
            self.pending.push_back((key, port));
            engine_log!(self.settings.log_enabled, debug, port, "Connection requested");
        }
    }

    /// Close the client's link or abandon its attempt
    ///
    /// Anything not yet delivered to the client is discarded.
    pub(super) fn client_disconnect(&mut self, key: EndpointKey) {
        let Some(client) = self.clients.get_mut(&key) else {
            return;
        };

        client.inbox.clear();
        client.connecting = None;
        self.pending.retain(|(pending_key, _)| *pending_key != key);

        if let Some(link) = client.link.take() {
            if let Some(listener) = self.listeners.get_mut(&link.port) {
                listener.connections.remove(&link.id);
                listener.inbox.push_back(ServerNotification::ClientDisconnected {
                    id: link.id,
                    reason: DisconnectReason::Disconnected,
                });
            }
            engine_log!(
                self.settings.log_enabled,
                info,
                port = link.port,
                client = link.id,
                "Client disconnected"
            );
        }
    }

    pub(super) fn is_connected(&self, key: EndpointKey) -> bool {
        self.clients
            .get(&key)
            .is_some_and(|client| client.link.is_some())
    }

    pub(super) fn is_connecting(&self, key: EndpointKey) -> bool {
        self.clients
            .get(&key)
            .is_some_and(|client| client.connecting.is_some())
    }

    pub(super) fn deliver_to_server(
        &mut self,
        key: EndpointKey,
        message: Message,
    ) -> Result<(), EngineError> {
        let link = self
            .clients
            .get(&key)
            .and_then(|client| client.link)
            .ok_or(EngineError::NotConnected)?;
        let listener = self
            .listeners
            .get_mut(&link.port)
            .ok_or(EngineError::NotConnected)?;

        listener.inbox.push_back(ServerNotification::MessageReceived {
            from: link.id,
            message,
        });
        Ok(())
    }

    pub(super) fn drain_client(&mut self, key: EndpointKey) -> Vec<ClientNotification> {
        self.clients
            .get_mut(&key)
            .map(|client| client.inbox.drain(..).collect())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Handshake
    // ------------------------------------------------------------------

    /// Accept or refuse every queued connection request
    pub(super) fn resolve_pending(&mut self) {
        while let Some((key, port)) = self.pending.pop_front() {
            let Some(client) = self.clients.get_mut(&key) else {
                continue;
            };
            if client.connecting != Some(port) {
                continue;
            }
            client.connecting = None;

            let accepted = self.listeners.get_mut(&port).and_then(|listener| {
                if listener.connections.len() >= listener.max_connections as usize {
                    return None;
                }
                let id = listener.next_free_id()?;
                listener.connections.insert(id, key);
                listener
                    .inbox
                    .push_back(ServerNotification::ClientConnected { id, address: None });
                Some(id)
            });

            match accepted {
                Some(id) => {
                    client.link = Some(Link { port, id });
                    client.inbox.push_back(ClientNotification::Connected { id });
                    engine_log!(self.settings.log_enabled, info, port, client = id, "Client accepted");
                }
                None => {
                    client.inbox.push_back(ClientNotification::ConnectionFailed);
                    engine_log!(self.settings.log_enabled, warn, port, "Connection refused");
                }
            }
        }
    }
}

/// Extract the port from a `host:port` string
///
/// The host part must be present but is otherwise ignored: every listener
/// on a loopback network is local.
pub(super) fn parse_port(address: &str) -> Result<u16, EngineError> {
    let invalid = || EngineError::InvalidAddress(address.to_string());

    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }
    port.parse().map_err(|_| invalid())
}
