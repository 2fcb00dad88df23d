//! Lifecycle event dispatch
//!
//! Session events are forwarded to one registered [`TransportHandler`] as
//! soon as the session produces them. Dispatch is synchronous: by the time
//! `on_server_connected` runs, the peer is already in the server's live set.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use riptide_engine::ConnectionId;

use crate::channel::ChannelId;
use crate::client::ClientEvent;
use crate::server::ServerEvent;

/// The six events raised to the upper layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    ClientConnected,
    ClientDisconnected,
    ClientDataReceived {
        data: Vec<u8>,
        channel: ChannelId,
    },
    ServerConnected {
        id: ConnectionId,
        address: String,
    },
    ServerDisconnected {
        id: ConnectionId,
    },
    ServerDataReceived {
        id: ConnectionId,
        data: Vec<u8>,
        channel: ChannelId,
    },
}

impl TransportEvent {
    /// Invoke the matching handler method
    pub fn deliver(&self, handler: &mut dyn TransportHandler) {
        match self {
            Self::ClientConnected => handler.on_client_connected(),
            Self::ClientDisconnected => handler.on_client_disconnected(),
            Self::ClientDataReceived { data, channel } => {
                handler.on_client_data_received(data, *channel)
            }
            Self::ServerConnected { id, address } => handler.on_server_connected(*id, address),
            Self::ServerDisconnected { id } => handler.on_server_disconnected(*id),
            Self::ServerDataReceived { id, data, channel } => {
                handler.on_server_data_received(*id, data, *channel)
            }
        }
    }
}

impl From<ClientEvent> for TransportEvent {
    fn from(event: ClientEvent) -> Self {
        match event {
            ClientEvent::Connected => Self::ClientConnected,
            ClientEvent::Disconnected => Self::ClientDisconnected,
            ClientEvent::DataReceived(payload) => Self::ClientDataReceived {
                channel: payload.channel(),
                data: payload.into_bytes(),
            },
        }
    }
}

impl From<ServerEvent> for TransportEvent {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::Connected { id, address } => Self::ServerConnected { id, address },
            ServerEvent::Disconnected { id } => Self::ServerDisconnected { id },
            ServerEvent::DataReceived { id, payload } => Self::ServerDataReceived {
                id,
                channel: payload.channel(),
                data: payload.into_bytes(),
            },
        }
    }
}

/// Callbacks for the upper networking layer
///
/// Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait TransportHandler {
    fn on_client_connected(&mut self) {}
    fn on_client_disconnected(&mut self) {}
    fn on_client_data_received(&mut self, data: &[u8], channel: ChannelId) {}
    fn on_server_connected(&mut self, id: ConnectionId, address: &str) {}
    fn on_server_disconnected(&mut self, id: ConnectionId) {}
    fn on_server_data_received(&mut self, id: ConnectionId, data: &[u8], channel: ChannelId) {}
}

/// Ignores every event
impl TransportHandler for () {}

/// Lets the caller keep a handle on a handler owned by the transport
impl<T: TransportHandler + ?Sized> TransportHandler for Rc<RefCell<T>> {
    fn on_client_connected(&mut self) {
        self.borrow_mut().on_client_connected();
    }

    fn on_client_disconnected(&mut self) {
        self.borrow_mut().on_client_disconnected();
    }

    fn on_client_data_received(&mut self, data: &[u8], channel: ChannelId) {
        self.borrow_mut().on_client_data_received(data, channel);
    }

    fn on_server_connected(&mut self, id: ConnectionId, address: &str) {
        self.borrow_mut().on_server_connected(id, address);
    }

    fn on_server_disconnected(&mut self, id: ConnectionId) {
        self.borrow_mut().on_server_disconnected(id);
    }

    fn on_server_data_received(&mut self, id: ConnectionId, data: &[u8], channel: ChannelId) {
        self.borrow_mut().on_server_data_received(id, data, channel);
    }
}

/// Handler that buffers events for poll-style consumers
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<TransportEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffered event, oldest first
    pub fn drain(&mut self) -> Vec<TransportEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn push(&mut self, event: TransportEvent) {
        self.events.push_back(event);
    }
}

impl TransportHandler for EventQueue {
    fn on_client_connected(&mut self) {
        self.push(TransportEvent::ClientConnected);
    }

    fn on_client_disconnected(&mut self) {
        self.push(TransportEvent::ClientDisconnected);
    }

    fn on_client_data_received(&mut self, data: &[u8], channel: ChannelId) {
        self.push(TransportEvent::ClientDataReceived {
            data: data.to_vec(),
            channel,
        });
    }

    fn on_server_connected(&mut self, id: ConnectionId, address: &str) {
        self.push(TransportEvent::ServerConnected {
            id,
            address: address.to_string(),
        });
    }

    fn on_server_disconnected(&mut self, id: ConnectionId) {
        self.push(TransportEvent::ServerDisconnected { id });
    }

    fn on_server_data_received(&mut self, id: ConnectionId, data: &[u8], channel: ChannelId) {
        self.push(TransportEvent::ServerDataReceived {
            id,
            data: data.to_vec(),
            channel,
        });
    }
}

/// Single routing point from both sessions to the upper layer
pub struct Dispatcher {
    handler: Box<dyn TransportHandler>,
}

impl Dispatcher {
    pub fn new(handler: Box<dyn TransportHandler>) -> Self {
        Self { handler }
    }

    /// Replace the registered handler, returning the previous one
    pub fn set_handler(&mut self, handler: Box<dyn TransportHandler>) -> Box<dyn TransportHandler> {
        std::mem::replace(&mut self.handler, handler)
    }

    pub fn dispatch_client(&mut self, event: ClientEvent) {
        TransportEvent::from(event).deliver(self.handler.as_mut());
    }

    pub fn dispatch_server(&mut self, event: ServerEvent) {
        TransportEvent::from(event).deliver(self.handler.as_mut());
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Box::new(()))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
