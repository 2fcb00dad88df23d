//! Loopback implementation of [`PeerClient`]

use std::cell::RefCell;
use std::rc::Rc;

use super::network::{EndpointKey, Hub, parse_port};
use crate::error::EngineError;
use crate::message::Message;
use crate::peer::{ClientNotification, EngineSettings, PeerClient};

/// Client handle on a [`LoopbackNetwork`](super::LoopbackNetwork)
pub struct LoopbackClient {
    hub: Rc<RefCell<Hub>>,
    key: EndpointKey,
}

impl LoopbackClient {
    pub(super) fn new(hub: Rc<RefCell<Hub>>, key: EndpointKey) -> Self {
        Self { hub, key }
    }
}

impl PeerClient for LoopbackClient {
    fn connect(&mut self, address: &str) -> Result<(), EngineError> {
        let port = parse_port(address)?;
        let mut hub = self.hub.borrow_mut();
        // A new attempt replaces whatever this client was doing.
        hub.client_disconnect(self.key);
        hub.request_connect(self.key, port);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.hub.borrow_mut().client_disconnect(self.key);
    }

    fn is_connected(&self) -> bool {
        self.hub.borrow().is_connected(self.key)
    }

    fn is_connecting(&self) -> bool {
        self.hub.borrow().is_connecting(self.key)
    }

    fn settings(&self) -> EngineSettings {
        self.hub.borrow().settings
    }

    fn send(&mut self, message: Message) -> Result<(), EngineError> {
        let mut hub = self.hub.borrow_mut();
        hub.check_size(&message)?;
        hub.deliver_to_server(self.key, message)
    }

    fn update(&mut self) -> Vec<ClientNotification> {
        let mut hub = self.hub.borrow_mut();
        hub.resolve_pending();
        hub.drain_client(self.key)
    }
}

impl Drop for LoopbackClient {
    fn drop(&mut self) {
        if let Ok(mut hub) = self.hub.try_borrow_mut() {
            hub.remove_client(self.key);
        }
    }
}

impl std::fmt::Debug for LoopbackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackClient")
            .field("connected", &self.is_connected())
            .field("connecting", &self.is_connecting())
            .finish()
    }
}
