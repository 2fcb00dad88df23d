//! Loopback implementation of [`PeerServer`]

use std::cell::RefCell;
use std::rc::Rc;

use super::network::Hub;
use crate::error::EngineError;
use crate::message::Message;
use crate::peer::{ConnectionId, EngineSettings, PeerServer, ServerNotification};

/// Server handle on a [`LoopbackNetwork`](super::LoopbackNetwork)
pub struct LoopbackServer {
    hub: Rc<RefCell<Hub>>,
    /// Bound port while running
    port: Option<u16>,
}

impl LoopbackServer {
    pub(super) fn new(hub: Rc<RefCell<Hub>>) -> Self {
        Self { hub, port: None }
    }

    /// Port this server is bound to, if running
    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

impl PeerServer for LoopbackServer {
    fn start(&mut self, port: u16, max_connections: u16) -> Result<(), EngineError> {
        self.stop();
        self.hub.borrow_mut().bind(port, max_connections)?;
        self.port = Some(port);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(port) = self.port.take() {
            self.hub.borrow_mut().unbind(port);
        }
    }

    fn is_running(&self) -> bool {
        self.port.is_some()
    }

    fn settings(&self) -> EngineSettings {
        self.hub.borrow().settings
    }

    fn send(&mut self, message: Message, to: ConnectionId) -> Result<(), EngineError> {
        let port = self.port.ok_or(EngineError::NotRunning)?;
        let mut hub = self.hub.borrow_mut();
        hub.check_size(&message)?;
        hub.deliver_to_client(port, to, message)
    }

    fn disconnect_client(&mut self, id: ConnectionId) -> Result<(), EngineError> {
        let port = self.port.ok_or(EngineError::NotRunning)?;
        self.hub.borrow_mut().kick(port, id)
    }

    fn update(&mut self) -> Vec<ServerNotification> {
        let Some(port) = self.port else {
            return Vec::new();
        };
        let mut hub = self.hub.borrow_mut();
        hub.resolve_pending();
        hub.drain_server(port)
    }
}

impl Drop for LoopbackServer {
    fn drop(&mut self) {
        if let Some(port) = self.port.take()
            && let Ok(mut hub) = self.hub.try_borrow_mut()
        {
            hub.unbind(port);
        }
    }
}

impl std::fmt::Debug for LoopbackServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackServer")
            .field("port", &self.port)
            .finish()
    }
}
