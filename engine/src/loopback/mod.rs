//! In-process loopback engine
//!
//! A [`LoopbackNetwork`] routes messages between servers and clients living
//! in the same process without touching a socket. It keeps the engine's
//! poll-driven contract: connection attempts, disconnects and messages only
//! surface on the receiving side's next `update()`.
//!
//! # Usage
//!
//! ```ignore
//! let network = LoopbackNetwork::new(EngineSettings::default());
//! let mut server = network.server();
//! let mut client = network.client();
//!
//! server.start(7777, 4)?;
//! client.connect("127.0.0.1:7777")?;
//!
//! server.update(); // ClientConnected { id: 1, .. }
//! client.update(); // Connected { id: 1 }
//! ```
//!
//! # Limitations
//!
//! - Single-threaded (handles share state through `Rc<RefCell<_>>`)
//! - Hosts are not resolved, only the port selects a listener
//! - Unreliable messages are never dropped
//! - Peer addresses are not recorded

macro_rules! engine_log {
    ($enabled:expr, $level:ident, $($arg:tt)+) => {
        if $enabled {
            tracing::$level!(target: "riptide_engine", $($arg)+);
        }
    };
}

mod client;
mod network;
mod server;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::rc::Rc;

use crate::peer::EngineSettings;

pub use client::LoopbackClient;
pub use server::LoopbackServer;

use network::Hub;

/// In-process network shared by loopback servers and clients
#[derive(Clone)]
pub struct LoopbackNetwork {
    hub: Rc<RefCell<Hub>>,
}

impl LoopbackNetwork {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            hub: Rc::new(RefCell::new(Hub::new(settings))),
        }
    }

    /// Create a stopped server on this network
    pub fn server(&self) -> LoopbackServer {
        LoopbackServer::new(self.hub.clone())
    }

    /// Create an idle client on this network
    pub fn client(&self) -> LoopbackClient {
        let key = self.hub.borrow_mut().register_client();
        LoopbackClient::new(self.hub.clone(), key)
    }

    pub fn settings(&self) -> EngineSettings {
        self.hub.borrow().settings
    }
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl std::fmt::Debug for LoopbackNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackNetwork")
            .field("settings", &self.settings())
            .finish()
    }
}
