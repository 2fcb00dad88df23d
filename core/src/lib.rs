//! Riptide Transport - multiplayer transport bridge
//!
//! Adapts the Riptide peer messaging engine to a uniform client/server
//! transport contract so one process can host, join, or both.
//!
//! # Architecture
//!
//! - [`channel`] - upward channel ids to engine send modes
//! - [`codec`] - byte ranges to opcode-tagged engine messages and back
//! - [`ClientSession`] / [`ServerSession`] - per-role connection state
//! - [`Dispatcher`] - routes session events to a [`TransportHandler`]
//! - [`RiptideTransport`] - the [`Transport`] facade tying it together
//!
//! # Usage
//!
//! ```ignore
//! let network = LoopbackNetwork::new(config.engine_settings());
//! let events = Rc::new(RefCell::new(EventQueue::new()));
//! let mut transport = RiptideTransport::loopback(&network, config, Box::new(events.clone()))?;
//!
//! transport.server_start()?;
//! transport.client_connect("localhost")?;
//! transport.update(); // ServerConnected, ClientConnected
//! ```

pub mod bridge;
pub mod channel;
pub mod client;
pub mod codec;
pub mod config;
pub mod contract;
pub mod error;
pub mod lifecycle;
pub mod server;

#[cfg(test)]
mod tests;

pub use bridge::RiptideTransport;
pub use channel::{Channel, ChannelId, RELIABLE, UNRELIABLE};
pub use client::{ClientEvent, ClientSession, ClientState};
pub use codec::{FRAME_OVERHEAD, MessageCodec, Opcode, Payload, Segment};
pub use config::{ConfigError, TransportConfig};
pub use contract::{SCHEME, ServerUri, Transport};
pub use error::TransportError;
pub use lifecycle::{Dispatcher, EventQueue, TransportEvent, TransportHandler};
pub use server::{ServerEvent, ServerSession};

// Engine types that appear in the public API
pub use riptide_engine::{ConnectionId, LoopbackNetwork};
