//! Riptide Engine - peer messaging substrate surface
//!
//! This crate describes the messaging engine the transport bridge sits on:
//!
//! - [`Message`] - opcode-tagged envelope with a typed body
//! - [`SendMode`] - native reliability tag
//! - [`PeerServer`] / [`PeerClient`] - poll-driven session surfaces
//! - [`LoopbackNetwork`] - in-process engine for tests and local play
//!
//! Reliability, congestion control and handshakes are the engine's concern;
//! nothing in this crate specifies a wire protocol between processes.

pub mod error;
pub mod loopback;
pub mod message;
pub mod peer;

pub use error::EngineError;
pub use loopback::{LoopbackClient, LoopbackNetwork, LoopbackServer};
pub use message::{
    BYTES_PREFIX_SIZE, DEFAULT_MAX_PAYLOAD_SIZE, MESSAGE_HEADER_SIZE, Message,
    MessageDecodeError, SendMode,
};
pub use peer::{
    ClientNotification, ConnectionId, DisconnectReason, EngineSettings, PeerClient, PeerServer,
    ServerNotification,
};
