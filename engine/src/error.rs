//! Error types for engine operations

use crate::peer::ConnectionId;

/// Error type for engine operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Another listener already owns the port
    #[error("port {0} is already in use")]
    AddressInUse(u16),
    /// Connect address could not be parsed
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    /// Server operation while not running
    #[error("server is not running")]
    NotRunning,
    /// Client operation without a connection
    #[error("client is not connected")]
    NotConnected,
    /// No client with this id
    #[error("no client with id {0}")]
    UnknownClient(ConnectionId),
    /// Message body larger than the configured maximum
    #[error("payload of {size} bytes exceeds maximum of {max}")]
    PayloadTooLarge { size: usize, max: usize },
}
