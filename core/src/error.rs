//! Error types for transport operations

use riptide_engine::{ConnectionId, EngineError, MessageDecodeError};

/// Error type for transport operations
///
/// Every variant is a local, recoverable condition. Peer timeouts and
/// remote closes are not errors; they surface as disconnect events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Encoded payload larger than the configured maximum
    #[error("payload of {size} bytes exceeds maximum of {max}")]
    SizeLimitExceeded { size: usize, max: usize },
    /// Target connection is not in the live set
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
    /// Server could not open its listener
    #[error("failed to bind port {port}: {reason}")]
    BindFailure { port: u16, reason: String },
    /// Client operation that needs an established connection
    #[error("client is not connected")]
    NotConnected,
    /// Offset and length do not describe a range of the buffer
    #[error("segment {offset}+{length} out of bounds for buffer of {buffer_len} bytes")]
    InvalidSegment {
        offset: usize,
        length: usize,
        buffer_len: usize,
    },
    /// Connect address could not be used
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    /// Inbound envelope could not be read
    #[error("malformed envelope: {0}")]
    Decode(String),
    /// Any other engine failure
    #[error("engine error: {0}")]
    Engine(EngineError),
}

impl From<MessageDecodeError> for TransportError {
    fn from(e: MessageDecodeError) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<EngineError> for TransportError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::PayloadTooLarge { size, max } => Self::SizeLimitExceeded { size, max },
            EngineError::UnknownClient(id) => Self::UnknownConnection(id),
            EngineError::NotConnected => Self::NotConnected,
            EngineError::InvalidAddress(address) => Self::InvalidAddress(address),
            other => Self::Engine(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_map_to_transport_kinds() {
        assert_eq!(
            TransportError::from(EngineError::PayloadTooLarge { size: 10, max: 5 }),
            TransportError::SizeLimitExceeded { size: 10, max: 5 }
        );
        assert_eq!(
            TransportError::from(EngineError::UnknownClient(4)),
            TransportError::UnknownConnection(4)
        );
        assert_eq!(
            TransportError::from(EngineError::NotConnected),
            TransportError::NotConnected
        );
        assert_eq!(
            TransportError::from(EngineError::NotRunning),
            TransportError::Engine(EngineError::NotRunning)
        );
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::BindFailure {
            port: 7777,
            reason: "port 7777 is already in use".to_string(),
        };
        assert!(err.to_string().contains("7777"));

        let err = TransportError::UnknownConnection(9);
        assert_eq!(err.to_string(), "unknown connection 9");
    }
}
