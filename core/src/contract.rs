//! The transport contract presented to the upper networking layer

use std::fmt;

use riptide_engine::ConnectionId;

use crate::channel::ChannelId;
use crate::codec::Segment;
use crate::error::TransportError;

/// URI scheme used for discovery and display
pub const SCHEME: &str = "riptide";

/// Where a running server can be reached
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerUri {
    host: String,
    port: u16,
}

impl ServerUri {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// URI for this machine on `port`
    pub fn local(port: u16) -> Self {
        Self::new(local_hostname(), port)
    }

    pub fn scheme(&self) -> &'static str {
        SCHEME
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ServerUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", SCHEME, self.host, self.port)
    }
}

/// Name of this machine, `localhost` when the OS does not report one
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Uniform client/server transport
///
/// Commands never block. Their outcomes, along with anything received,
/// surface as handler callbacks during [`Transport::update`].
pub trait Transport {
    /// Whether this transport can run on the current platform
    fn available(&self) -> bool {
        true
    }

    // Client

    /// Start connecting to `address` (`"localhost"` or `host[:port]`)
    fn client_connect(&mut self, address: &str) -> Result<(), TransportError>;
    fn client_connected(&self) -> bool;
    fn client_disconnect(&mut self);
    fn client_send(&mut self, segment: Segment<'_>, channel_id: ChannelId)
    -> Result<(), TransportError>;

    /// Largest segment a single send accepts on `channel_id`
    fn get_max_packet_size(&self, channel_id: ChannelId) -> usize;

    // Server

    fn server_active(&self) -> bool;
    fn server_start(&mut self) -> Result<(), TransportError>;
    fn server_stop(&mut self);
    fn server_send(
        &mut self,
        id: ConnectionId,
        segment: Segment<'_>,
        channel_id: ChannelId,
    ) -> Result<(), TransportError>;
    fn server_disconnect(&mut self, id: ConnectionId) -> Result<(), TransportError>;
    /// Peer address, empty when the engine did not report one
    fn server_get_client_address(&self, id: ConnectionId) -> String;
    fn server_uri(&self) -> ServerUri;

    /// Disconnect the client, then stop the server
    fn shutdown(&mut self);

    /// Tick both sessions, dispatching every due event
    fn update(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_uri_display() {
        let uri = ServerUri::new("arcade-01", 7777);
        assert_eq!(uri.to_string(), "riptide://arcade-01:7777");
        assert_eq!(uri.scheme(), "riptide");
        assert_eq!(uri.host(), "arcade-01");
        assert_eq!(uri.port(), 7777);
    }

    #[test]
    fn test_local_uri_has_host() {
        let uri = ServerUri::local(9000);
        assert!(!uri.host().is_empty());
        assert_eq!(uri.port(), 9000);
    }

    #[test]
    fn test_local_uri_uses_machine_name() {
        let machine = hostname::get()
            .map(|name| name.to_string_lossy().trim().to_string())
            .unwrap_or_default();
        let uri = ServerUri::local(7777);
        if machine.is_empty() {
            assert_eq!(uri.host(), "localhost");
        } else {
            assert_eq!(uri.host(), machine);
        }
    }
}
