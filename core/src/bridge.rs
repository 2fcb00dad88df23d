//! Transport facade over the two sessions
//!
//! [`RiptideTransport`] owns one server session, one client session and the
//! dispatcher that both report through. It is the only routing point between
//! engine notifications and the upper layer's handler.

use riptide_engine::{
    ConnectionId, EngineSettings, LoopbackClient, LoopbackNetwork, LoopbackServer, PeerClient,
    PeerServer,
};

use crate::channel::ChannelId;
use crate::client::{ClientSession, ClientState};
use crate::codec::{MessageCodec, Segment};
use crate::config::{ConfigError, TransportConfig};
use crate::contract::{ServerUri, Transport};
use crate::error::TransportError;
use crate::lifecycle::{Dispatcher, TransportHandler};
use crate::server::ServerSession;

/// Riptide-backed implementation of [`Transport`]
pub struct RiptideTransport<S: PeerServer, C: PeerClient> {
    config: TransportConfig,
    codec: MessageCodec,
    server: ServerSession<S>,
    client: ClientSession<C>,
    dispatcher: Dispatcher,
    /// Set by `shutdown`; ticks are ignored until a session is started again
    shut_down: bool,
}

impl<S: PeerServer, C: PeerClient> RiptideTransport<S, C> {
    /// Build a transport over the given engine handles
    ///
    /// Both engines must run with the payload limit and logger setting the
    /// config asks for.
    pub fn new(
        config: TransportConfig,
        server_engine: S,
        client_engine: C,
        handler: Box<dyn TransportHandler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        check_engine_settings(&config, "server", server_engine.settings())?;
        check_engine_settings(&config, "client", client_engine.settings())?;

        let codec = MessageCodec::new(config.max_message_payload_size);
        tracing::debug!(
            port = config.port,
            max_payload = config.max_message_payload_size,
            engine_logger = config.use_engine_logger,
            "Transport initialized"
        );

        Ok(Self {
            server: ServerSession::new(server_engine, codec),
            client: ClientSession::new(client_engine, config.port, codec),
            codec,
            config,
            dispatcher: Dispatcher::new(handler),
            shut_down: false,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn server(&self) -> &ServerSession<S> {
        &self.server
    }

    pub fn client(&self) -> &ClientSession<C> {
        &self.client
    }

    pub fn client_state(&self) -> ClientState {
        self.client.state()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Replace the upper-layer handler, returning the previous one
    pub fn set_handler(&mut self, handler: Box<dyn TransportHandler>) -> Box<dyn TransportHandler> {
        self.dispatcher.set_handler(handler)
    }
}

fn check_engine_settings(
    config: &TransportConfig,
    role: &str,
    actual: EngineSettings,
) -> Result<(), ConfigError> {
    let expected = config.engine_settings();
    if actual != expected {
        return Err(ConfigError::Invalid(format!(
            "{} engine runs with {:?}, config requires {:?}",
            role, actual, expected
        )));
    }
    Ok(())
}

impl RiptideTransport<LoopbackServer, LoopbackClient> {
    /// Transport whose sessions both live on an in-process network
    ///
    /// The network must have been built from `config.engine_settings()`.
    pub fn loopback(
        network: &LoopbackNetwork,
        config: TransportConfig,
        handler: Box<dyn TransportHandler>,
    ) -> Result<Self, ConfigError> {
        Self::new(config, network.server(), network.client(), handler)
    }
}

impl<S: PeerServer, C: PeerClient> Transport for RiptideTransport<S, C> {
    fn client_connect(&mut self, address: &str) -> Result<(), TransportError> {
        self.shut_down = false;
        self.client.connect(address)
    }

    fn client_connected(&self) -> bool {
        self.client.is_connected()
    }

    fn client_disconnect(&mut self) {
        if let Some(event) = self.client.disconnect() {
            self.dispatcher.dispatch_client(event);
        }
    }

    fn client_send(
        &mut self,
        segment: Segment<'_>,
        channel_id: ChannelId,
    ) -> Result<(), TransportError> {
        self.client.send(segment, channel_id)
    }

    fn get_max_packet_size(&self, _channel_id: ChannelId) -> usize {
        self.codec.max_segment_size()
    }

    fn server_active(&self) -> bool {
        self.server.is_active()
    }

    fn server_start(&mut self) -> Result<(), TransportError> {
        self.shut_down = false;
        self.server
            .start(self.config.port, self.config.max_connections)
            .inspect_err(|e| tracing::error!(error = %e, "Server failed to start"))
    }

    fn server_stop(&mut self) {
        for event in self.server.stop() {
            self.dispatcher.dispatch_server(event);
        }
    }

    fn server_send(
        &mut self,
        id: ConnectionId,
        segment: Segment<'_>,
        channel_id: ChannelId,
    ) -> Result<(), TransportError> {
        self.server.send(id, segment, channel_id)
    }

    fn server_disconnect(&mut self, id: ConnectionId) -> Result<(), TransportError> {
        if let Some(event) = self.server.disconnect_client(id)? {
            self.dispatcher.dispatch_server(event);
        }
        Ok(())
    }

    fn server_get_client_address(&self, id: ConnectionId) -> String {
        self.server.client_address(id)
    }

    fn server_uri(&self) -> ServerUri {
        ServerUri::local(self.config.port)
    }

    fn shutdown(&mut self) {
        self.client_disconnect();
        self.server_stop();
        self.shut_down = true;
        tracing::info!("Transport shut down");
    }

    fn update(&mut self) {
        if self.shut_down {
            return;
        }

        for event in self.server.update() {
            self.dispatcher.dispatch_server(event);
        }
        for event in self.client.update() {
            self.dispatcher.dispatch_client(event);
        }
    }
}

impl<S: PeerServer, C: PeerClient> std::fmt::Debug for RiptideTransport<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiptideTransport")
            .field("config", &self.config)
            .field("server", &self.server)
            .field("client", &self.client)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}
