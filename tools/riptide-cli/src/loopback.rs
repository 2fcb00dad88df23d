//! Loopback command - host and join in one process
//!
//! Starts a server, connects the same transport's client to `localhost`,
//! sends a payload client -> server, echoes it back server -> client, then
//! shuts down. Every transport event is printed as it is dispatched.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result, bail, ensure};
use clap::Args;
use riptide_engine::{LoopbackClient, LoopbackServer};
use riptide_transport::{
    ChannelId, EventQueue, LoopbackNetwork, RELIABLE, RiptideTransport, Segment, Transport,
    TransportConfig, TransportEvent, UNRELIABLE, config,
};

type LoopbackTransport = RiptideTransport<LoopbackServer, LoopbackClient>;

/// Arguments for the loopback command
#[derive(Args)]
pub struct LoopbackArgs {
    /// Port to host on (defaults to the configured port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Peers the server accepts (defaults to the configured value)
    #[arg(long)]
    pub max_connections: Option<u16>,

    /// Payload size in bytes
    #[arg(short, long, default_value = "10")]
    pub bytes: usize,

    /// Send on the unreliable channel
    #[arg(long)]
    pub unreliable: bool,

    /// Ticks to wait for each step before giving up
    #[arg(long, default_value = "8")]
    pub ticks: u32,
}

/// What a loopback run observed
#[derive(Debug)]
pub struct LoopbackReport {
    pub events: Vec<TransportEvent>,
    pub ticks: u32,
}

/// Execute the loopback command
pub fn execute(args: LoopbackArgs) -> Result<()> {
    let mut config = config::load();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }
    let channel = if args.unreliable { UNRELIABLE } else { RELIABLE };

    let report = run(config, args.bytes, channel, args.ticks)?;

    println!();
    println!("Loopback OK: {} events in {} ticks", report.events.len(), report.ticks);
    Ok(())
}

/// Drive one host + join + echo round over a fresh loopback network
pub fn run(
    config: TransportConfig,
    bytes: usize,
    channel: ChannelId,
    ticks: u32,
) -> Result<LoopbackReport> {
    let network = LoopbackNetwork::new(config.engine_settings());
    let queue = Rc::new(RefCell::new(EventQueue::new()));
    let transport = RiptideTransport::loopback(&network, config, Box::new(queue.clone()))
        .context("Invalid transport config")?;

    let mut session = Session {
        transport,
        queue,
        events: Vec::new(),
        ticks: 0,
        max_ticks: ticks,
    };

    println!("Hosting at {}", session.transport.server_uri());
    session.transport.server_start()?;
    session.transport.client_connect("localhost")?;
    session.wait_for("client connect", |e| *e == TransportEvent::ClientConnected)?;

    let max = session.transport.get_max_packet_size(channel);
    ensure!(
        bytes <= max,
        "Payload of {} bytes exceeds the {} byte packet limit",
        bytes,
        max
    );

    let payload: Vec<u8> = (0..bytes).map(|i| i as u8).collect();
    session.transport.client_send(Segment::from(&payload), channel)?;

    let received = session.wait_for("server receive", |e| {
        matches!(e, TransportEvent::ServerDataReceived { .. })
    })?;
    let TransportEvent::ServerDataReceived { id, data, channel: arrived_on } = received else {
        bail!("Unexpected event {:?}", received);
    };
    ensure!(data == payload, "Server received corrupted payload");
    ensure!(arrived_on == channel, "Payload arrived on channel {}", arrived_on);

    session.transport.server_send(id, Segment::from(&data), channel)?;
    let echoed = session.wait_for("client receive", |e| {
        matches!(e, TransportEvent::ClientDataReceived { .. })
    })?;
    let TransportEvent::ClientDataReceived { data, .. } = echoed else {
        bail!("Unexpected event {:?}", echoed);
    };
    ensure!(data == payload, "Client received corrupted echo");

    session.transport.shutdown();
    session.collect();

    Ok(LoopbackReport {
        events: session.events,
        ticks: session.ticks,
    })
}

struct Session {
    transport: LoopbackTransport,
    queue: Rc<RefCell<EventQueue>>,
    events: Vec<TransportEvent>,
    ticks: u32,
    max_ticks: u32,
}

impl Session {
    /// Move dispatched events into the log, printing each
    fn collect(&mut self) -> Vec<TransportEvent> {
        let fresh = self.queue.borrow_mut().drain();
        for event in &fresh {
            println!("  [tick {:>3}] {}", self.ticks, describe(event));
        }
        self.events.extend(fresh.iter().cloned());
        fresh
    }

    /// Tick until an event matching `predicate` is dispatched
    fn wait_for(
        &mut self,
        step: &str,
        predicate: impl Fn(&TransportEvent) -> bool,
    ) -> Result<TransportEvent> {
        for _ in 0..self.max_ticks {
            self.transport.update();
            self.ticks += 1;
            if let Some(event) = self.collect().into_iter().find(|e| predicate(e)) {
                return Ok(event);
            }
        }
        bail!("Timed out after {} ticks waiting for {}", self.max_ticks, step)
    }
}

fn describe(event: &TransportEvent) -> String {
    match event {
        TransportEvent::ClientConnected => "client connected".to_string(),
        TransportEvent::ClientDisconnected => "client disconnected".to_string(),
        TransportEvent::ClientDataReceived { data, channel } => {
            format!("client received {} bytes on channel {}", data.len(), channel)
        }
        TransportEvent::ServerConnected { id, address } if address.is_empty() => {
            format!("server accepted connection {}", id)
        }
        TransportEvent::ServerConnected { id, address } => {
            format!("server accepted connection {} from {}", id, address)
        }
        TransportEvent::ServerDisconnected { id } => format!("server dropped connection {}", id),
        TransportEvent::ServerDataReceived { id, data, channel } => format!(
            "server received {} bytes from {} on channel {}",
            data.len(),
            id,
            channel
        ),
    }
}
