//! Channel mapping between the transport contract and the engine
//!
//! Upward, channels are small integers: [`RELIABLE`] (0) and
//! [`UNRELIABLE`] (1). Downward, the engine tags each message with a
//! [`SendMode`]. Any id other than [`RELIABLE`] is treated as unreliable.

use riptide_engine::SendMode;

/// Upward-facing channel id
pub type ChannelId = i32;

/// Ordered, guaranteed delivery
pub const RELIABLE: ChannelId = 0;

/// Best-effort delivery
pub const UNRELIABLE: ChannelId = 1;

/// The two delivery guarantees exposed upward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Reliable,
    Unreliable,
}

impl Channel {
    /// Resolve an upward id, coercing unrecognised ids to `Unreliable`
    pub fn from_id(channel_id: ChannelId) -> Self {
        if channel_id == RELIABLE {
            Self::Reliable
        } else {
            if channel_id != UNRELIABLE {
                tracing::debug!(channel_id, "Unknown channel id, sending unreliable");
            }
            Self::Unreliable
        }
    }

    /// Canonical upward id
    pub fn id(self) -> ChannelId {
        match self {
            Self::Reliable => RELIABLE,
            Self::Unreliable => UNRELIABLE,
        }
    }

    pub fn send_mode(self) -> SendMode {
        match self {
            Self::Reliable => SendMode::Reliable,
            Self::Unreliable => SendMode::Unreliable,
        }
    }
}

impl From<SendMode> for Channel {
    fn from(mode: SendMode) -> Self {
        match mode {
            SendMode::Reliable => Self::Reliable,
            SendMode::Unreliable => Self::Unreliable,
        }
    }
}

impl From<Channel> for SendMode {
    fn from(channel: Channel) -> Self {
        channel.send_mode()
    }
}

/// Engine send mode for an upward channel id
pub fn to_send_mode(channel_id: ChannelId) -> SendMode {
    Channel::from_id(channel_id).send_mode()
}

/// Upward channel id for an engine send mode
pub fn from_send_mode(mode: SendMode) -> ChannelId {
    Channel::from(mode).id()
}
