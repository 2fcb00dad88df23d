//! Message codec for transport payloads
//!
//! Wraps an upward byte range into an engine [`Message`] and back.
//!
//! # Envelope Layout
//!
//! ```text
//! header: [mode:u8][opcode:u16]
//! body:   [len:u32][bytes...][offset:i32][length:i32]
//! ```
//!
//! Only the meaningful slice travels; the logical offset and length of the
//! sender's buffer ride along so the receiver sees the same range metadata.
//! The send mode is the channel the message was sent on.

use riptide_engine::{BYTES_PREFIX_SIZE, Message};

use crate::channel::{ChannelId, from_send_mode, to_send_mode};
use crate::error::TransportError;

/// Body bytes added around the payload: length prefix, offset, length
pub const FRAME_OVERHEAD: usize = BYTES_PREFIX_SIZE + 4 + 4;

// ============================================================================
// Opcodes
// ============================================================================

/// Direction tag carried as the engine message id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Sent by a client, handled by server logic
    ClientMessage = 1,
    /// Sent by the server, handled by client logic
    ServerMessage = 2,
}

/// Which session consumes an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// Dispatch table from opcode to the handling side
const ROUTES: [(Opcode, Role); 2] = [
    (Opcode::ClientMessage, Role::Server),
    (Opcode::ServerMessage, Role::Client),
];

impl Opcode {
    pub fn id(self) -> u16 {
        self as u16
    }
}

/// Look up an engine message id in the dispatch table
pub fn route(id: u16) -> Option<(Opcode, Role)> {
    ROUTES.iter().copied().find(|(opcode, _)| opcode.id() == id)
}

// ============================================================================
// Segments and payloads
// ============================================================================

/// A byte range `buffer[offset..offset + length]` handed down for sending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    buffer: &'a [u8],
    offset: usize,
    length: usize,
}

impl<'a> Segment<'a> {
    /// Describe a sub-range of `buffer`
    pub fn new(buffer: &'a [u8], offset: usize, length: usize) -> Result<Self, TransportError> {
        let in_bounds = offset
            .checked_add(length)
            .is_some_and(|end| end <= buffer.len());
        if !in_bounds {
            return Err(TransportError::InvalidSegment {
                offset,
                length,
                buffer_len: buffer.len(),
            });
        }
        Ok(Self {
            buffer,
            offset,
            length,
        })
    }

    /// The whole buffer
    pub fn whole(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            length: buffer.len(),
        }
    }

    /// The meaningful bytes
    pub fn as_slice(&self) -> &'a [u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl<'a> From<&'a [u8]> for Segment<'a> {
    fn from(buffer: &'a [u8]) -> Self {
        Self::whole(buffer)
    }
}

impl<'a> From<&'a Vec<u8>> for Segment<'a> {
    fn from(buffer: &'a Vec<u8>) -> Self {
        Self::whole(buffer)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Segment<'a> {
    fn from(buffer: &'a [u8; N]) -> Self {
        Self::whole(buffer)
    }
}

/// A decoded inbound payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
    offset: usize,
    length: usize,
    channel: ChannelId,
}

impl Payload {
    /// The received bytes (`length` of them)
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Offset of the range in the sender's buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Channel derived from the envelope's send mode
    pub fn channel(&self) -> ChannelId {
        self.channel
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Encodes outbound segments and decodes inbound envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCodec {
    max_payload_size: usize,
}

impl MessageCodec {
    pub fn new(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// Largest segment that fits in one envelope
    pub fn max_segment_size(&self) -> usize {
        self.max_payload_size.saturating_sub(FRAME_OVERHEAD)
    }

    /// Body size of the envelope for a segment of `length` bytes
    pub fn encoded_len(length: usize) -> usize {
        FRAME_OVERHEAD.saturating_add(length)
    }

    /// Build the envelope for `segment` on `channel_id`
    ///
    /// Rejects oversized segments instead of truncating them.
    pub fn encode(
        &self,
        opcode: Opcode,
        segment: Segment<'_>,
        channel_id: ChannelId,
    ) -> Result<Message, TransportError> {
        let size = Self::encoded_len(segment.len());
        if size > self.max_payload_size {
            return Err(TransportError::SizeLimitExceeded {
                size,
                max: self.max_payload_size,
            });
        }

        let invalid = || TransportError::InvalidSegment {
            offset: segment.offset(),
            length: segment.len(),
            buffer_len: segment.buffer().len(),
        };
        let offset = i32::try_from(segment.offset()).map_err(|_| invalid())?;
        let length = i32::try_from(segment.len()).map_err(|_| invalid())?;

        let mut message = Message::new(to_send_mode(channel_id), opcode.id());
        message
            .add_bytes(segment.as_slice())
            .add_i32(offset)
            .add_i32(length);
        Ok(message)
    }

    /// Read a payload back out of an envelope
    pub fn decode(&self, mut message: Message) -> Result<Payload, TransportError> {
        let bytes = message.get_bytes()?;
        let offset = message.get_i32()?;
        let length = message.get_i32()?;

        let (Ok(offset), Ok(length)) = (usize::try_from(offset), usize::try_from(length)) else {
            return Err(TransportError::Decode(format!(
                "negative range {}+{}",
                offset, length
            )));
        };
        if bytes.len() != length {
            return Err(TransportError::Decode(format!(
                "length field {} does not match {} payload bytes",
                length,
                bytes.len()
            )));
        }

        Ok(Payload {
            bytes,
            offset,
            length,
            channel: from_send_mode(message.send_mode()),
        })
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(riptide_engine::DEFAULT_MAX_PAYLOAD_SIZE)
    }
}
