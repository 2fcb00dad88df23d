//! Opcode-tagged message envelope
//!
//! A [`Message`] is the unit the engine sends and receives. It carries a
//! [`SendMode`], a 16-bit message id used to route it to a handler, and a
//! body built with typed `add_*` writers and read back with `get_*` readers
//! in the same order.
//!
//! # Wire Format
//!
//! ```text
//! [mode:u8][id:u16][body...]
//! ```
//!
//! Body fields written by [`Message::add_bytes`] are length prefixed:
//!
//! ```text
//! [len:u32][bytes...]
//! ```

use byteorder::{ByteOrder, LittleEndian};

/// Header size: mode (1) + id (2)
pub const MESSAGE_HEADER_SIZE: usize = 3;

/// Default upper bound for a message body
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Length prefix written in front of every byte array
pub const BYTES_PREFIX_SIZE: usize = 4;

/// Native reliability tag of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SendMode {
    /// Best effort, may be dropped or reordered
    Unreliable = 0,
    /// Guaranteed, ordered delivery
    Reliable = 1,
}

impl SendMode {
    /// Parse the wire tag
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unreliable),
            1 => Some(Self::Reliable),
            _ => None,
        }
    }

    /// Wire tag for this mode
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Errors raised while reading a message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageDecodeError {
    /// Buffer shorter than the message header
    #[error("message too short for header")]
    TooShort,
    /// Unrecognised send mode tag
    #[error("invalid send mode tag {0}")]
    InvalidSendMode(u8),
    /// A body read ran past the end of the body
    #[error("truncated message body: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
}

/// Opcode-tagged message envelope
#[derive(Debug, Clone)]
pub struct Message {
    send_mode: SendMode,
    id: u16,
    body: Vec<u8>,
    read_pos: usize,
}

impl Message {
    /// Create an empty message with the given send mode and id
    pub fn new(send_mode: SendMode, id: u16) -> Self {
        Self {
            send_mode,
            id,
            body: Vec::new(),
            read_pos: 0,
        }
    }

    pub fn send_mode(&self) -> SendMode {
        self.send_mode
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    /// Body length in bytes
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Body bytes not yet consumed by the `get_*` readers
    pub fn unread_len(&self) -> usize {
        self.body.len() - self.read_pos
    }

    // ------------------------------------------------------------------
    // Writers
    // ------------------------------------------------------------------

    /// Append a length-prefixed byte array
    pub fn add_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.add_u32(bytes.len() as u32);
        self.body.extend_from_slice(bytes);
        self
    }

    pub fn add_i32(&mut self, value: i32) -> &mut Self {
        let start = self.grow(4);
        LittleEndian::write_i32(&mut self.body[start..], value);
        self
    }

    fn add_u32(&mut self, value: u32) -> &mut Self {
        let start = self.grow(4);
        LittleEndian::write_u32(&mut self.body[start..], value);
        self
    }

    fn grow(&mut self, by: usize) -> usize {
        let start = self.body.len();
        self.body.resize(start + by, 0);
        start
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    /// Read a length-prefixed byte array
    pub fn get_bytes(&mut self) -> Result<Vec<u8>, MessageDecodeError> {
        let len = self.get_u32()? as usize;
        let bytes = self.take(len)?.to_vec();
        Ok(bytes)
    }

    pub fn get_i32(&mut self) -> Result<i32, MessageDecodeError> {
        self.take(4).map(LittleEndian::read_i32)
    }

    fn get_u32(&mut self) -> Result<u32, MessageDecodeError> {
        self.take(4).map(LittleEndian::read_u32)
    }

    fn take(&mut self, len: usize) -> Result<&[u8], MessageDecodeError> {
        let available = self.unread_len();
        if len > available {
            return Err(MessageDecodeError::Truncated {
                needed: len,
                available,
            });
        }
        let start = self.read_pos;
        self.read_pos += len;
        Ok(&self.body[start..start + len])
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize to wire format: [mode][id][body...]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; MESSAGE_HEADER_SIZE];
        bytes[0] = self.send_mode.as_u8();
        LittleEndian::write_u16(&mut bytes[1..3], self.id);
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Deserialize from wire format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MessageDecodeError> {
        if bytes.len() < MESSAGE_HEADER_SIZE {
            return Err(MessageDecodeError::TooShort);
        }

        let send_mode =
            SendMode::from_u8(bytes[0]).ok_or(MessageDecodeError::InvalidSendMode(bytes[0]))?;
        let id = LittleEndian::read_u16(&bytes[1..3]);

        Ok(Self {
            send_mode,
            id,
            body: bytes[MESSAGE_HEADER_SIZE..].to_vec(),
            read_pos: 0,
        })
    }
}

// Read position is cursor state, not message content.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.send_mode == other.send_mode && self.id == other.id && self.body == other.body
    }
}

impl Eq for Message {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_mode_tags() {
        assert_eq!(SendMode::from_u8(0), Some(SendMode::Unreliable));
        assert_eq!(SendMode::from_u8(1), Some(SendMode::Reliable));
        assert_eq!(SendMode::from_u8(7), None);
        assert_eq!(SendMode::Reliable.as_u8(), 1);
    }

    #[test]
    fn test_fields_read_back_in_write_order() {
        let mut msg = Message::new(SendMode::Reliable, 1);
        msg.add_bytes(b"hello").add_i32(-3).add_i32(9);

        assert_eq!(msg.get_bytes().unwrap(), b"hello".to_vec());
        assert_eq!(msg.get_i32().unwrap(), -3);
        assert_eq!(msg.get_i32().unwrap(), 9);
        assert_eq!(msg.unread_len(), 0);
    }

    #[test]
    fn test_body_layout() {
        let mut msg = Message::new(SendMode::Unreliable, 2);
        msg.add_bytes(&[0xAA, 0xBB]);
        assert_eq!(&msg.to_bytes()[MESSAGE_HEADER_SIZE..], &[2, 0, 0, 0, 0xAA, 0xBB]);
        assert_eq!(msg.len(), BYTES_PREFIX_SIZE + 2);
    }

    #[test]
    fn test_wire_roundtrip_keeps_mode_and_id() {
        let mut msg = Message::new(SendMode::Reliable, 0x0102);
        msg.add_bytes(&[1, 2, 3]).add_i32(5);

        let bytes = msg.to_bytes();
        assert_eq!(&bytes[..3], &[1, 0x02, 0x01]);

        let mut decoded = Message::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.get_bytes().unwrap(), vec![1, 2, 3]);
        assert_eq!(decoded.get_i32().unwrap(), 5);
    }

    #[test]
    fn test_too_short() {
        let result = Message::from_bytes(&[1, 0]);
        assert!(matches!(result, Err(MessageDecodeError::TooShort)));
    }

    #[test]
    fn test_invalid_send_mode() {
        let result = Message::from_bytes(&[9, 1, 0]);
        assert!(matches!(result, Err(MessageDecodeError::InvalidSendMode(9))));
    }

    #[test]
    fn test_truncated_read() {
        let mut msg = Message::new(SendMode::Reliable, 1);
        msg.add_i32(1);
        msg.get_i32().unwrap();
        assert_eq!(
            msg.get_i32(),
            Err(MessageDecodeError::Truncated {
                needed: 4,
                available: 0
            })
        );
    }

    #[test]
    fn test_bytes_length_prefix_past_end() {
        let mut msg = Message::new(SendMode::Reliable, 1);
        msg.add_u32(100).add_i32(0);
        assert!(matches!(
            msg.get_bytes(),
            Err(MessageDecodeError::Truncated { needed: 100, .. })
        ));
    }

    #[test]
    fn test_equality_ignores_read_position() {
        let mut a = Message::new(SendMode::Reliable, 1);
        a.add_i32(1);
        let b = a.clone();
        a.get_i32().unwrap();
        assert_eq!(a, b);
    }
}
