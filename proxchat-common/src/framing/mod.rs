//! Typed frame format shared by the relay and its clients
//!
//! ```text
//! type:1 | length:4 (big-endian) | body:length
//! ```
//!
//! Before the first frame each client sends a handshake carrying its identity:
//!
//! ```text
//! length:4 (big-endian) | identity:length (UTF-8)
//! ```
//!
//! Audio bodies start with the sender's 20-byte identity field followed by
//! PCM. Identity-list bodies are JSON. Control bodies are opaque.

mod error;
mod limits;
mod reader;
mod writer;

pub use error::FrameError;
pub use limits::{
    MAX_AUDIO_BODY, MAX_AUDIO_CHUNKS_PER_FRAME, MAX_CONTROL_BODY, MAX_HANDSHAKE_LEN,
    MAX_IDENTITY_LIST_BODY, max_body_for_type,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;

use crate::identity::{IDENTITY_FIELD_LEN, Identity};

/// Size of the frame header: one type byte and a four byte body length
pub const HEADER_LEN: usize = 5;

/// Frame type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Sender identity field followed by PCM
    Audio = 1,
    /// Reserved; the relay accepts and discards these
    Control = 2,
    /// Full membership list, relay to client only
    IdentityList = 3,
}

impl MessageType {
    /// Parse a type tag, returning `None` for unknown tags
    pub fn from_byte(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Audio),
            2 => Some(Self::Control),
            3 => Some(Self::IdentityList),
            _ => None,
        }
    }

    /// The wire tag for this type
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One complete frame, stored exactly as it appears on the wire
///
/// Keeping the original bytes lets the relay forward audio frames verbatim
/// without re-encoding them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    message_type: MessageType,
    bytes: Vec<u8>,
}

impl RawFrame {
    /// Build a frame from a type and body
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::BodyTooLarge`] if the body exceeds the limit for
    /// its type.
    pub fn new(message_type: MessageType, body: &[u8]) -> Result<Self, FrameError> {
        Self::from_parts(message_type, &[body])
    }

    /// Build an audio frame from a sender and raw PCM bytes
    pub fn audio(sender: &Identity, pcm: &[u8]) -> Result<Self, FrameError> {
        Self::from_parts(MessageType::Audio, &[&sender.to_field(), pcm])
    }

    fn from_parts(message_type: MessageType, parts: &[&[u8]]) -> Result<Self, FrameError> {
        let body_len: usize = parts.iter().map(|p| p.len()).sum();
        let max = max_body_for_type(message_type);
        if body_len > max as usize {
            return Err(FrameError::BodyTooLarge {
                message_type,
                length: body_len as u64,
                max,
            });
        }

        let mut bytes = Vec::with_capacity(HEADER_LEN + body_len);
        bytes.push(message_type.as_byte());
        bytes.extend_from_slice(&(body_len as u32).to_be_bytes());
        for part in parts {
            bytes.extend_from_slice(part);
        }
        Ok(Self {
            message_type,
            bytes,
        })
    }

    /// Wrap bytes already validated by the reader
    pub(crate) fn from_wire(message_type: MessageType, bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.len() >= HEADER_LEN);
        Self {
            message_type,
            bytes,
        }
    }

    /// The frame's type tag
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The frame body (everything after the header)
    pub fn body(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }

    /// Sender identity of an audio frame, decoded from the body
    ///
    /// Returns `None` for non-audio frames and for audio bodies shorter than
    /// the identity field.
    pub fn audio_sender(&self) -> Option<Identity> {
        if self.message_type != MessageType::Audio || self.body().len() < IDENTITY_FIELD_LEN {
            return None;
        }
        Some(Identity::from_field(&self.body()[..IDENTITY_FIELD_LEN]))
    }

    /// The complete wire bytes, header included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the frame, returning the complete wire bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_tags() {
        assert_eq!(MessageType::Audio.as_byte(), 1);
        assert_eq!(MessageType::Control.as_byte(), 2);
        assert_eq!(MessageType::IdentityList.as_byte(), 3);
        assert_eq!(MessageType::from_byte(2), Some(MessageType::Control));
        assert_eq!(MessageType::from_byte(0), None);
        assert_eq!(MessageType::from_byte(4), None);
    }

    #[test]
    fn test_raw_frame_layout() {
        let frame = RawFrame::new(MessageType::Control, b"ping").unwrap();
        assert_eq!(frame.as_bytes(), &[2, 0, 0, 0, 4, b'p', b'i', b'n', b'g']);
        assert_eq!(frame.body(), b"ping");
    }

    #[test]
    fn test_raw_frame_empty_body() {
        let frame = RawFrame::new(MessageType::Control, &[]).unwrap();
        assert_eq!(frame.as_bytes(), &[2, 0, 0, 0, 0]);
        assert!(frame.body().is_empty());
    }

    #[test]
    fn test_audio_frame_layout() {
        let pcm = vec![7u8; crate::CHUNK_BYTES];
        let frame = RawFrame::audio(&Identity::new("A"), &pcm).unwrap();
        let body_len = (IDENTITY_FIELD_LEN + crate::CHUNK_BYTES) as u32;

        assert_eq!(frame.as_bytes()[0], 1);
        assert_eq!(&frame.as_bytes()[1..5], &body_len.to_be_bytes());
        assert_eq!(frame.body()[0], b'A');
        assert!(frame.body()[1..IDENTITY_FIELD_LEN].iter().all(|&b| b == 0));
        assert_eq!(&frame.body()[IDENTITY_FIELD_LEN..], pcm.as_slice());
        assert_eq!(frame.audio_sender(), Some(Identity::new("A")));
    }

    #[test]
    fn test_raw_frame_rejects_oversized_body() {
        let body = vec![0u8; MAX_CONTROL_BODY as usize + 1];
        let err = RawFrame::new(MessageType::Control, &body).unwrap_err();
        assert!(matches!(err, FrameError::BodyTooLarge { .. }));
    }

    #[test]
    fn test_audio_sender_on_control_frame() {
        let frame = RawFrame::new(MessageType::Control, &[0u8; 32]).unwrap();
        assert_eq!(frame.audio_sender(), None);
    }
}
