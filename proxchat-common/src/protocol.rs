//! Message definitions for the proxchat relay
//!
//! Three message kinds travel over the typed framing: audio frames (client to
//! relay and relayed verbatim to every other client), reserved control
//! messages, and identity lists (relay to client only) encoded as JSON:
//!
//! ```json
//! {"users": ["Alice", "Bob"]}
//! ```

use serde::{Deserialize, Serialize};

use crate::framing::{FrameError, MessageType, RawFrame};
use crate::identity::{IDENTITY_FIELD_LEN, Identity};

/// A decoded protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// PCM audio from one participant
    Audio { sender: Identity, pcm: Vec<u8> },
    /// Reserved, opaque payload
    Control { payload: Vec<u8> },
    /// Every registered identity, in join order
    IdentityList { identities: Vec<Identity> },
}

/// JSON body of an identity-list frame
#[derive(Debug, Serialize, Deserialize)]
struct IdentityListBody {
    users: Vec<Identity>,
}

impl Message {
    /// The frame type this message is carried in
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Audio { .. } => MessageType::Audio,
            Message::Control { .. } => MessageType::Control,
            Message::IdentityList { .. } => MessageType::IdentityList,
        }
    }

    /// Encode this message into a frame
    ///
    /// # Errors
    ///
    /// Returns an error if the body exceeds the limit for its type.
    pub fn to_frame(&self) -> Result<RawFrame, FrameError> {
        match self {
            Message::Audio { sender, pcm } => RawFrame::audio(sender, pcm),
            Message::Control { payload } => RawFrame::new(MessageType::Control, payload),
            Message::IdentityList { identities } => {
                let body = serde_json::to_vec(&IdentityListBody {
                    users: identities.clone(),
                })?;
                RawFrame::new(MessageType::IdentityList, &body)
            }
        }
    }

    /// Decode a message from a frame
    ///
    /// # Errors
    ///
    /// Returns an error if an audio body is shorter than the identity field or
    /// an identity-list body is not valid JSON.
    pub fn from_frame(frame: &RawFrame) -> Result<Self, FrameError> {
        let body = frame.body();
        match frame.message_type() {
            MessageType::Audio => {
                if body.len() < IDENTITY_FIELD_LEN {
                    return Err(FrameError::AudioBodyTooShort(body.len()));
                }
                let (field, pcm) = body.split_at(IDENTITY_FIELD_LEN);
                Ok(Message::Audio {
                    sender: Identity::from_field(field),
                    pcm: pcm.to_vec(),
                })
            }
            MessageType::Control => Ok(Message::Control {
                payload: body.to_vec(),
            }),
            MessageType::IdentityList => {
                let parsed: IdentityListBody = serde_json::from_slice(body)?;
                Ok(Message::IdentityList {
                    identities: parsed.users,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CHUNK_BYTES;

    fn round_trip(message: &Message) -> Message {
        Message::from_frame(&message.to_frame().unwrap()).unwrap()
    }

    #[test]
    fn test_audio_round_trip() {
        let message = Message::Audio {
            sender: Identity::new("Alice"),
            pcm: (0..CHUNK_BYTES).map(|i| (i % 251) as u8).collect(),
        };
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_empty_bodies_round_trip() {
        let audio = Message::Audio {
            sender: Identity::new("A"),
            pcm: Vec::new(),
        };
        let control = Message::Control {
            payload: Vec::new(),
        };
        let list = Message::IdentityList {
            identities: Vec::new(),
        };
        assert_eq!(round_trip(&audio), audio);
        assert_eq!(round_trip(&control), control);
        assert_eq!(round_trip(&list), list);
    }

    #[test]
    fn test_identity_list_json_shape() {
        let message = Message::IdentityList {
            identities: vec![Identity::new("A"), Identity::new("B")],
        };
        let frame = message.to_frame().unwrap();
        assert_eq!(frame.body(), br#"{"users":["A","B"]}"#);
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_identity_list_accepts_spaced_json() {
        let frame = RawFrame::new(MessageType::IdentityList, br#"{"users": ["A", "C"]}"#).unwrap();
        let message = Message::from_frame(&frame).unwrap();
        assert_eq!(
            message,
            Message::IdentityList {
                identities: vec![Identity::new("A"), Identity::new("C")]
            }
        );
    }

    #[test]
    fn test_identity_list_invalid_json() {
        let frame = RawFrame::new(MessageType::IdentityList, b"not json").unwrap();
        assert!(matches!(
            Message::from_frame(&frame),
            Err(FrameError::InvalidIdentityList(_))
        ));
    }

    #[test]
    fn test_audio_body_too_short() {
        let frame = RawFrame::new(MessageType::Audio, &[b'A'; 10]).unwrap();
        assert!(matches!(
            Message::from_frame(&frame),
            Err(FrameError::AudioBodyTooShort(10))
        ));
    }

    #[test]
    fn test_message_type() {
        let message = Message::Control {
            payload: vec![1],
        };
        assert_eq!(message.message_type(), MessageType::Control);
    }
}
