//! Framing error types

use std::io;

use thiserror::Error;

use super::MessageType;

/// Errors raised while reading or writing frames
///
/// Every variant other than [`FrameError::Io`] is a protocol error: the
/// connection it came from cannot be resynchronized and must be closed.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unknown message type tag {0}")]
    UnknownMessageType(u8),

    #[error("{message_type:?} body of {length} bytes exceeds limit of {max}")]
    BodyTooLarge {
        message_type: MessageType,
        length: u64,
        max: u32,
    },

    #[error("audio body of {0} bytes is shorter than the identity field")]
    AudioBodyTooShort(usize),

    #[error("handshake identity of {0} bytes exceeds limit")]
    HandshakeTooLong(u32),

    #[error("handshake identity is empty")]
    EmptyIdentity,

    #[error("handshake identity is not valid UTF-8")]
    InvalidIdentity,

    #[error("handshake timed out")]
    HandshakeTimeout,

    #[error("invalid identity list: {0}")]
    InvalidIdentityList(#[from] serde_json::Error),
}
