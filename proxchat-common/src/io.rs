//! I/O utilities for sending and receiving protocol messages
//!
//! This module is the seam between [`Message`] and the wire format.

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::framing::{FrameError, FrameReader, FrameWriter};
use crate::protocol::Message;

// =============================================================================
// Error Conversion
// =============================================================================

impl From<FrameError> for io::Error {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(e) => e,
            FrameError::HandshakeTimeout => io::Error::new(io::ErrorKind::TimedOut, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

// =============================================================================
// Message Sending
// =============================================================================

/// Encode and send a message
pub async fn send_message<W>(writer: &mut FrameWriter<W>, message: &Message) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let frame = message.to_frame()?;
    writer.write_frame(&frame).await.map_err(Into::into)
}

// =============================================================================
// Message Receiving
// =============================================================================

/// Read and decode the next message
///
/// Returns `Ok(None)` when the stream ends.
pub async fn read_message<R>(reader: &mut FrameReader<R>) -> io::Result<Option<Message>>
where
    R: AsyncReadExt + Unpin,
{
    match reader.read_frame().await? {
        Some(frame) => Ok(Some(Message::from_frame(&frame)?)),
        None => Ok(None),
    }
}
