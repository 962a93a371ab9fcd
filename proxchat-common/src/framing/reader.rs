//! Frame reader for parsing messages from a stream

use std::io;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::time::timeout;

use super::error::FrameError;
use super::limits::{MAX_HANDSHAKE_LEN, max_body_for_type};
use super::{HEADER_LEN, MessageType, RawFrame};
use crate::identity::Identity;

/// Reads handshakes and frames from an async reader
pub struct FrameReader<R> {
    reader: R,
}

impl<R> FrameReader<R> {
    /// Create a new frame reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Get a mutable reference to the underlying reader
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consume the frame reader and return the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: AsyncReadExt + Unpin> FrameReader<R> {
    /// Read the next frame from the stream
    ///
    /// Returns `Ok(None)` when the stream ends, including when it closes in the
    /// middle of a frame. A partial frame is never returned.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, an unknown type tag, or a body length
    /// over the limit for its type. The stream is unusable afterwards.
    pub async fn read_frame(&mut self) -> Result<Option<RawFrame>, FrameError> {
        let mut header = [0u8; HEADER_LEN];
        if !self.read_exact_or_eof(&mut header).await? {
            return Ok(None);
        }

        let message_type =
            MessageType::from_byte(header[0]).ok_or(FrameError::UnknownMessageType(header[0]))?;
        let length = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
        let max = max_body_for_type(message_type);
        if length > max {
            return Err(FrameError::BodyTooLarge {
                message_type,
                length: u64::from(length),
                max,
            });
        }

        let mut bytes = vec![0u8; HEADER_LEN + length as usize];
        bytes[..HEADER_LEN].copy_from_slice(&header);
        if !self.read_exact_or_eof(&mut bytes[HEADER_LEN..]).await? {
            return Ok(None);
        }

        Ok(Some(RawFrame::from_wire(message_type, bytes)))
    }

    /// Read the identity handshake that opens every connection
    ///
    /// The identity is normalized to its 20-byte wire form. Returns `Ok(None)`
    /// if the stream ends before the handshake completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the declared length exceeds the handshake limit or
    /// the identity is empty or not valid UTF-8.
    pub async fn read_handshake(&mut self) -> Result<Option<Identity>, FrameError> {
        let mut len_bytes = [0u8; 4];
        if !self.read_exact_or_eof(&mut len_bytes).await? {
            return Ok(None);
        }

        let length = u32::from_be_bytes(len_bytes);
        if length > MAX_HANDSHAKE_LEN {
            return Err(FrameError::HandshakeTooLong(length));
        }
        if length == 0 {
            return Err(FrameError::EmptyIdentity);
        }

        let mut name = vec![0u8; length as usize];
        if !self.read_exact_or_eof(&mut name).await? {
            return Ok(None);
        }

        let name = String::from_utf8(name).map_err(|_| FrameError::InvalidIdentity)?;
        let identity = Identity::new(name);
        if identity.is_empty() {
            return Err(FrameError::EmptyIdentity);
        }
        Ok(Some(identity))
    }

    /// Read the handshake, giving up after `handshake_timeout`
    ///
    /// `None` waits indefinitely.
    pub async fn read_handshake_with_timeout(
        &mut self,
        handshake_timeout: Option<Duration>,
    ) -> Result<Option<Identity>, FrameError> {
        match handshake_timeout {
            Some(limit) => match timeout(limit, self.read_handshake()).await {
                Ok(result) => result,
                Err(_) => Err(FrameError::HandshakeTimeout),
            },
            None => self.read_handshake().await,
        }
    }

    /// Fill `buf` completely, returning `false` if the stream ends first
    async fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<bool, FrameError> {
        match self.reader.read_exact(buf).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
