//! Frame writer for sending messages to a stream

use tokio::io::AsyncWriteExt;

use super::error::FrameError;
use super::RawFrame;
use crate::identity::Identity;

/// Writes handshakes and frames to an async writer
pub struct FrameWriter<W> {
    writer: W,
}

impl<W> FrameWriter<W> {
    /// Create a new frame writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Get a mutable reference to the underlying writer
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the frame writer and return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: AsyncWriteExt + Unpin> FrameWriter<W> {
    /// Write a frame to the stream
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    pub async fn write_frame(&mut self, frame: &RawFrame) -> Result<(), FrameError> {
        self.write_raw(frame.as_bytes()).await
    }

    /// Write pre-encoded frame bytes to the stream
    ///
    /// Used by the relay to forward frames exactly as they were received.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Write the identity handshake
    ///
    /// The full name is sent; the relay normalizes it to the 20-byte form.
    pub async fn write_handshake(&mut self, identity: &Identity) -> Result<(), FrameError> {
        let name = identity.as_str().as_bytes();
        let mut bytes = Vec::with_capacity(4 + name.len());
        bytes.extend_from_slice(&(name.len() as u32).to_be_bytes());
        bytes.extend_from_slice(name);
        self.write_raw(&bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::{FrameReader, MessageType};

    #[tokio::test]
    async fn test_frame_writer_output() {
        let mut buf = Vec::new();
        let mut writer = FrameWriter::new(&mut buf);

        let frame = RawFrame::new(MessageType::IdentityList, b"{}").unwrap();
        writer.write_frame(&frame).await.unwrap();

        assert_eq!(buf, vec![3, 0, 0, 0, 2, b'{', b'}']);
    }

    #[tokio::test]
    async fn test_frame_writer_handshake() {
        let mut buf = Vec::new();
        let mut writer = FrameWriter::new(&mut buf);

        writer.write_handshake(&Identity::new("Bob")).await.unwrap();

        assert_eq!(buf, vec![0, 0, 0, 3, b'B', b'o', b'b']);
    }

    #[tokio::test]
    async fn test_frame_writer_reader_exchange() {
        let (client, server) = tokio::io::duplex(8192);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        let frame = RawFrame::audio(&Identity::new("Carol"), &[1, 2, 3, 4]).unwrap();
        writer.write_handshake(&Identity::new("Carol")).await.unwrap();
        writer.write_frame(&frame).await.unwrap();
        drop(writer);

        let identity = reader.read_handshake().await.unwrap().unwrap();
        assert_eq!(identity.as_str(), "Carol");
        assert_eq!(reader.read_frame().await.unwrap().unwrap(), frame);
        assert!(reader.read_frame().await.unwrap().is_none());
    }
}
