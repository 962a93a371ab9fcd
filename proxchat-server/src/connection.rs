//! Per-connection handling
//!
//! A connection moves through `AwaitingIdentity -> Registered -> Closed`. The
//! handler task owns the read half; a separate writer task owns the write
//! half and drains the connection's outgoing queue, so frames to one peer are
//! never interleaved and a slow peer never stalls its sender's reads.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use proxchat_common::framing::{FrameError, FrameReader, FrameWriter, MessageType};
use proxchat_common::{IDENTITY_FIELD_LEN, Identity};

use crate::constants::*;
use crate::registry::{ConnectionId, ConnectionRegistry, OutgoingFrame, RegisterError};

/// Parameters for handling a connection
pub struct ConnectionParams {
    pub peer_addr: SocketAddr,
    pub registry: ConnectionRegistry,
    pub handshake_timeout: Option<Duration>,
}

/// Handle one client connection until it closes
///
/// # Errors
///
/// Returns an error if the handshake is invalid or times out, the identity is
/// already connected, the client violates the framing protocol, or the read
/// side fails. The connection is fully cleaned up in every case.
pub async fn handle_connection<S>(socket: S, params: ConnectionParams) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ConnectionParams {
        peer_addr,
        registry,
        handshake_timeout,
    } = params;

    let (reader, writer) = tokio::io::split(socket);
    let mut frame_reader = FrameReader::new(BufReader::new(reader));
    let frame_writer = FrameWriter::new(writer);

    // AwaitingIdentity
    let identity = match frame_reader
        .read_handshake_with_timeout(handshake_timeout)
        .await?
    {
        Some(identity) => identity,
        None => {
            debug!(%peer_addr, "{}", MSG_CLOSED_BEFORE_HANDSHAKE);
            return Ok(());
        }
    };

    let (tx, rx) = mpsc::channel::<OutgoingFrame>(OUTGOING_QUEUE_FRAMES);
    let mut writer_task = tokio::spawn(write_outgoing(frame_writer, rx, peer_addr));

    let connection_id = match registry.register(identity.clone(), peer_addr, tx).await {
        Ok(id) => id,
        Err(e) => {
            // The rejected sender is already dropped, so the writer just closes
            finish_writer(&mut writer_task).await;
            let kind = match e {
                RegisterError::IdentityInUse(_) => io::ErrorKind::AlreadyExists,
                RegisterError::ListTooLarge { .. } => io::ErrorKind::Other,
            };
            return Err(io::Error::new(kind, e));
        }
    };
    info!(%peer_addr, %identity, connection_id, "{}", MSG_REGISTERED);

    // Registered
    let result = read_loop(&mut frame_reader, &registry, connection_id, &identity).await;

    // Closed
    registry.unregister(connection_id).await;
    finish_writer(&mut writer_task).await;
    info!(%peer_addr, %identity, "{}", MSG_DISCONNECTED);

    result
}

/// Read frames from a registered connection until it closes
async fn read_loop<R>(
    frame_reader: &mut FrameReader<R>,
    registry: &ConnectionRegistry,
    connection_id: ConnectionId,
    identity: &Identity,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    while let Some(frame) = frame_reader.read_frame().await? {
        match frame.message_type() {
            MessageType::Audio => {
                let body_len = frame.body().len();
                if body_len < IDENTITY_FIELD_LEN {
                    return Err(FrameError::AudioBodyTooShort(body_len).into());
                }
                registry
                    .relay(connection_id, frame.into_bytes().into())
                    .await;
            }
            MessageType::Control => {
                trace!(%identity, len = frame.body().len(), "{}", MSG_CONTROL_DISCARDED);
            }
            MessageType::IdentityList => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    ERR_CLIENT_IDENTITY_LIST,
                ));
            }
        }
    }
    Ok(())
}

/// Write queued frames until the queue closes or a write fails
async fn write_outgoing<W>(
    mut frame_writer: FrameWriter<W>,
    mut rx: mpsc::Receiver<OutgoingFrame>,
    peer_addr: SocketAddr,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = rx.recv().await {
        if let Err(e) = frame_writer.write_raw(&bytes).await {
            debug!(%peer_addr, error = %e, "{}", ERR_WRITE);
            break;
        }
    }
    let _ = frame_writer.get_mut().shutdown().await;
}

/// Wait for the writer to flush and close, aborting it if the peer stalls
async fn finish_writer(writer_task: &mut JoinHandle<()>) {
    if timeout(WRITER_DRAIN_TIMEOUT, &mut *writer_task).await.is_err() {
        warn!("Writer did not finish in time, aborting");
        writer_task.abort();
    }
}
