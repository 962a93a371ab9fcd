//! Send and receive loops
//!
//! The loops run as separate tasks so a read is never cancelled mid-frame.
//! The receive loop reads without `select!`; the send loop only selects
//! between cancel-safe receives. Either loop ending stops the session.

use std::sync::Arc;

use crossbeam_channel::TrySendError;
use proxchat_common::Identity;
use proxchat_common::framing::RawFrame;
use proxchat_common::io::read_message;
use proxchat_common::protocol::Message;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::{Reader, Writer};
use crate::audio::pcm::{bytes_to_samples, samples_to_bytes};
use crate::pipeline::ReceivedChunk;
use crate::session::{Lifecycle, SessionEnd};
use crate::spatial::MembershipObserver;
use crate::state::SharedState;

/// Frame captured chunks and write them to the relay
///
/// While muted, chunks are still drained from the capture queue but not sent.
pub(crate) async fn send_loop(
    mut writer: Writer,
    mut chunks: mpsc::Receiver<Vec<i16>>,
    identity: Identity,
    state: SharedState,
    lifecycle: Lifecycle,
) {
    loop {
        tokio::select! {
            chunk = chunks.recv() => {
                let Some(chunk) = chunk else {
                    lifecycle.stop(SessionEnd::DeviceFailed);
                    break;
                };
                if state.is_muted() {
                    continue;
                }
                let frame = match RawFrame::audio(&identity, &samples_to_bytes(&chunk)) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("captured chunk not sendable: {e}");
                        continue;
                    }
                };
                if let Err(e) = writer.write_frame(&frame).await {
                    debug!("write to relay failed: {e}");
                    lifecycle.stop(SessionEnd::ConnectionLost);
                    break;
                }
            }
            _ = lifecycle.stopped() => break,
        }
    }

    let _ = writer.get_mut().shutdown().await;
    debug!("send loop stopped");
}

/// Read frames from the relay until it closes or the session stops
///
/// Audio is decoded and queued as-is; the playback thread applies volumes.
pub(crate) async fn receive_loop(
    mut reader: Reader,
    identity: Identity,
    state: SharedState,
    playback: crossbeam_channel::Sender<ReceivedChunk>,
    observer: Arc<dyn MembershipObserver>,
    lifecycle: Lifecycle,
) {
    while lifecycle.is_running() {
        match read_message(&mut reader).await {
            Ok(Some(Message::Audio { sender, pcm })) => {
                if sender == identity || state.is_deafened() {
                    continue;
                }
                let samples = bytes_to_samples(&pcm);
                match playback.try_send(ReceivedChunk { sender, samples }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(chunk)) => {
                        trace!(sender = %chunk.sender, "playback queue full, dropping chunk");
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            Ok(Some(Message::IdentityList { identities })) => {
                debug!(count = identities.len(), "membership changed");
                observer.on_identity_list(&identities);
            }
            Ok(Some(Message::Control { payload })) => {
                trace!(len = payload.len(), "ignoring control message");
            }
            Ok(None) => {
                lifecycle.stop(SessionEnd::ConnectionClosed);
                break;
            }
            Err(e) => {
                if lifecycle.stop(SessionEnd::ConnectionLost) {
                    warn!("connection to relay lost: {e}");
                }
                break;
            }
        }
    }
    debug!("receive loop stopped");
}
