//! Audio pipeline
//!
//! Blocking device I/O runs on two dedicated threads that move chunks between
//! the devices and the network loops. Received audio is attenuated on the
//! playback thread, right before it is handed to the device. A third, async,
//! task keeps the volume map in step with the position board.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::RecvTimeoutError;
use proxchat_common::Identity;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, trace, warn};

use crate::audio::{CaptureDevice, DeviceError, PlaybackDevice};
use crate::constants::{DEVICE_POLL_INTERVAL, GLITCH_BACKOFF};
use crate::session::{Lifecycle, SessionEnd};
use crate::spatial::{Arena, Falloff, Positions, compute_volumes};
use crate::state::SharedState;

/// Scale samples by `volume`, saturating at the 16-bit range
pub fn attenuate(samples: &mut [i16], volume: f32) {
    for sample in samples.iter_mut() {
        let scaled = f32::from(*sample) * volume;
        *sample = scaled.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
    }
}

// =============================================================================
// Device Threads
// =============================================================================

/// A decoded chunk and who sent it, not yet scaled
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReceivedChunk {
    pub sender: Identity,
    pub samples: Vec<i16>,
}

/// Read captured chunks and queue them for the send loop
///
/// A full queue drops the chunk rather than stalling the microphone. Glitches
/// are skipped; only a device that is gone stops the session.
pub(crate) fn spawn_capture_pump(
    mut capture: Box<dyn CaptureDevice>,
    chunks: mpsc::Sender<Vec<i16>>,
    lifecycle: Lifecycle,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("proxchat-capture-pump".to_string())
        .spawn(move || {
            while lifecycle.is_running() {
                match capture.read_chunk() {
                    Ok(chunk) => match chunks.try_send(chunk) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            trace!("send queue full, dropping captured chunk");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    },
                    Err(DeviceError::Timeout) => {}
                    Err(e) if e.is_fatal() => {
                        error!("capture device failed: {e}");
                        lifecycle.stop(SessionEnd::DeviceFailed);
                        break;
                    }
                    Err(e) => {
                        warn!("capture glitch, chunk skipped: {e}");
                        thread::sleep(GLITCH_BACKOFF);
                    }
                }
            }
            debug!("capture pump stopped");
        })
}

/// Scale received chunks by the sender's current volume and play them
///
/// The volume is read when the chunk reaches the device, so a position change
/// applies to audio that was already queued.
pub(crate) fn spawn_playback_pump(
    mut playback: Box<dyn PlaybackDevice>,
    chunks: crossbeam_channel::Receiver<ReceivedChunk>,
    state: SharedState,
    lifecycle: Lifecycle,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("proxchat-playback-pump".to_string())
        .spawn(move || {
            while lifecycle.is_running() {
                let ReceivedChunk {
                    sender,
                    mut samples,
                } = match chunks.recv_timeout(DEVICE_POLL_INTERVAL) {
                    Ok(chunk) => chunk,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                };
                if state.is_deafened() {
                    continue;
                }
                attenuate(&mut samples, state.volume_for(&sender));
                match playback.write_chunk(&samples) {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => {
                        error!("playback device failed: {e}");
                        lifecycle.stop(SessionEnd::DeviceFailed);
                        break;
                    }
                    Err(e) => warn!("playback glitch, chunk skipped: {e}"),
                }
            }
            debug!("playback pump stopped");
        })
}

// =============================================================================
// Volume Updates
// =============================================================================

/// Recompute volumes whenever the position board changes
pub(crate) async fn run_volume_updates(
    mut positions: watch::Receiver<Positions>,
    me: Identity,
    arena: Arena,
    falloff: Falloff,
    state: SharedState,
    lifecycle: Lifecycle,
) {
    loop {
        let volumes = compute_volumes(&positions.borrow_and_update(), &me, arena, falloff);
        state.replace_volumes(volumes);

        tokio::select! {
            changed = positions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = lifecycle.stopped() => break,
        }
    }
}
