//! In-memory devices for headless runs and tests

use std::collections::VecDeque;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use super::{CaptureDevice, DeviceError, PlaybackDevice};
use crate::constants::DEVICE_POLL_INTERVAL;

/// Capture device that plays back a fixed script of chunks
///
/// Once the script is exhausted it behaves like a silent microphone that
/// never has a chunk ready.
#[derive(Debug, Default)]
pub struct ScriptedCapture {
    chunks: VecDeque<Vec<i16>>,
}

impl ScriptedCapture {
    pub fn new(chunks: impl IntoIterator<Item = Vec<i16>>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }
}

impl CaptureDevice for ScriptedCapture {
    fn read_chunk(&mut self) -> Result<Vec<i16>, DeviceError> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(chunk),
            None => {
                thread::sleep(DEVICE_POLL_INTERVAL);
                Err(DeviceError::Timeout)
            }
        }
    }
}

/// Playback device that forwards every chunk to a channel
#[derive(Debug)]
pub struct RecordingPlayback {
    tx: Sender<Vec<i16>>,
}

impl RecordingPlayback {
    /// Create the device and the receiver that sees what it plays
    pub fn new() -> (Self, Receiver<Vec<i16>>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl PlaybackDevice for RecordingPlayback {
    fn write_chunk(&mut self, samples: &[i16]) -> Result<(), DeviceError> {
        self.tx
            .send(samples.to_vec())
            .map_err(|_| DeviceError::Closed)
    }
}
