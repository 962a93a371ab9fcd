//! Audio devices
//!
//! The pipeline talks to devices through two blocking traits that move fixed
//! chunks of 1024 mono 16-bit samples at 44.1 kHz. The `cpal` backend drives
//! real hardware; the in-memory backend feeds scripted audio and records what
//! was played.

mod device;
mod memory;
pub mod pcm;

pub use device::{
    CpalCapture, CpalPlayback, SYSTEM_DEFAULT_DEVICE_NAME, list_input_devices,
    list_output_devices,
};
pub use memory::{RecordingPlayback, ScriptedCapture};

use thiserror::Error;

/// Errors raised by audio devices
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{0} device not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Unsupported(String),

    #[error("failed to open audio stream: {0}")]
    Stream(String),

    /// The stream hiccuped; the next call may succeed
    #[error("audio stream glitch: {0}")]
    Glitch(String),

    /// No chunk was ready within the poll interval
    #[error("no audio available yet")]
    Timeout,

    /// The device has stopped and will produce or accept nothing more
    #[error("audio device closed")]
    Closed,
}

impl DeviceError {
    /// Whether the device is gone for good
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeviceError::NotFound(_) | DeviceError::Closed)
    }
}

/// Source of captured audio
pub trait CaptureDevice: Send {
    /// Block until the next chunk is available
    ///
    /// Returns `DeviceError::Timeout` if nothing arrived within the device's
    /// poll interval, so callers can re-check whether to keep going.
    fn read_chunk(&mut self) -> Result<Vec<i16>, DeviceError>;
}

/// Sink for audio to play
pub trait PlaybackDevice: Send {
    /// Queue one chunk for playback
    fn write_chunk(&mut self, samples: &[i16]) -> Result<(), DeviceError>;
}
