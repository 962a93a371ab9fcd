//! Hardware audio through cpal
//!
//! A cpal `Stream` cannot leave the thread that built it, so each device owns a
//! small host thread that builds the stream, starts it, and holds it until the
//! device is dropped. The device handle itself only touches channels and
//! shared buffers and is free to move to the pipeline threads.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, Host, Sample, SampleFormat, Stream, StreamConfig, StreamError,
    SupportedStreamConfigRange,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use proxchat_common::{CHUNK_SAMPLES, SAMPLE_RATE};

use super::{CaptureDevice, DeviceError, PlaybackDevice};
use crate::constants::{CAPTURE_QUEUE_CHUNKS, DEVICE_POLL_INTERVAL, DEVICE_QUEUE_CHUNKS};

// =============================================================================
// Constants
// =============================================================================

/// System default device display name
pub const SYSTEM_DEFAULT_DEVICE_NAME: &str = "System Default";

/// Sample formats we can convert from and to
const SUPPORTED_FORMATS: [SampleFormat; 3] = [SampleFormat::F32, SampleFormat::I16, SampleFormat::U16];

// =============================================================================
// Device Enumeration
// =============================================================================

fn get_host() -> Host {
    cpal::default_host()
}

fn device_name(device: &Device) -> Option<String> {
    device.description().ok().map(|desc| desc.name().to_string())
}

fn collect_names(devices: impl Iterator<Item = Device>) -> Vec<String> {
    let mut names = vec![SYSTEM_DEFAULT_DEVICE_NAME.to_string()];
    for name in devices.filter_map(|d| device_name(&d)) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// List available input devices, "System Default" first
pub fn list_input_devices() -> Vec<String> {
    match get_host().input_devices() {
        Ok(devices) => collect_names(devices),
        Err(_) => vec![SYSTEM_DEFAULT_DEVICE_NAME.to_string()],
    }
}

/// List available output devices, "System Default" first
pub fn list_output_devices() -> Vec<String> {
    match get_host().output_devices() {
        Ok(devices) => collect_names(devices),
        Err(_) => vec![SYSTEM_DEFAULT_DEVICE_NAME.to_string()],
    }
}

fn is_default_name(name: &str) -> bool {
    name.is_empty() || name == SYSTEM_DEFAULT_DEVICE_NAME
}

/// Find an input device by name; unknown names fall back to the default
fn find_input_device(name: &str) -> Option<Device> {
    let host = get_host();
    if is_default_name(name) {
        return host.default_input_device();
    }
    let found = host
        .input_devices()
        .ok()
        .and_then(|mut devices| devices.find(|d| device_name(d).as_deref() == Some(name)));
    if found.is_none() {
        tracing::warn!(device = name, "input device not found, using default");
    }
    found.or_else(|| host.default_input_device())
}

/// Find an output device by name; unknown names fall back to the default
fn find_output_device(name: &str) -> Option<Device> {
    let host = get_host();
    if is_default_name(name) {
        return host.default_output_device();
    }
    let found = host
        .output_devices()
        .ok()
        .and_then(|mut devices| devices.find(|d| device_name(d).as_deref() == Some(name)));
    if found.is_none() {
        tracing::warn!(device = name, "output device not found, using default");
    }
    found.or_else(|| host.default_output_device())
}

// =============================================================================
// Stream Configuration
// =============================================================================

/// Pick a channel count and sample format that runs at our sample rate
///
/// Mono is preferred. Stereo is accepted and mixed down (capture) or
/// duplicated (playback).
fn choose_format(ranges: &[SupportedStreamConfigRange]) -> Option<(u16, SampleFormat)> {
    [1u16, 2].into_iter().find_map(|channels| {
        ranges
            .iter()
            .find(|c| {
                c.channels() == channels
                    && c.min_sample_rate() <= SAMPLE_RATE
                    && c.max_sample_rate() >= SAMPLE_RATE
                    && SUPPORTED_FORMATS.contains(&c.sample_format())
            })
            .map(|c| (channels, c.sample_format()))
    })
}

fn unsupported_rate(kind: &str, ranges: &[SupportedStreamConfigRange]) -> DeviceError {
    let rates: Vec<String> = ranges
        .iter()
        .map(|c| {
            if c.min_sample_rate() == c.max_sample_rate() {
                format!("{}Hz", c.min_sample_rate())
            } else {
                format!("{}-{}Hz", c.min_sample_rate(), c.max_sample_rate())
            }
        })
        .collect();
    let rates = if rates.is_empty() {
        "unknown".to_string()
    } else {
        rates.join(", ")
    };
    DeviceError::Unsupported(format!(
        "{kind} device doesn't support {SAMPLE_RATE}Hz mono or stereo. Device supports: {rates}"
    ))
}

fn stream_config(channels: u16) -> StreamConfig {
    StreamConfig {
        channels,
        sample_rate: SAMPLE_RATE,
        buffer_size: cpal::BufferSize::Default,
    }
}

/// Whether a stream error means the stream will never run again
///
/// Overruns, underruns and backend hiccups only cost a glitch.
fn is_fatal(err: &StreamError) -> bool {
    matches!(
        err,
        StreamError::DeviceNotAvailable | StreamError::StreamInvalidated
    )
}

fn handle_stream_error(kind: &str, err: &StreamError, failed: &AtomicBool) {
    if is_fatal(err) {
        tracing::error!("audio {kind} stream stopped: {err}");
        failed.store(true, Ordering::Relaxed);
    } else {
        tracing::debug!("audio {kind} glitch: {err}");
    }
}

// =============================================================================
// Stream Host
// =============================================================================

/// Thread that owns a running cpal stream
struct StreamHost {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl StreamHost {
    /// Build and start a stream on a new thread, waiting until it is playing
    fn spawn<F>(name: &str, build: F) -> Result<Self, DeviceError>
    where
        F: FnOnce() -> Result<Stream, DeviceError> + Send + 'static,
    {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let stream = match build().and_then(|stream| {
                    stream
                        .play()
                        .map_err(|e| DeviceError::Stream(e.to_string()))?;
                    Ok(stream)
                }) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Returns once the handle signals or is dropped
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(DeviceError::Closed)
            }
        }
    }
}

impl Drop for StreamHost {
    fn drop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// =============================================================================
// Capture
// =============================================================================

/// Microphone capture producing 1024-sample mono chunks
///
/// If the reader falls behind, the oldest chunks are discarded so latency
/// never grows past a few chunks.
pub struct CpalCapture {
    chunks: Receiver<Vec<i16>>,
    failed: Arc<AtomicBool>,
    _host: StreamHost,
}

impl CpalCapture {
    /// Open the named input device (empty for the system default)
    pub fn open(device_name: &str) -> Result<Self, DeviceError> {
        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(CAPTURE_QUEUE_CHUNKS);
        let failed = Arc::new(AtomicBool::new(false));

        let name = device_name.to_string();
        let drop_rx = chunk_rx.clone();
        let failed_flag = failed.clone();
        let host = StreamHost::spawn("proxchat-capture", move || {
            let device = find_input_device(&name).ok_or(DeviceError::NotFound("input"))?;
            let ranges: Vec<SupportedStreamConfigRange> = device
                .supported_input_configs()
                .map_err(|e| DeviceError::Unsupported(e.to_string()))?
                .collect();
            let (channels, format) =
                choose_format(&ranges).ok_or_else(|| unsupported_rate("Input", &ranges))?;
            tracing::debug!(channels, ?format, "opening input stream");

            let config = stream_config(channels);
            let sink = ChunkSink {
                tx: chunk_tx,
                overflow: drop_rx,
            };
            match format {
                SampleFormat::F32 => build_capture::<f32>(&device, &config, sink, failed_flag),
                SampleFormat::I16 => build_capture::<i16>(&device, &config, sink, failed_flag),
                SampleFormat::U16 => build_capture::<u16>(&device, &config, sink, failed_flag),
                other => Err(DeviceError::Unsupported(format!(
                    "unsupported sample format: {other:?}"
                ))),
            }
        })?;

        Ok(Self {
            chunks: chunk_rx,
            failed,
            _host: host,
        })
    }
}

impl CaptureDevice for CpalCapture {
    fn read_chunk(&mut self) -> Result<Vec<i16>, DeviceError> {
        if self.failed.load(Ordering::Relaxed) {
            return Err(DeviceError::Closed);
        }
        self.chunks
            .recv_timeout(DEVICE_POLL_INTERVAL)
            .map_err(|e| match e {
                RecvTimeoutError::Timeout => DeviceError::Timeout,
                RecvTimeoutError::Disconnected => DeviceError::Closed,
            })
    }
}

/// Bounded chunk queue that evicts the oldest chunk when full
struct ChunkSink {
    tx: Sender<Vec<i16>>,
    overflow: Receiver<Vec<i16>>,
}

impl ChunkSink {
    fn push(&self, mut chunk: Vec<i16>) {
        loop {
            match self.tx.try_send(chunk) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.overflow.try_recv();
                    chunk = back;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

fn build_capture<T>(
    device: &Device,
    config: &StreamConfig,
    sink: ChunkSink,
    failed: Arc<AtomicBool>,
) -> Result<Stream, DeviceError>
where
    T: Sample + cpal::SizedSample,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels);
    let mut pending: Vec<i16> = Vec::with_capacity(CHUNK_SAMPLES);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks_exact(channels) {
                    let sum: f32 = frame.iter().map(|s| f32::from_sample(*s)).sum();
                    pending.push(i16::from_sample(sum / channels as f32));
                    if pending.len() == CHUNK_SAMPLES {
                        let chunk = std::mem::replace(&mut pending, Vec::with_capacity(CHUNK_SAMPLES));
                        sink.push(chunk);
                    }
                }
            },
            move |err| handle_stream_error("capture", &err, &failed),
            None,
        )
        .map_err(|e| DeviceError::Stream(e.to_string()))
}

// =============================================================================
// Playback
// =============================================================================

/// Speaker playback fed one chunk at a time
///
/// Chunks queue up in order; when the queue runs dry the device plays
/// silence, and when it grows past the cap the oldest samples are dropped.
pub struct CpalPlayback {
    queue: Arc<Mutex<VecDeque<i16>>>,
    failed: Arc<AtomicBool>,
    _host: StreamHost,
}

impl CpalPlayback {
    /// Open the named output device (empty for the system default)
    pub fn open(device_name: &str) -> Result<Self, DeviceError> {
        let queue = Arc::new(Mutex::new(VecDeque::with_capacity(
            CHUNK_SAMPLES * DEVICE_QUEUE_CHUNKS,
        )));
        let failed = Arc::new(AtomicBool::new(false));

        let name = device_name.to_string();
        let shared = queue.clone();
        let failed_flag = failed.clone();
        let host = StreamHost::spawn("proxchat-playback", move || {
            let device = find_output_device(&name).ok_or(DeviceError::NotFound("output"))?;
            let ranges: Vec<SupportedStreamConfigRange> = device
                .supported_output_configs()
                .map_err(|e| DeviceError::Unsupported(e.to_string()))?
                .collect();
            let (channels, format) =
                choose_format(&ranges).ok_or_else(|| unsupported_rate("Output", &ranges))?;
            tracing::debug!(channels, ?format, "opening output stream");

            let config = stream_config(channels);
            match format {
                SampleFormat::F32 => build_playback::<f32>(&device, &config, shared, failed_flag),
                SampleFormat::I16 => build_playback::<i16>(&device, &config, shared, failed_flag),
                SampleFormat::U16 => build_playback::<u16>(&device, &config, shared, failed_flag),
                other => Err(DeviceError::Unsupported(format!(
                    "unsupported sample format: {other:?}"
                ))),
            }
        })?;

        Ok(Self {
            queue,
            failed,
            _host: host,
        })
    }
}

impl PlaybackDevice for CpalPlayback {
    fn write_chunk(&mut self, samples: &[i16]) -> Result<(), DeviceError> {
        if self.failed.load(Ordering::Relaxed) {
            return Err(DeviceError::Closed);
        }
        let mut queue = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        queue.extend(samples);

        let max_len = CHUNK_SAMPLES * DEVICE_QUEUE_CHUNKS;
        if queue.len() > max_len {
            let excess = queue.len() - max_len;
            queue.drain(..excess);
        }
        Ok(())
    }
}

fn build_playback<T>(
    device: &Device,
    config: &StreamConfig,
    queue: Arc<Mutex<VecDeque<i16>>>,
    failed: Arc<AtomicBool>,
) -> Result<Stream, DeviceError>
where
    T: Sample + cpal::SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut queue = queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                for frame in data.chunks_exact_mut(channels) {
                    let value = queue.pop_front().map_or(0.0, |s| f32::from_sample(s));
                    frame.fill(T::from_sample(value));
                }
            },
            move |err| handle_stream_error("playback", &err, &failed),
            None,
        )
        .map_err(|e| DeviceError::Stream(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_detection() {
        assert!(is_default_name(""));
        assert!(is_default_name(SYSTEM_DEFAULT_DEVICE_NAME));
        assert!(!is_default_name("USB Headset"));
    }

    #[test]
    fn test_list_input_devices_includes_default() {
        let devices = list_input_devices();
        assert_eq!(devices[0], SYSTEM_DEFAULT_DEVICE_NAME);
    }

    #[test]
    fn test_list_output_devices_includes_default() {
        let devices = list_output_devices();
        assert_eq!(devices[0], SYSTEM_DEFAULT_DEVICE_NAME);
    }

    #[test]
    fn test_xruns_are_not_fatal() {
        assert!(!is_fatal(&StreamError::BufferUnderrun));
        assert!(!is_fatal(&StreamError::BackendSpecific {
            err: cpal::BackendSpecificError {
                description: "poll returned POLLERR".to_string(),
            },
        }));
    }

    #[test]
    fn test_lost_device_is_fatal() {
        assert!(is_fatal(&StreamError::DeviceNotAvailable));
        assert!(is_fatal(&StreamError::StreamInvalidated));
    }

    #[test]
    fn test_underrun_keeps_device_usable() {
        let failed = AtomicBool::new(false);
        handle_stream_error("capture", &StreamError::BufferUnderrun, &failed);
        assert!(!failed.load(Ordering::Relaxed));

        handle_stream_error("capture", &StreamError::DeviceNotAvailable, &failed);
        assert!(failed.load(Ordering::Relaxed));
    }

    #[test]
    fn test_chunk_sink_evicts_oldest() {
        let (tx, rx) = crossbeam_channel::bounded(2);
        let sink = ChunkSink {
            tx,
            overflow: rx.clone(),
        };
        sink.push(vec![1]);
        sink.push(vec![2]);
        sink.push(vec![3]);

        assert_eq!(rx.try_recv().unwrap(), vec![2]);
        assert_eq!(rx.try_recv().unwrap(), vec![3]);
        assert!(rx.try_recv().is_err());
    }
}
