//! Shared helpers for client session tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use proxchat_client::audio::{CaptureDevice, DeviceError, RecordingPlayback};
use proxchat_client::spatial::{Arena, Falloff, Position, PositionBoard};
use proxchat_client::{ClientError, ClientSession, SessionOptions};
use proxchat_common::{CHUNK_SAMPLES, Identity};
use proxchat_server::{ConnectionRegistry, RelayConfig, serve};
use tokio::time::{sleep, timeout};

/// How long a test waits for something that should happen
pub const ARRIVAL_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a test waits to be confident something will not happen
pub const SILENCE_WINDOW: Duration = Duration::from_millis(300);

/// Start a relay on an ephemeral port
pub async fn start_relay() -> (SocketAddr, ConnectionRegistry) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = ConnectionRegistry::new();
    tokio::spawn(serve(listener, registry.clone(), RelayConfig::default()));
    (addr, registry)
}

/// Capture device fed chunk by chunk from the test
pub struct FeedCapture {
    rx: Receiver<Vec<i16>>,
}

impl CaptureDevice for FeedCapture {
    fn read_chunk(&mut self) -> Result<Vec<i16>, DeviceError> {
        self.rx
            .recv_timeout(Duration::from_millis(50))
            .map_err(|e| match e {
                RecvTimeoutError::Timeout => DeviceError::Timeout,
                RecvTimeoutError::Disconnected => DeviceError::Closed,
            })
    }
}

/// A client session with in-memory devices
pub struct Participant {
    pub session: ClientSession,
    pub feed: Sender<Vec<i16>>,
    pub played: Receiver<Vec<i16>>,
}

impl Participant {
    /// Start a session, returning the error if it fails
    pub async fn try_join(addr: SocketAddr, name: &str) -> Result<Self, ClientError> {
        let (feed, rx) = crossbeam_channel::unbounded();
        let (playback, played) = RecordingPlayback::new();
        let board = Arc::new(PositionBoard::new(Arena::new(1000.0, 1000.0)));
        let options = SessionOptions {
            server: addr.to_string(),
            identity: Identity::new(name),
            falloff: Falloff::Linear,
        };
        let session =
            ClientSession::start(options, Box::new(FeedCapture { rx }), Box::new(playback), board)
                .await?;
        Ok(Self {
            session,
            feed,
            played,
        })
    }

    pub async fn join(addr: SocketAddr, name: &str) -> Self {
        Self::try_join(addr, name).await.unwrap()
    }

    /// Capture one chunk where every sample is `value`
    pub fn speak(&self, value: i16) {
        self.feed.send(vec![value; CHUNK_SAMPLES]).unwrap();
    }

    /// Next chunk handed to the playback device
    pub async fn next_played(&self) -> Vec<i16> {
        let played = self.played.clone();
        tokio::task::spawn_blocking(move || played.recv_timeout(ARRIVAL_TIMEOUT))
            .await
            .unwrap()
            .expect("timed out waiting for playback")
    }

    /// Assert nothing reaches the playback device for a while
    pub async fn expect_silence(&self) {
        sleep(SILENCE_WINDOW).await;
        assert!(self.played.try_recv().is_err(), "unexpected playback");
    }

    /// Put a participant at a spot on this client's board
    pub fn place(&self, name: &str, x: f32, y: f32) {
        self.session
            .board()
            .set_position(&Identity::new(name), Position::new(x, y));
    }

    /// Wait until this client hears `name` at `expected` volume
    pub async fn wait_for_volume(&self, name: &str, expected: f32) {
        let identity = Identity::new(name);
        wait_until(|| (self.session.state().volume_for(&identity) - expected).abs() < 1e-3).await;
    }
}

/// Poll `condition` until it holds, failing the test on timeout
pub async fn wait_until(condition: impl Fn() -> bool) {
    timeout(ARRIVAL_TIMEOUT, async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Assert every sample is within one of `expected`
pub fn assert_level(chunk: &[i16], expected: i16) {
    assert_eq!(chunk.len(), CHUNK_SAMPLES);
    for sample in chunk {
        assert!(
            (i32::from(*sample) - i32::from(expected)).abs() <= 1,
            "sample {sample} not near {expected}"
        );
    }
}
