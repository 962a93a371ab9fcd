//! Client session
//!
//! A session owns one relay connection and everything that feeds it: the
//! send and receive loops, the volume task, and the two device threads. The
//! first component to stop records why, and every other component observes
//! the same [`Lifecycle`] and winds down.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread;

use proxchat_common::Identity;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::audio::{CaptureDevice, PlaybackDevice};
use crate::constants::{CAPTURE_QUEUE_CHUNKS, PLAYBACK_QUEUE_CHUNKS, SHUTDOWN_GRACE};
use crate::error::ClientError;
use crate::network::{self, Connection};
use crate::pipeline;
use crate::spatial::{Falloff, MembershipObserver, PositionBoard};
use crate::state::SharedState;

// =============================================================================
// Lifecycle
// =============================================================================

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Shut down locally (user quit, signal, or drop)
    LocalShutdown,
    /// The relay closed the connection
    ConnectionClosed,
    /// Reading from or writing to the relay failed
    ConnectionLost,
    /// An audio device stopped working
    DeviceFailed,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionEnd::LocalShutdown => "session closed",
            SessionEnd::ConnectionClosed => "relay closed the connection",
            SessionEnd::ConnectionLost => "connection to relay lost",
            SessionEnd::DeviceFailed => "audio device failed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Default)]
struct LifecycleInner {
    end: OnceLock<SessionEnd>,
    notify: Notify,
}

/// Shared running flag with the reason it was cleared
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.inner.end.get().is_none()
    }

    /// Why the session stopped, if it has
    pub fn end(&self) -> Option<SessionEnd> {
        self.inner.end.get().copied()
    }

    /// Stop the session; only the first reason is kept
    ///
    /// Returns `true` if this call stopped it.
    pub fn stop(&self, reason: SessionEnd) -> bool {
        let first = self.inner.end.set(reason).is_ok();
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// Resolve once the session has stopped
    pub async fn stopped(&self) {
        loop {
            // Created before the check so a concurrent stop is not missed
            let notified = self.inner.notify.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// Settings for one session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Relay address as `host:port`
    pub server: String,
    pub identity: Identity,
    pub falloff: Falloff,
}

struct Tasks {
    send: JoinHandle<()>,
    receive: JoinHandle<()>,
    volumes: JoinHandle<()>,
    capture: thread::JoinHandle<()>,
    playback: thread::JoinHandle<()>,
}

impl Tasks {
    async fn join(self) {
        await_task("send loop", self.send).await;
        await_task("receive loop", self.receive).await;
        await_task("volume task", self.volumes).await;
        join_thread("capture pump", self.capture).await;
        join_thread("playback pump", self.playback).await;
    }

    fn abort(&self) {
        self.send.abort();
        self.receive.abort();
        self.volumes.abort();
    }
}

async fn await_task(name: &str, mut handle: JoinHandle<()>) {
    if timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
        debug!("{name} did not stop in time, aborting");
        handle.abort();
    }
}

async fn join_thread(name: &str, handle: thread::JoinHandle<()>) {
    match timeout(SHUTDOWN_GRACE, tokio::task::spawn_blocking(move || handle.join())).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(_))) => warn!("{name} panicked"),
        Ok(Err(e)) => warn!("failed to join {name}: {e}"),
        Err(_) => warn!("{name} did not stop in time, detaching"),
    }
}

/// A running connection to the relay
pub struct ClientSession {
    identity: Identity,
    state: SharedState,
    board: Arc<PositionBoard>,
    lifecycle: Lifecycle,
    tasks: Mutex<Option<Tasks>>,
}

impl ClientSession {
    /// Connect, register, and start streaming
    ///
    /// The position board receives every identity list and drives the volume
    /// each sender is played at.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay is unreachable, rejects the identity, or a
    /// device thread cannot be started. Nothing is left running on error.
    pub async fn start(
        options: SessionOptions,
        capture: Box<dyn CaptureDevice>,
        playback: Box<dyn PlaybackDevice>,
        board: Arc<PositionBoard>,
    ) -> Result<Self, ClientError> {
        let SessionOptions {
            server,
            identity,
            falloff,
        } = options;

        let Connection {
            reader,
            writer,
            members,
        } = network::connect(&server, &identity).await?;
        info!(%identity, %server, members = members.len(), "joined relay");
        board.sync_members(&members);

        let lifecycle = Lifecycle::new();
        let state = SharedState::new();
        let (capture_tx, capture_rx) = mpsc::channel(CAPTURE_QUEUE_CHUNKS);
        let (playback_tx, playback_rx) = crossbeam_channel::bounded(PLAYBACK_QUEUE_CHUNKS);

        let capture = pipeline::spawn_capture_pump(capture, capture_tx, lifecycle.clone())
            .map_err(ClientError::Thread)?;
        let playback = match pipeline::spawn_playback_pump(
            playback,
            playback_rx,
            state.clone(),
            lifecycle.clone(),
        ) {
            Ok(handle) => handle,
            Err(e) => {
                lifecycle.stop(SessionEnd::LocalShutdown);
                return Err(ClientError::Thread(e));
            }
        };

        let volumes = tokio::spawn(pipeline::run_volume_updates(
            board.subscribe(),
            identity.clone(),
            board.arena(),
            falloff,
            state.clone(),
            lifecycle.clone(),
        ));
        let send = tokio::spawn(network::send_loop(
            writer,
            capture_rx,
            identity.clone(),
            state.clone(),
            lifecycle.clone(),
        ));
        let observer: Arc<dyn MembershipObserver> = board.clone();
        let receive = tokio::spawn(network::receive_loop(
            reader,
            identity.clone(),
            state.clone(),
            playback_tx,
            observer,
            lifecycle.clone(),
        ));

        Ok(Self {
            identity,
            state,
            board,
            lifecycle,
            tasks: Mutex::new(Some(Tasks {
                send,
                receive,
                volumes,
                capture,
                playback,
            })),
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Mute/deafen flags and current volumes
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn board(&self) -> &Arc<PositionBoard> {
        &self.board
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Resolve once the session stops for any reason
    pub async fn closed(&self) -> SessionEnd {
        self.lifecycle.stopped().await;
        self.lifecycle.end().unwrap_or(SessionEnd::LocalShutdown)
    }

    /// Stop everything and release the connection and devices
    ///
    /// Safe to call more than once; later calls wait for the first to finish
    /// and report the same outcome.
    pub async fn shutdown(&self) -> SessionEnd {
        let mut tasks = self.tasks.lock().await;
        if self.lifecycle.stop(SessionEnd::LocalShutdown) {
            debug!(identity = %self.identity, "shutting down session");
        }
        if let Some(tasks) = tasks.take() {
            tasks.join().await;
        }
        self.lifecycle.end().unwrap_or(SessionEnd::LocalShutdown)
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.lifecycle.stop(SessionEnd::LocalShutdown);
        // Device threads notice the stop on their own
        if let Some(tasks) = self.tasks.get_mut().take() {
            tasks.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_lifecycle_keeps_first_reason() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.is_running());
        assert!(lifecycle.stop(SessionEnd::ConnectionClosed));
        assert!(!lifecycle.stop(SessionEnd::LocalShutdown));
        assert!(!lifecycle.is_running());
        assert_eq!(lifecycle.end(), Some(SessionEnd::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_lifecycle_wakes_waiters() {
        let lifecycle = Lifecycle::new();
        let waiter = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.stopped().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        lifecycle.stop(SessionEnd::LocalShutdown);
        timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter not woken")
            .unwrap();
    }

    #[tokio::test]
    async fn test_lifecycle_stopped_returns_immediately_when_stopped() {
        let lifecycle = Lifecycle::new();
        lifecycle.stop(SessionEnd::DeviceFailed);
        timeout(Duration::from_millis(100), lifecycle.stopped())
            .await
            .unwrap();
    }

    #[test]
    fn test_session_end_display() {
        assert_eq!(
            SessionEnd::ConnectionClosed.to_string(),
            "relay closed the connection"
        );
    }
}
