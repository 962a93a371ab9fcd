//! Client-wide constants

use std::time::Duration;

/// Application directory name under the platform config directory
pub const APP_DIR_NAME: &str = "proxchat";

/// Settings file name
pub const CONFIG_FILE_NAME: &str = "client.json";

/// Identity used when none is configured
pub const DEFAULT_IDENTITY: &str = "User1";

/// Relay host used when none is configured
pub const DEFAULT_SERVER: &str = "127.0.0.1";

/// Default arena size, matching the scene the positions come from
pub const DEFAULT_ARENA_WIDTH: f32 = 1000.0;
pub const DEFAULT_ARENA_HEIGHT: f32 = 1000.0;

/// Newcomers are placed at least this far from the top/left edge
pub const PLACEMENT_MARGIN_MIN: f32 = 50.0;

/// ...and at least this far from the bottom/right edge
pub const PLACEMENT_MARGIN_MAX: f32 = 70.0;

/// Captured chunks buffered between the capture thread and the send loop
pub const CAPTURE_QUEUE_CHUNKS: usize = 8;

/// Decoded chunks buffered between the receive loop and the playback thread
pub const PLAYBACK_QUEUE_CHUNKS: usize = 16;

/// Samples the output device may hold ahead of the speaker, in chunks
pub const DEVICE_QUEUE_CHUNKS: usize = 4;

/// How often blocked device threads re-check the running flag
pub const DEVICE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pause after a device glitch before reading again
pub const GLITCH_BACKOFF: Duration = Duration::from_millis(10);

/// Time allowed for tasks and threads to wind down during shutdown
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);
