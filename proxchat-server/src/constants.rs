//! Server log and error messages

use std::time::Duration;

// =============================================================================
// Startup / shutdown
// =============================================================================

pub const MSG_BANNER: &str = "Proxchat relay v";
pub const MSG_LISTENING: &str = "Listening on ";
pub const MSG_HANDSHAKE_TIMEOUT: &str = "Handshake timeout: ";
pub const MSG_SHUTDOWN_RECEIVED: &str = "Shutdown signal received, closing relay";

// =============================================================================
// Connection lifecycle
// =============================================================================

pub const MSG_ACCEPTED: &str = "Accepted connection";
pub const MSG_REGISTERED: &str = "Participant registered";
pub const MSG_DISCONNECTED: &str = "Participant disconnected";
pub const MSG_CLOSED_BEFORE_HANDSHAKE: &str = "Connection closed before handshake";
pub const MSG_CONTROL_DISCARDED: &str = "Discarding control message";

// =============================================================================
// Errors
// =============================================================================

pub const ERR_BIND: &str = "Failed to bind ";
pub const ERR_ACCEPT: &str = "Failed to accept connection: ";
pub const ERR_CONNECTION: &str = "Connection error from ";
pub const ERR_SIGNAL: &str = "Failed to install signal handler: ";
pub const ERR_CLIENT_IDENTITY_LIST: &str = "client sent an identity list";
pub const ERR_WRITE: &str = "Write to participant failed";
pub const ERR_RELAY_SEND: &str = "Dropping frame for departed participant";
pub const ERR_RELAY_FULL: &str = "Dropping frame for stalled participant";
pub const ERR_LIST_TOO_LARGE: &str = "Refusing registration, identity list would exceed its frame limit";

// =============================================================================
// Queues
// =============================================================================

/// Frames a participant's writer may fall behind before new frames are dropped
///
/// About a second and a half of audio from one other speaker.
pub const OUTGOING_QUEUE_FRAMES: usize = 64;

// =============================================================================
// Timing
// =============================================================================

/// Default time a new connection has to send its handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 30;

/// How long a closing connection's writer may take to flush queued frames
pub const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
