//! Proxchat Common Library
//!
//! Shared wire format, identity handling, and logging setup for the proxchat
//! relay server and client.

pub mod framing;
pub mod identity;
pub mod io;
pub mod logging;
pub mod protocol;

pub use identity::{IDENTITY_FIELD_LEN, Identity};

/// Default TCP port the relay listens on
pub const DEFAULT_PORT: u16 = 8080;

/// Sample rate of every PCM chunk (mono, 16-bit signed little-endian)
pub const SAMPLE_RATE: u32 = 44_100;

/// Number of samples in one PCM chunk
pub const CHUNK_SAMPLES: usize = 1024;

/// Size of one PCM chunk in bytes
pub const CHUNK_BYTES: usize = CHUNK_SAMPLES * std::mem::size_of::<i16>();
