//! Proxchat Client Library
//!
//! Connects to a relay, streams captured audio out, and plays every other
//! participant's audio back at a volume set by their distance in a shared
//! 2-D arena.

pub mod audio;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod session;
pub mod spatial;
pub mod state;

pub use error::ClientError;
pub use session::{ClientSession, SessionEnd, SessionOptions};
