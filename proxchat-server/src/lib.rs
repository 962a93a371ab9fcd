//! Proxchat Relay Server Library
//!
//! This library exposes the relay's modules so the binary and integration
//! tests share one accept loop.

pub mod connection;
pub mod constants;
pub mod registry;
pub mod server;

pub use registry::{ConnectionId, ConnectionRegistry, RegisterError};
pub use server::{RelayConfig, serve};
