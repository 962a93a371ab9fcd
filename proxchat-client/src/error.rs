//! Client error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::audio::DeviceError;

/// Errors loading or saving the settings file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not determine the config directory")]
    NoConfigDir,
}

/// Errors starting or running a client session
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error("failed to start audio thread: {0}")]
    Thread(#[source] io::Error),

    #[error("audio device error: {0}")]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
