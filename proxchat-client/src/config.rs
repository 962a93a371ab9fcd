//! Client settings
//!
//! Settings live in `client.json` under the platform config directory. Every
//! field has a default, so a missing file or a partial file both work.
//! `--save-config` writes the settings in effect back to the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;
use crate::spatial::{Arena, Falloff};

/// Persistent client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Relay host name or address
    #[serde(default = "default_server")]
    pub server: String,

    /// Relay port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Identity announced to the relay
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Capture device name (empty for system default)
    #[serde(default)]
    pub input_device: String,

    /// Playback device name (empty for system default)
    #[serde(default)]
    pub output_device: String,

    /// Arena width in position units
    #[serde(default = "default_arena_width")]
    pub arena_width: f32,

    /// Arena height in position units
    #[serde(default = "default_arena_height")]
    pub arena_height: f32,

    /// Distance-to-volume curve
    #[serde(default)]
    pub falloff: Falloff,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_port() -> u16 {
    proxchat_common::DEFAULT_PORT
}

fn default_identity() -> String {
    DEFAULT_IDENTITY.to_string()
}

fn default_arena_width() -> f32 {
    DEFAULT_ARENA_WIDTH
}

fn default_arena_height() -> f32 {
    DEFAULT_ARENA_HEIGHT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            identity: default_identity(),
            input_device: String::new(),
            output_device: String::new(),
            arena_width: DEFAULT_ARENA_WIDTH,
            arena_height: DEFAULT_ARENA_HEIGHT,
            falloff: Falloff::default(),
        }
    }
}

impl ClientConfig {
    /// Platform-specific settings path
    ///
    /// Returns None if the config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load settings from `path`, returning defaults if the file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from `path` if given, else from the platform default
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) => Self::load_from(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Write settings to `path` as pretty JSON, creating its directory
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| write_error(e.into()))?;
        fs::write(path, json).map_err(write_error)
    }

    /// Write settings to `path` if given, else to the platform default
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path().ok_or(ConfigError::NoConfigDir)?,
        };
        self.save_to(&path)?;
        Ok(path)
    }

    /// The arena described by these settings
    pub fn arena(&self) -> Arena {
        Arena::new(self.arena_width, self.arena_height)
    }

    /// `host:port` for connecting to the relay
    pub fn server_addr(&self) -> String {
        if self.server.contains(':') && !self.server.starts_with('[') {
            format!("[{}]:{}", self.server, self.port)
        } else {
            format!("{}:{}", self.server, self.port)
        }
    }
}
