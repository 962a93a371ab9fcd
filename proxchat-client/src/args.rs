//! Command-line argument parsing

use std::path::PathBuf;

use clap::Parser;

use proxchat_client::config::ClientConfig;

/// Proxchat proximity voice client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Identity to join as (overrides the settings file)
    pub identity: Option<String>,

    /// Relay host name or address
    #[arg(short, long)]
    pub server: Option<String>,

    /// Relay port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Settings file (defaults to the platform config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Capture device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Playback device name
    #[arg(long)]
    pub output_device: Option<String>,

    /// Write the effective settings back to the settings file
    #[arg(long, default_value = "false")]
    pub save_config: bool,

    /// List audio devices and exit
    #[arg(long, default_value = "false")]
    pub list_devices: bool,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub debug: bool,
}

impl Args {
    /// Layer the command line over loaded settings
    pub fn apply_to(&self, config: &mut ClientConfig) {
        if let Some(identity) = &self.identity {
            config.identity = identity.clone();
        }
        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(device) = &self.input_device {
            config.input_device = device.clone();
        }
        if let Some(device) = &self.output_device {
            config.output_device = device.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults_keep_config() {
        let args = Args::parse_from(["proxchat"]);
        let mut config = ClientConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config, ClientConfig::default());
        assert!(!args.debug);
        assert!(!args.list_devices);
        assert!(!args.save_config);
    }

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "proxchat",
            "Alice",
            "--server",
            "relay.local",
            "-p",
            "9000",
            "--input-device",
            "USB Mic",
        ]);
        let mut config = ClientConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.identity, "Alice");
        assert_eq!(config.server_addr(), "relay.local:9000");
        assert_eq!(config.input_device, "USB Mic");
        assert_eq!(config.output_device, "");
    }
}
