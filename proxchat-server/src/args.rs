//! Command-line argument parsing

use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use proxchat_common::DEFAULT_PORT;

use proxchat_server::constants::DEFAULT_HANDSHAKE_TIMEOUT_SECS;

/// Proxchat relay server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// IP address to bind to (IPv4 or IPv6)
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds a new connection has to send its identity (0 waits forever)
    #[arg(long, default_value_t = DEFAULT_HANDSHAKE_TIMEOUT_SECS)]
    pub handshake_timeout: u64,

    /// Enable debug logging (shows per-connection events)
    #[arg(long, default_value = "false")]
    pub debug: bool,
}

impl Args {
    /// Handshake timeout, with 0 meaning none
    pub fn handshake_limit(&self) -> Option<Duration> {
        (self.handshake_timeout > 0).then(|| Duration::from_secs(self.handshake_timeout))
    }
}
