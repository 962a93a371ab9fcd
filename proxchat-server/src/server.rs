//! Accept loop

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, error, warn};

use crate::connection::{ConnectionParams, handle_connection};
use crate::constants::*;
use crate::registry::ConnectionRegistry;

/// Relay settings shared by every connection
#[derive(Debug, Clone, Copy)]
pub struct RelayConfig {
    /// Time allowed for the identity handshake; `None` waits forever
    pub handshake_timeout: Option<Duration>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Some(Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS)),
        }
    }
}

/// Accept connections forever, handling each on its own task
///
/// Accept errors and per-connection errors are logged; neither stops the loop.
pub async fn serve(listener: TcpListener, registry: ConnectionRegistry, config: RelayConfig) {
    loop {
        match listener.accept().await {
            Ok((socket, peer_addr)) => {
                debug!(%peer_addr, "{}", MSG_ACCEPTED);
                if let Err(e) = socket.set_nodelay(true) {
                    debug!(%peer_addr, error = %e, "Failed to set TCP_NODELAY");
                }

                let params = ConnectionParams {
                    peer_addr,
                    registry: registry.clone(),
                    handshake_timeout: config.handshake_timeout,
                };

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(socket, params).await {
                        log_connection_error(&e, peer_addr);
                    }
                });
            }
            Err(e) => {
                error!("{}{}", ERR_ACCEPT, e);
            }
        }
    }
}

/// Log a connection error at a level matching how interesting it is
fn log_connection_error(error: &io::Error, peer_addr: SocketAddr) {
    match error.kind() {
        // Peers vanishing mid-stream is routine
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => {
            debug!(%peer_addr, error = %error, "{}", ERR_CONNECTION);
        }
        _ => {
            warn!(%peer_addr, error = %error, "{}", ERR_CONNECTION);
        }
    }
}
