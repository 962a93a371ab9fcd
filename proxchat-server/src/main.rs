//! Proxchat relay server

mod args;

use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use args::Args;
use proxchat_common::logging::init_logging;
use proxchat_server::constants::*;
use proxchat_server::{ConnectionRegistry, RelayConfig, serve};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    info!("{}{}", MSG_BANNER, env!("CARGO_PKG_VERSION"));

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("{}{}: {}", ERR_BIND, addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("{}{}", MSG_LISTENING, addr);

    let config = RelayConfig {
        handshake_timeout: args.handshake_limit(),
    };
    match config.handshake_timeout {
        Some(limit) => info!("{}{:?}", MSG_HANDSHAKE_TIMEOUT, limit),
        None => info!("{}disabled", MSG_HANDSHAKE_TIMEOUT),
    }

    let registry = ConnectionRegistry::new();

    tokio::select! {
        result = setup_shutdown_signal() => {
            if let Err(e) = result {
                error!("{}{}", ERR_SIGNAL, e);
                return ExitCode::FAILURE;
            }
            info!("{}", MSG_SHUTDOWN_RECEIVED);
        }
        _ = serve(listener, registry, config) => {}
    }

    ExitCode::SUCCESS
}

/// Wait for SIGINT or SIGTERM (Ctrl+C elsewhere)
async fn setup_shutdown_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
