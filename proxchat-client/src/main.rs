//! Proxchat client

mod args;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use args::Args;
use proxchat_client::audio::{CpalCapture, CpalPlayback, list_input_devices, list_output_devices};
use proxchat_client::commands::ControlCommand;
use proxchat_client::config::ClientConfig;
use proxchat_client::spatial::PositionBoard;
use proxchat_client::{ClientError, ClientSession, SessionEnd, SessionOptions};
use proxchat_common::Identity;
use proxchat_common::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    if args.list_devices {
        print_devices();
        return ExitCode::SUCCESS;
    }

    let mut config = match ClientConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    args.apply_to(&mut config);

    if args.save_config {
        match config.save(args.config.as_deref()) {
            Ok(path) => info!(path = %path.display(), "Settings saved"),
            Err(e) => warn!("{e}"),
        }
    }

    match run(config).await {
        Ok(SessionEnd::LocalShutdown) => ExitCode::SUCCESS,
        Ok(end) => {
            error!("{end}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn print_devices() {
    println!("Input devices:");
    for name in list_input_devices() {
        println!("  {name}");
    }
    println!("Output devices:");
    for name in list_output_devices() {
        println!("  {name}");
    }
}

/// Run one session until quit, a signal, or the connection ends
async fn run(config: ClientConfig) -> Result<SessionEnd, ClientError> {
    let capture = CpalCapture::open(&config.input_device)?;
    let playback = CpalPlayback::open(&config.output_device)?;
    let board = Arc::new(PositionBoard::new(config.arena()));

    let options = SessionOptions {
        server: config.server_addr(),
        identity: Identity::new(&config.identity),
        falloff: config.falloff,
    };
    let session =
        ClientSession::start(options, Box::new(capture), Box::new(playback), board).await?;
    println!(
        "Connected to {} as {}. Type 'help' for commands.",
        config.server_addr(),
        session.identity()
    );

    let shutdown = setup_shutdown_signal();
    tokio::pin!(shutdown);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("failed to listen for shutdown signal: {e}");
                }
                info!("Shutdown signal received");
                break;
            }
            _ = session.closed() => break,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match ControlCommand::parse(&line) {
                    Ok(Some(ControlCommand::Quit)) => break,
                    Ok(Some(command)) => println!("{}", command.apply(&session)),
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                },
                // Without a console, keep running until a signal arrives
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("failed to read console input: {e}");
                    stdin_open = false;
                }
            },
        }
    }

    let end = session.shutdown().await;
    println!("{end}");
    Ok(end)
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
