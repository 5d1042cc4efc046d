// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Berth lock daemon (berth-lockd)
//!
//! Background process serving the lock coordination service over TCP.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use berth_lockd::lifecycle::{self, Config, LifecycleError};
use berth_lockd::server;

/// Default listen address when none is given on the command line
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:63170";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments: [listen_addr] [--allow-reset]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let allow_reset = args.iter().any(|a| a == "--allow-reset");
    let listen_addr = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

    let runtime_dir = lifecycle::runtime_dir()?;
    let config = Config::new(listen_addr, &runtime_dir).with_allow_reset(allow_reset);

    // Set up logging
    let _log_guard = setup_logging(&config)?;

    info!("Starting berth-lockd on {}", config.listen_addr);

    // Start daemon
    let daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Daemon ready, listening on {}", config.listen_addr);

    // Signal ready for parent process (e.g., systemd, a test harness)
    println!("READY");

    let context = daemon.context.clone();
    tokio::select! {
        // Runs until a Shutdown request signals the accept loop
        () = server::serve(&daemon.listener, context) => {
            info!("Shutdown requested via IPC, shutting down...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    daemon.shutdown();

    info!("Daemon stopped");
    Ok(())
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Create log directory if needed
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Set up file appender
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoRuntimeDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoRuntimeDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
