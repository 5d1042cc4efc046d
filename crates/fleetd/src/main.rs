// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Berth fleet daemon (berth-fleetd)
//!
//! Runs the configured transition jobs against the fleet, taking locks
//! from berth-lockd and persisting node state in the JSON store.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod policies;
mod remote;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use berth_core::{JobHooks, JobRunner};
use berth_lockd::RemoteLockClient;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinSet;
use tracing::info;

use crate::config::PolicyKind;

const DEFAULT_CONFIG_PATH: &str = "/etc/berth/fleetd.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments: [config_path]
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = config::load(&config_path)?;

    // Set up logging
    let _log_guard = setup_logging(&config)?;

    info!(
        "Starting berth-fleetd with {} jobs from {}",
        config.jobs.len(),
        config_path.display()
    );

    let store = store::JsonNodeStore::open(&config.store_path)?;
    let locks = RemoteLockClient::new(config.lockd_addr.clone());
    // Fail fast if the lock daemon is unreachable
    locks.ping().await?;
    let manager = remote::CommandNodeManager::new(config.node_manager_command.clone());

    let mut jobs = JoinSet::new();
    for entry in &config.jobs {
        let job = entry.to_job();
        let hooks: Arc<dyn JobHooks> = match entry.policy {
            PolicyKind::Advance => Arc::new(policies::AdvancePolicy),
            PolicyKind::ResetVessels => Arc::new(policies::ResetVesselsPolicy::new(
                store.clone(),
                manager.clone(),
            )),
        };
        let runner = JobRunner::new(job, store.clone(), locks.clone(), hooks);
        jobs.spawn(async move { runner.run().await });
    }

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Daemon ready");

    // Signal ready for parent process (e.g., systemd, a test harness)
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    // Jobs hold no locks between attempts; aborting between passes is safe
    jobs.shutdown().await;

    info!("Daemon stopped");
    Ok(())
}

fn setup_logging(
    config: &config::FleetdConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_path) = &config.log_path else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    // Create log directory if needed
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        log_path.parent().unwrap_or_else(|| std::path::Path::new(".")),
        log_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("fleetd.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
