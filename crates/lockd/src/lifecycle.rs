// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::{Path, PathBuf};

use berth_core::LockService;
use fs2::FileExt;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::server::ServerContext;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the daemon listens on, host:port
    pub listen_addr: String,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Whether the administrative Reset request is honored
    pub allow_reset: bool,
}

impl Config {
    /// Create config with the daemon's files under `runtime_dir`
    pub fn new(listen_addr: impl Into<String>, runtime_dir: &Path) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            lock_path: runtime_dir.join("lockd.pid"),
            log_path: runtime_dir.join("lockd.log"),
            allow_reset: false,
        }
    }

    pub fn with_allow_reset(mut self, allow_reset: bool) -> Self {
        self.allow_reset = allow_reset;
        self
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// TCP listener, already bound
    pub listener: TcpListener,
    /// Shared state for connection tasks
    pub context: ServerContext,
}

impl std::fmt::Debug for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub fn shutdown(&self) {
        info!("Shutting down daemon...");

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),

    #[error("Could not determine runtime directory")]
    NoRuntimeDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create runtime directory (needed for the pid file and log)
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // 2. Acquire lock file FIRST - prevents races
    let lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Reborrow as immutable

    // 3. Bind the listener LAST - only after all validation passes
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.listen_addr.clone(), e))?;

    let context = ServerContext::new(LockService::new(), config.allow_reset);

    info!("Daemon started, listening on {}", config.listen_addr);

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        context,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Get the runtime directory for berth daemons
///
/// Uses XDG_STATE_HOME or defaults to ~/.local/state/berth. Can be
/// overridden with BERTH_RUNTIME_DIR for testing.
pub fn runtime_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("BERTH_RUNTIME_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("berth"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoRuntimeDir)?;
    Ok(PathBuf::from(home).join(".local/state/berth"))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
