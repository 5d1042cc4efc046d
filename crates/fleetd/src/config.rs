// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet daemon configuration (TOML)

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use berth_core::{NodeState, TransitionJob};
use serde::Deserialize;
use thiserror::Error;

/// Top-level fleetd configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetdConfig {
    /// Address of the lock daemon, host:port
    pub lockd_addr: String,
    /// Root directory of the JSON node/vessel store
    pub store_path: PathBuf,
    /// Program invoked for signed node-manager calls
    pub node_manager_command: String,
    /// Log file; stderr when unset
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobEntry>,
}

/// One `[[job]]` block
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobEntry {
    pub name: String,
    pub from: NodeState,
    pub to: NodeState,
    #[serde(default)]
    pub mark_active: bool,
    #[serde(default)]
    pub include_broken: bool,
    #[serde(default = "default_parallel_instances")]
    pub parallel_instances: usize,
    #[serde(with = "humantime_serde", default = "default_sleeptime")]
    pub sleeptime: Duration,
    pub policy: PolicyKind,
}

fn default_parallel_instances() -> usize {
    4
}

fn default_sleeptime() -> Duration {
    Duration::from_secs(30)
}

/// Which hook policy drives the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// State-only advance, no remote work
    Advance,
    /// Sweep and reset dirty vessels before advancing
    ResetVessels,
}

impl JobEntry {
    pub fn to_job(&self) -> TransitionJob {
        TransitionJob::new(self.name.clone(), self.from, self.to)
            .with_mark_active(self.mark_active)
            .with_include_broken(self.include_broken)
            .with_concurrency(self.parallel_instances)
            .with_sleeptime(self.sleeptime)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load and validate a configuration file
pub fn load(path: &Path) -> Result<FleetdConfig, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    let config: FleetdConfig = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &FleetdConfig) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for job in &config.jobs {
        if !names.insert(job.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate job name: {}",
                job.name
            )));
        }
        if job.from == job.to {
            return Err(ConfigError::Invalid(format!(
                "job {} transitions {} to itself",
                job.name, job.from
            )));
        }
        if job.parallel_instances == 0 {
            return Err(ConfigError::Invalid(format!(
                "job {} needs parallel_instances of at least 1",
                job.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
