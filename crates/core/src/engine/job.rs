// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transition job configuration and policy hooks

use crate::fleet::{Node, NodeState};
use crate::locking::LockClientError;
use crate::remote::RemoteError;
use crate::store::StoreError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Configuration of one named transition job, immutable once running
#[derive(Clone, Debug)]
pub struct TransitionJob {
    /// Name used in logs and configuration
    pub name: String,
    /// Scan for nodes in this state
    pub from: NodeState,
    /// Commit them to this state on success
    pub to: NodeState,
    /// Also flip `is_active` to true when committing
    pub mark_active: bool,
    /// Include nodes flagged broken in the scan (recovery jobs only)
    pub include_broken: bool,
    /// Worker pool size for this job
    pub concurrency: usize,
    /// Pause between scan passes
    pub sleeptime: Duration,
}

impl TransitionJob {
    pub fn new(name: impl Into<String>, from: NodeState, to: NodeState) -> Self {
        Self {
            name: name.into(),
            from,
            to,
            mark_active: false,
            include_broken: false,
            concurrency: 4,
            sleeptime: Duration::from_secs(30),
        }
    }

    pub fn with_mark_active(mut self, mark_active: bool) -> Self {
        self.mark_active = mark_active;
        self
    }

    pub fn with_include_broken(mut self, include_broken: bool) -> Self {
        self.include_broken = include_broken;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_sleeptime(mut self, sleeptime: Duration) -> Self {
        self.sleeptime = sleeptime;
        self
    }
}

/// Failure inside a policy hook
#[derive(Debug, Error)]
pub enum HookError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

/// Why one node's transition attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("lock acquisition failed: {0}")]
    Lock(#[from] LockClientError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("commit failed: {0}")]
    Commit(#[from] StoreError),
}

/// Per-job policy hooks
///
/// `process` is the opaque state-changing operation and runs while the
/// node's lock is held; it may call out to the remote node manager or
/// the store and may fail with any error. `update` runs after a
/// successful `process`, still under the lock, to persist auxiliary
/// per-node metadata. `on_error` runs after the lock is released; it
/// may mutate node state (mark broken, say) but the engine enforces no
/// postcondition on it, and it has no failure channel: implementations
/// log their own problems.
#[async_trait]
pub trait JobHooks: Send + Sync + 'static {
    async fn process(&self, node: &Node) -> Result<(), HookError>;

    async fn update(&self, _node: &Node) -> Result<(), HookError> {
        Ok(())
    }

    async fn on_error(&self, node: &Node, error: &AttemptError) {
        tracing::warn!(node = %node.id, %error, "no error policy configured");
    }
}
