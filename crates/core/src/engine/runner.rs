// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scan-pass loop that drives a transition job

use super::job::{AttemptError, JobHooks, TransitionJob};
use crate::clock::{Clock, SystemClock};
use crate::fleet::{Node, NodeId, NodeUpdate};
use crate::locking::{LockCategory, LockClient, SessionHandle};
use crate::pool::{run_pool, PoolError};
use crate::store::{NodeStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Per-node outcome of one scan pass
#[derive(Debug, Default)]
pub struct PassReport {
    pub succeeded: Vec<NodeId>,
    pub failed: Vec<NodeId>,
    pub aborted: Vec<NodeId>,
    pub elapsed: Duration,
}

impl PassReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.aborted.len()
    }
}

/// Infrastructure failure that abandons a whole pass before any node
/// was touched
#[derive(Debug, Error)]
pub enum PassError {
    #[error("fleet query failed: {0}")]
    Query(#[from] StoreError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Runs one transition job against the fleet
///
/// Each pass queries the store for nodes in the job's source state and
/// pushes every candidate through the worker pool. Per node: create a
/// session, take the node's lock, run the hooks, commit the new state,
/// release, destroy the session. One node's failure never disturbs its
/// siblings; a failed node stays in the source state and is picked up
/// again on a later pass.
pub struct JobRunner<S: NodeStore, L: LockClient, C: Clock = SystemClock> {
    job: TransitionJob,
    store: S,
    locks: L,
    hooks: Arc<dyn JobHooks>,
    clock: C,
}

impl<S: NodeStore, L: LockClient> JobRunner<S, L> {
    pub fn new(job: TransitionJob, store: S, locks: L, hooks: Arc<dyn JobHooks>) -> Self {
        Self {
            job,
            store,
            locks,
            hooks,
            clock: SystemClock,
        }
    }
}

impl<S: NodeStore, L: LockClient, C: Clock> JobRunner<S, L, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> JobRunner<S, L, C2> {
        JobRunner {
            job: self.job,
            store: self.store,
            locks: self.locks,
            hooks: self.hooks,
            clock,
        }
    }

    pub fn job(&self) -> &TransitionJob {
        &self.job
    }

    /// Run the job forever: scan, sleep, scan again
    ///
    /// A failed pass is logged and retried after the normal sleep; the
    /// loop never gives up.
    pub async fn run(&self) {
        tracing::info!(
            job = %self.job.name,
            from = %self.job.from,
            to = %self.job.to,
            concurrency = self.job.concurrency,
            "transition job started"
        );
        loop {
            match self.run_pass().await {
                Ok(report) if report.total() > 0 => {
                    tracing::info!(
                        job = %self.job.name,
                        succeeded = report.succeeded.len(),
                        failed = report.failed.len(),
                        aborted = report.aborted.len(),
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        "scan pass finished"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(job = %self.job.name, %error, "scan pass abandoned");
                }
            }
            tokio::time::sleep(self.job.sleeptime).await;
        }
    }

    /// Run a single scan pass to completion
    pub async fn run_pass(&self) -> Result<PassReport, PassError> {
        let started = self.clock.now();
        let mut candidates = self.store.get_nodes_in_state(self.job.from).await?;
        if !self.job.include_broken {
            candidates.retain(|node| !node.is_broken);
        }

        let store = self.store.clone();
        let locks = self.locks.clone();
        let job = self.job.clone();
        let hooks = Arc::clone(&self.hooks);
        let outcome = run_pool(candidates, self.job.concurrency, move |node: Node| {
            let store = store.clone();
            let locks = locks.clone();
            let job = job.clone();
            let hooks = Arc::clone(&hooks);
            async move { attempt(&store, &locks, &job, hooks.as_ref(), &node).await }
        })
        .await?;

        let mut report = PassReport::default();
        for (node, ()) in &outcome.succeeded {
            report.succeeded.push(node.id.clone());
        }
        for (node, error) in &outcome.failed {
            tracing::warn!(
                job = %self.job.name,
                node = %node.id,
                %error,
                "transition attempt failed; node stays in source state"
            );
            self.hooks.on_error(node, error).await;
            report.failed.push(node.id.clone());
        }
        for node in &outcome.aborted {
            tracing::warn!(job = %self.job.name, node = %node.id, "transition attempt never reported");
            report.aborted.push(node.id.clone());
        }
        report.elapsed = self.clock.now().duration_since(started);
        Ok(report)
    }
}

/// Drive one node through a full attempt inside its own session
async fn attempt<S: NodeStore, L: LockClient>(
    store: &S,
    locks: &L,
    job: &TransitionJob,
    hooks: &dyn JobHooks,
    node: &Node,
) -> Result<(), AttemptError> {
    let session = locks.create_session().await?;
    let result = attempt_in_session(store, locks, job, hooks, node, &session).await;
    // A session spans exactly one attempt; destroying it also frees
    // anything the attempt still holds.
    if let Err(error) = locks.destroy_session(&session).await {
        tracing::warn!(node = %node.id, %error, "failed to destroy lock session");
    }
    result
}

async fn attempt_in_session<S: NodeStore, L: LockClient>(
    store: &S,
    locks: &L,
    job: &TransitionJob,
    hooks: &dyn JobHooks,
    node: &Node,
    session: &SessionHandle,
) -> Result<(), AttemptError> {
    locks
        .acquire(session, &[(LockCategory::Node, node.id.to_string())])
        .await?;
    let result = process_and_commit(store, job, hooks, node).await;
    if let Err(error) = locks.release(session).await {
        tracing::warn!(node = %node.id, %error, "failed to release node lock");
    }
    result
}

/// Runs with the node lock held: hooks first, then the state commit
async fn process_and_commit<S: NodeStore>(
    store: &S,
    job: &TransitionJob,
    hooks: &dyn JobHooks,
    node: &Node,
) -> Result<(), AttemptError> {
    hooks.process(node).await?;
    hooks.update(node).await?;
    let update = NodeUpdate {
        state: Some(job.to),
        is_active: if job.mark_active { Some(true) } else { None },
        ..Default::default()
    };
    store.update_node(&node.id, update).await?;
    Ok(())
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
