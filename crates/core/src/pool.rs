// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-concurrency worker pool with per-target failure isolation
//!
//! Runs a function over a set of targets with at most `limit`
//! invocations in flight and waits for every target to be attempted.
//! One target's failure never aborts its siblings; a target whose task
//! dies without reporting (a panic, or runtime teardown) is recorded
//! as aborted so the caller can reconsider it later.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Partition of submitted targets after a pool run
#[derive(Debug)]
pub struct PassOutcome<T, R, E> {
    /// Targets whose function returned Ok, with the value
    pub succeeded: Vec<(T, R)>,
    /// Targets whose function returned Err, with the error
    pub failed: Vec<(T, E)>,
    /// Targets that were never attempted or never reported
    pub aborted: Vec<T>,
}

impl<T, R, E> Default for PassOutcome<T, R, E> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            aborted: Vec::new(),
        }
    }
}

impl<T, R, E> PassOutcome<T, R, E> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.aborted.len()
    }
}

/// Infrastructure failure of the pool itself, distinct from any
/// per-target failure. Aborts the caller's whole pass.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool requires a concurrency limit of at least 1")]
    InvalidLimit,
}

/// Run `work` over every target with at most `limit` in flight
///
/// Blocks until every target has been attempted. Per-target errors are
/// collected under `failed`; a task that dies without producing a
/// result lands its target under `aborted` (logged), and the remaining
/// targets still run.
pub async fn run_pool<T, R, E, F, Fut>(
    targets: Vec<T>,
    limit: usize,
    work: F,
) -> Result<PassOutcome<T, R, E>, PoolError>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    if limit == 0 {
        return Err(PoolError::InvalidLimit);
    }

    let gate = Arc::new(Semaphore::new(limit));
    let work = Arc::new(work);
    let mut tasks = JoinSet::new();

    for (index, target) in targets.iter().cloned().enumerate() {
        let gate = Arc::clone(&gate);
        let work = Arc::clone(&work);
        tasks.spawn(async move {
            // The gate is never closed, so acquire only fails if the
            // semaphore is dropped out from under us; report that as
            // not-attempted rather than panicking.
            match gate.acquire_owned().await {
                Ok(_permit) => (index, Some(work(target).await)),
                Err(_) => (index, None),
            }
        });
    }

    let mut slots: Vec<Option<Result<R, E>>> = Vec::new();
    slots.resize_with(targets.len(), || None);

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Some(result))) => slots[index] = Some(result),
            Ok((_, None)) => {}
            Err(join_error) => {
                // The worker died (panicked or was cancelled); its
                // target stays unreported and ends up aborted.
                tracing::warn!(error = %join_error, "pool worker died without reporting");
            }
        }
    }

    let mut outcome = PassOutcome::default();
    for (target, slot) in targets.into_iter().zip(slots) {
        match slot {
            Some(Ok(value)) => outcome.succeeded.push((target, value)),
            Some(Err(error)) => outcome.failed.push((target, error)),
            None => outcome.aborted.push(target),
        }
    }
    Ok(outcome)
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
