// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock coordination service: session lifecycle and the acquire/release protocol
//!
//! The service grants exclusive ownership of named resources to
//! sessions. Two rules make the protocol deadlock-free:
//!
//! - A session may hold at most one batch at a time and must release it
//!   before acquiring again, which removes circular wait between
//!   sessions each holding part of what the other wants.
//! - A batch is granted all-or-nothing: the caller blocks until every
//!   requested name is simultaneously free, so no two callers ever end
//!   up holding half of each other's request.
//!
//! All state lives behind one coarse mutex; waiters park on a
//! [`Notify`] and retry whenever a release frees names. Wakeup order
//! among waiters is unspecified.

use super::table::{LockCategory, LockTable};
use crate::id::{IdGen, UuidIdGen};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Notify;

/// Opaque handle through which a caller holds lock ownership
///
/// Unguessable in production (UUIDv4): possession of the handle is the
/// only proof of ownership the service checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(pub String);

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors returned to lock service callers
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LockError {
    /// Caller bug: mixed categories, empty request, acquiring while
    /// already holding a batch, or releasing with nothing held.
    /// Never retried automatically.
    #[error("invalid lock request: {0}")]
    InvalidRequest(String),

    /// Operation on a destroyed or unknown session handle
    #[error("unknown or destroyed session: {0}")]
    SessionExpired(String),
}

/// Read-only view of the service for status queries and test instrumentation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableSnapshot {
    /// Held names and their owning sessions
    pub held: BTreeMap<(LockCategory, String), String>,
    /// Number of live sessions
    pub sessions: usize,
}

/// A session's outstanding batch, if any. Always homogeneous in category.
type Batch = Option<(LockCategory, BTreeSet<String>)>;

struct ServiceState {
    table: LockTable,
    sessions: HashMap<SessionHandle, Batch>,
}

/// The lock coordination service
///
/// Cloneable handle over internally synchronized state; clones share
/// the same table and sessions. There is no global instance: embed one
/// in-process or serve it through lockd.
pub struct LockService<G: IdGen = UuidIdGen> {
    state: Arc<Mutex<ServiceState>>,
    /// Signalled whenever names are freed (release, destroy, reset)
    freed: Arc<Notify>,
    ids: G,
}

impl<G: IdGen> Clone for LockService<G> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            freed: Arc::clone(&self.freed),
            ids: self.ids.clone(),
        }
    }
}

impl LockService<UuidIdGen> {
    pub fn new() -> Self {
        Self::with_id_gen(UuidIdGen)
    }
}

impl Default for LockService<UuidIdGen> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: IdGen> LockService<G> {
    /// Create a service minting session handles with the given generator
    pub fn with_id_gen(ids: G) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServiceState {
                table: LockTable::new(),
                sessions: HashMap::new(),
            })),
            freed: Arc::new(Notify::new()),
            ids,
        }
    }

    /// Allocate a fresh session with an empty batch. Always succeeds.
    pub fn create_session(&self) -> SessionHandle {
        let handle = SessionHandle::new(self.ids.next());
        let mut state = self.lock_state();
        state.sessions.insert(handle.clone(), None);
        tracing::debug!(session = %handle, "session created");
        handle
    }

    /// Acquire ownership of every requested name, as a single unit
    ///
    /// Blocks until all names are simultaneously free. Fails fast with
    /// [`LockError::InvalidRequest`] if the request is empty, spans
    /// more than one category, or the session already holds a batch.
    pub async fn acquire(
        &self,
        handle: &SessionHandle,
        names: &[(LockCategory, String)],
    ) -> Result<(), LockError> {
        let (category, requested) = validate_batch(names)?;

        loop {
            // Register for wakeups before inspecting the table, so a
            // release between the check and the await is not missed.
            let freed = self.freed.notified();
            {
                let mut state = self.lock_state();
                match state.sessions.get(handle) {
                    None => return Err(LockError::SessionExpired(handle.0.clone())),
                    Some(Some(_)) => {
                        return Err(LockError::InvalidRequest(format!(
                            "session {} already holds a batch; release it before acquiring again",
                            handle
                        )))
                    }
                    Some(None) => {}
                }

                if state.table.grant(category, &requested, &handle.0) {
                    state
                        .sessions
                        .insert(handle.clone(), Some((category, requested.clone())));
                    tracing::debug!(
                        session = %handle,
                        %category,
                        count = requested.len(),
                        "batch acquired"
                    );
                    return Ok(());
                }

                tracing::trace!(session = %handle, %category, "names busy, waiting");
            }
            freed.await;
        }
    }

    /// Release the session's held batch and wake waiters
    pub fn release(&self, handle: &SessionHandle) -> Result<(), LockError> {
        {
            let mut state = self.lock_state();
            let Some(slot) = state.sessions.get_mut(handle) else {
                return Err(LockError::SessionExpired(handle.0.clone()));
            };
            match slot.take() {
                None => {
                    return Err(LockError::InvalidRequest(format!(
                        "session {} holds no batch",
                        handle
                    )))
                }
                Some((category, batch)) => {
                    let freed = state.table.release(category, &batch, &handle.0);
                    tracing::debug!(session = %handle, %category, freed, "batch released");
                }
            }
        }
        self.freed.notify_waiters();
        Ok(())
    }

    /// Invalidate the handle, releasing anything it holds
    ///
    /// Subsequent operations on the handle fail with
    /// [`LockError::SessionExpired`].
    pub fn destroy_session(&self, handle: &SessionHandle) -> Result<(), LockError> {
        {
            let mut state = self.lock_state();
            match state.sessions.remove(handle) {
                None => return Err(LockError::SessionExpired(handle.0.clone())),
                Some(batch) => {
                    if let Some((category, names)) = batch {
                        state.table.release(category, &names, &handle.0);
                    }
                    tracing::debug!(session = %handle, "session destroyed");
                }
            }
        }
        self.freed.notify_waiters();
        Ok(())
    }

    /// Clear the entire table and all sessions
    ///
    /// Administrative operation for test harnesses and bootstrap;
    /// lockd only exposes it behind an explicit flag.
    pub fn reset(&self) {
        {
            let mut state = self.lock_state();
            state.table.clear();
            state.sessions.clear();
        }
        self.freed.notify_waiters();
        tracing::info!("lock service reset: all sessions and locks cleared");
    }

    /// Read-only copy of the current table and session count
    pub fn snapshot(&self) -> TableSnapshot {
        let state = self.lock_state();
        TableSnapshot {
            held: state
                .table
                .entries()
                .map(|(key, holder)| (key.clone(), holder.clone()))
                .collect(),
            sessions: state.sessions.len(),
        }
    }

    /// The batch a session currently holds, if the session exists
    pub fn held_batch(&self, handle: &SessionHandle) -> Option<(LockCategory, BTreeSet<String>)> {
        let state = self.lock_state();
        state.sessions.get(handle).cloned().flatten()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Check the request is non-empty and homogeneous in category
fn validate_batch(
    names: &[(LockCategory, String)],
) -> Result<(LockCategory, BTreeSet<String>), LockError> {
    let Some((category, _)) = names.first() else {
        return Err(LockError::InvalidRequest(
            "lock request names no resources".to_string(),
        ));
    };
    let category = *category;

    let mut requested = BTreeSet::new();
    for (other, name) in names {
        if *other != category {
            return Err(LockError::InvalidRequest(format!(
                "lock request spans categories {} and {}; a request must target exactly one",
                category, other
            )));
        }
        requested.insert(name.clone());
    }
    Ok((category, requested))
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
