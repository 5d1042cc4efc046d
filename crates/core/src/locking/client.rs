// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client trait for reaching a lock coordination service
//!
//! The transition engine and the backend orchestrator depend on this
//! trait, not on [`LockService`] directly, so the same code runs
//! against an embedded service, the lockd wire client, or a stub.

use super::service::{LockError, LockService, SessionHandle};
use super::table::LockCategory;
use crate::id::IdGen;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from a lock client
///
/// Service-side protocol errors keep their type; transport failures
/// (only possible for remote clients) are reported separately so
/// callers can tell a caller bug from an unreachable service.
#[derive(Debug, Error)]
pub enum LockClientError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("lock service unreachable: {0}")]
    Transport(String),
}

/// Access to a lock coordination service
#[async_trait]
pub trait LockClient: Clone + Send + Sync + 'static {
    /// Allocate a fresh session with an empty batch
    async fn create_session(&self) -> Result<SessionHandle, LockClientError>;

    /// Acquire all named resources as one unit, blocking until every
    /// name is simultaneously free
    async fn acquire(
        &self,
        handle: &SessionHandle,
        names: &[(LockCategory, String)],
    ) -> Result<(), LockClientError>;

    /// Release the session's held batch
    async fn release(&self, handle: &SessionHandle) -> Result<(), LockClientError>;

    /// Invalidate the handle, releasing anything it holds
    async fn destroy_session(&self, handle: &SessionHandle) -> Result<(), LockClientError>;
}

#[async_trait]
impl<G: IdGen + 'static> LockClient for LockService<G> {
    async fn create_session(&self) -> Result<SessionHandle, LockClientError> {
        Ok(LockService::create_session(self))
    }

    async fn acquire(
        &self,
        handle: &SessionHandle,
        names: &[(LockCategory, String)],
    ) -> Result<(), LockClientError> {
        LockService::acquire(self, handle, names).await?;
        Ok(())
    }

    async fn release(&self, handle: &SessionHandle) -> Result<(), LockClientError> {
        LockService::release(self, handle)?;
        Ok(())
    }

    async fn destroy_session(&self, handle: &SessionHandle) -> Result<(), LockClientError> {
        LockService::destroy_session(self, handle)?;
        Ok(())
    }
}
