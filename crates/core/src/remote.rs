// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote node-manager invocation trait
//!
//! A node manager call is signed with the node owner's private key;
//! the key store and signing protocol live entirely behind the
//! implementation. The engine treats every failure the same way: an
//! error surfaced to the attempt that made the call.

use crate::fleet::Node;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Failures from a remote node-manager call
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("network error contacting {address}: {message}")]
    Network { address: String, message: String },

    #[error("authorization rejected by {node}: {message}")]
    Authorization { node: String, message: String },

    #[error("unexpected remote state on {node}: {message}")]
    RemoteState { node: String, message: String },
}

/// Signed calls to the node manager running on a node
#[async_trait]
pub trait NodeManager: Clone + Send + Sync + 'static {
    /// Invoke an operation on the node, returning its raw response
    async fn invoke(
        &self,
        node: &Node,
        operation: &str,
        args: &[String],
    ) -> Result<String, RemoteError>;
}

#[derive(Default)]
struct FakeRemoteState {
    calls: Vec<(String, String, Vec<String>)>,
    failures: HashMap<String, RemoteError>,
}

/// Fake node manager with call recording and scriptable failures
#[derive(Clone, Default)]
pub struct FakeNodeManager {
    state: Arc<Mutex<FakeRemoteState>>,
}

impl FakeNodeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded calls as (node id, operation, args)
    pub fn calls(&self) -> Vec<(String, String, Vec<String>)> {
        self.lock_state().calls.clone()
    }

    /// Make every invocation against the given node fail
    pub fn fail_node(&self, node_id: impl Into<String>, error: RemoteError) {
        self.lock_state().failures.insert(node_id.into(), error);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, FakeRemoteState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NodeManager for FakeNodeManager {
    async fn invoke(
        &self,
        node: &Node,
        operation: &str,
        args: &[String],
    ) -> Result<String, RemoteError> {
        let mut state = self.lock_state();
        state
            .calls
            .push((node.id.to_string(), operation.to_string(), args.to_vec()));
        if let Some(error) = state.failures.get(&node.id.to_string()) {
            return Err(error.clone());
        }
        Ok(String::new())
    }
}
