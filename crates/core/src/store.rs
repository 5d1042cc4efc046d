// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node/vessel persistence trait and the in-memory implementation
//!
//! The transition engine and the daemons consume this trait; the
//! storage engine behind it is someone else's problem. The in-memory
//! store doubles as the test fake, recording update calls so tests can
//! assert on commit behavior.

use crate::fleet::{Node, NodeId, NodeState, NodeUpdate, Vessel};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors from the node/vessel store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("does not exist: {kind}/{id}")]
    DoesNotExist { kind: String, id: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn missing_node(id: &NodeId) -> Self {
        StoreError::DoesNotExist {
            kind: "node".to_string(),
            id: id.to_string(),
        }
    }

    pub fn missing_vessel(name: &str) -> Self {
        StoreError::DoesNotExist {
            kind: "vessel".to_string(),
            id: name.to_string(),
        }
    }
}

/// Node/vessel persistence API
///
/// A node's state and active flag may only be written while the writer
/// holds that node's `node`-category lock; the store itself does not
/// enforce this, the callers' locking discipline does.
#[async_trait]
pub trait NodeStore: Clone + Send + Sync + 'static {
    /// All nodes currently in the given lifecycle state
    async fn get_nodes_in_state(&self, state: NodeState) -> Result<Vec<Node>, StoreError>;

    /// A single node by id
    async fn get_node(&self, id: &NodeId) -> Result<Node, StoreError>;

    /// Apply a partial update to a node as one unit
    async fn update_node(&self, id: &NodeId, update: NodeUpdate) -> Result<(), StoreError>;

    /// All vessels hosted on the given node
    async fn get_vessels_on_node(&self, id: &NodeId) -> Result<Vec<Vessel>, StoreError>;

    /// Replace a vessel's assigned ports
    async fn set_vessel_ports(&self, vessel: &Vessel, ports: Vec<u16>) -> Result<(), StoreError>;

    /// Record that a vessel finished its release cycle: the pending
    /// cleanup is done and the vessel is clean again
    async fn record_released_vessel(&self, vessel: &Vessel) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryState {
    nodes: BTreeMap<NodeId, Node>,
    vessels: BTreeMap<String, Vessel>,
    /// Update calls in the order they were committed
    updates: Vec<(NodeId, NodeUpdate)>,
    /// When set, the next query fails once (for self-heal tests)
    fail_next_query: bool,
}

/// In-memory node store, also the test fake
#[derive(Clone, Default)]
pub struct MemoryNodeStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&self, node: Node) {
        let mut state = self.lock_state();
        state.nodes.insert(node.id.clone(), node);
    }

    pub fn insert_vessel(&self, vessel: Vessel) {
        let mut state = self.lock_state();
        state.vessels.insert(vessel.name.clone(), vessel);
    }

    /// Direct read for assertions, bypassing the trait
    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.lock_state().nodes.get(id).cloned()
    }

    pub fn vessel(&self, name: &str) -> Option<Vessel> {
        self.lock_state().vessels.get(name).cloned()
    }

    /// Update calls committed so far, in order
    pub fn updates(&self) -> Vec<(NodeId, NodeUpdate)> {
        self.lock_state().updates.clone()
    }

    /// Make the next state query fail once
    pub fn fail_next_query(&self) {
        self.lock_state().fail_next_query = true;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn get_nodes_in_state(&self, state: NodeState) -> Result<Vec<Node>, StoreError> {
        let mut inner = self.lock_state();
        if inner.fail_next_query {
            inner.fail_next_query = false;
            return Err(StoreError::Unavailable("injected query failure".to_string()));
        }
        Ok(inner
            .nodes
            .values()
            .filter(|n| n.state == state)
            .cloned()
            .collect())
    }

    async fn get_node(&self, id: &NodeId) -> Result<Node, StoreError> {
        self.lock_state()
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::missing_node(id))
    }

    async fn update_node(&self, id: &NodeId, update: NodeUpdate) -> Result<(), StoreError> {
        let mut state = self.lock_state();
        let Some(node) = state.nodes.get_mut(id) else {
            return Err(StoreError::missing_node(id));
        };
        node.apply(&update, Utc::now());
        state.updates.push((id.clone(), update));
        Ok(())
    }

    async fn get_vessels_on_node(&self, id: &NodeId) -> Result<Vec<Vessel>, StoreError> {
        Ok(self
            .lock_state()
            .vessels
            .values()
            .filter(|v| &v.node_id == id)
            .cloned()
            .collect())
    }

    async fn set_vessel_ports(&self, vessel: &Vessel, ports: Vec<u16>) -> Result<(), StoreError> {
        let mut state = self.lock_state();
        let Some(stored) = state.vessels.get_mut(&vessel.name) else {
            return Err(StoreError::missing_vessel(&vessel.name));
        };
        stored.ports = ports;
        Ok(())
    }

    async fn record_released_vessel(&self, vessel: &Vessel) -> Result<(), StoreError> {
        let mut state = self.lock_state();
        let Some(stored) = state.vessels.get_mut(&vessel.name) else {
            return Err(StoreError::missing_vessel(&vessel.name));
        };
        stored.is_dirty = false;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
