// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook policies wired into transition jobs

use async_trait::async_trait;
use berth_core::{
    AttemptError, HookError, JobHooks, Node, NodeManager, NodeStore, NodeUpdate,
};

/// State-only advancement: the pass commits the transition and nothing
/// else. No node-manager call is made, so an unreachable node cannot
/// hold up its own bookkeeping.
pub struct AdvancePolicy;

#[async_trait]
impl JobHooks for AdvancePolicy {
    async fn process(&self, _node: &Node) -> Result<(), HookError> {
        Ok(())
    }
}

/// Sweep the node's dirty vessels before it advances
///
/// Each dirty vessel is reset remotely, its ports are returned to the
/// pool, and its release cycle is recorded. A node whose sweep fails
/// is marked broken so an operator looks at it instead of the job
/// retrying it forever.
pub struct ResetVesselsPolicy<S: NodeStore, M: NodeManager> {
    store: S,
    manager: M,
}

impl<S: NodeStore, M: NodeManager> ResetVesselsPolicy<S, M> {
    pub fn new(store: S, manager: M) -> Self {
        Self { store, manager }
    }
}

#[async_trait]
impl<S: NodeStore, M: NodeManager> JobHooks for ResetVesselsPolicy<S, M> {
    async fn process(&self, node: &Node) -> Result<(), HookError> {
        let vessels = self.store.get_vessels_on_node(&node.id).await?;
        for vessel in vessels.into_iter().filter(|v| v.is_dirty) {
            self.manager
                .invoke(node, "ResetVessel", &[vessel.name.clone()])
                .await?;
            self.store.set_vessel_ports(&vessel, Vec::new()).await?;
            self.store.record_released_vessel(&vessel).await?;
        }
        Ok(())
    }

    async fn on_error(&self, node: &Node, error: &AttemptError) {
        tracing::warn!(node = %node.id, %error, "sweep failed, marking node broken");
        let update = NodeUpdate {
            is_broken: Some(true),
            ..Default::default()
        };
        if let Err(e) = self.store.update_node(&node.id, update).await {
            tracing::warn!(node = %node.id, error = %e, "failed to mark node broken");
        }
    }
}

#[cfg(test)]
#[path = "policies_tests.rs"]
mod tests;
