// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy tests against the in-memory fakes

use super::*;
use berth_core::{
    FakeNodeManager, LockService, JobRunner, MemoryNodeStore, NodeId, NodeState, RemoteError,
    TransitionJob, Vessel,
};
use std::sync::Arc;

fn dirty_vessel(name: &str, node: &str) -> Vessel {
    let mut vessel = Vessel::new(name, NodeId::new(node));
    vessel.is_dirty = true;
    vessel.ports = vec![63100];
    vessel
}

#[tokio::test]
async fn advance_is_state_only_and_commits_without_remote_work() {
    let store = MemoryNodeStore::new();
    store.insert_node(Node::new("n-1", "a:1224"));

    // No node manager is wired in at all; the pass must still commit.
    let job = TransitionJob::new("activate", NodeState::AcceptDonation, NodeState::Canonical)
        .with_mark_active(true);
    let runner = JobRunner::new(job, store.clone(), LockService::new(), Arc::new(AdvancePolicy));

    let report = runner.run_pass().await.unwrap();
    assert_eq!(report.succeeded, vec![NodeId::new("n-1")]);

    let node = store.node(&NodeId::new("n-1")).unwrap();
    assert_eq!(node.state, NodeState::Canonical);
    assert!(node.is_active);
}

#[tokio::test]
async fn sweep_resets_only_dirty_vessels() {
    let store = MemoryNodeStore::new();
    let manager = FakeNodeManager::new();
    store.insert_vessel(dirty_vessel("v1", "n-1"));
    store.insert_vessel(Vessel::new("v2", NodeId::new("n-1")));
    store.insert_vessel(dirty_vessel("v3", "n-2"));

    let policy = ResetVesselsPolicy::new(store.clone(), manager.clone());
    policy.process(&Node::new("n-1", "a:1224")).await.unwrap();

    let calls = manager.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "ResetVessel");
    assert_eq!(calls[0].2, vec!["v1".to_string()]);

    let swept = store.vessel("v1").unwrap();
    assert!(!swept.is_dirty);
    assert!(swept.ports.is_empty());
    // The other node's vessel is untouched
    assert!(store.vessel("v3").unwrap().is_dirty);
}

#[tokio::test]
async fn failed_sweep_surfaces_the_remote_error() {
    let store = MemoryNodeStore::new();
    let manager = FakeNodeManager::new();
    store.insert_vessel(dirty_vessel("v1", "n-1"));
    manager.fail_node(
        "n-1",
        RemoteError::Network {
            address: "a:1224".to_string(),
            message: "connection refused".to_string(),
        },
    );

    let policy = ResetVesselsPolicy::new(store.clone(), manager);
    let err = policy
        .process(&Node::new("n-1", "a:1224"))
        .await
        .unwrap_err();
    assert!(matches!(err, HookError::Remote(RemoteError::Network { .. })));
    // Nothing was recorded as released
    assert!(store.vessel("v1").unwrap().is_dirty);
}

#[tokio::test]
async fn failed_node_is_marked_broken_and_left_behind_by_the_job() {
    let store = MemoryNodeStore::new();
    let manager = FakeNodeManager::new();
    store.insert_node(Node::new("n-1", "a:1224").with_state(NodeState::Canonical));
    store.insert_node(Node::new("n-2", "b:1224").with_state(NodeState::Canonical));
    store.insert_vessel(dirty_vessel("v1", "n-1"));
    store.insert_vessel(dirty_vessel("v2", "n-2"));
    manager.fail_node(
        "n-2",
        RemoteError::RemoteState {
            node: "n-2".to_string(),
            message: "vessel busy".to_string(),
        },
    );

    let policy = Arc::new(ResetVesselsPolicy::new(store.clone(), manager));
    let job = TransitionJob::new(
        "cleanup",
        NodeState::Canonical,
        NodeState::OnePercentManyEvents,
    );
    let runner = JobRunner::new(job, store.clone(), LockService::new(), policy);

    let report = runner.run_pass().await.unwrap();
    assert_eq!(report.succeeded, vec![NodeId::new("n-1")]);
    assert_eq!(report.failed, vec![NodeId::new("n-2")]);

    let healthy = store.node(&NodeId::new("n-1")).unwrap();
    assert_eq!(healthy.state, NodeState::OnePercentManyEvents);
    assert!(!healthy.is_broken);

    let broken = store.node(&NodeId::new("n-2")).unwrap();
    assert_eq!(broken.state, NodeState::Canonical);
    assert!(broken.is_broken);
}
