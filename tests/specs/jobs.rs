//! Transition job scenarios

use async_trait::async_trait;
use berth_core::{
    AttemptError, HookError, JobHooks, JobRunner, LockService, MemoryNodeStore, Node, NodeId,
    NodeState, TransitionJob,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fails scripted nodes, counts error callbacks, and tracks how many
/// process calls run at once.
struct ScriptedHooks {
    fail: HashSet<NodeId>,
    errored: Mutex<Vec<NodeId>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedHooks {
    fn new(fail: &[&str]) -> Self {
        Self {
            fail: fail.iter().map(|id| NodeId::new(*id)).collect(),
            errored: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl JobHooks for ScriptedHooks {
    async fn process(&self, node: &Node) -> Result<(), HookError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        // Hold the slot long enough for siblings to overlap
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.contains(&node.id) {
            return Err(HookError::Other(format!("scripted failure for {}", node.id)));
        }
        Ok(())
    }

    async fn on_error(&self, node: &Node, _error: &AttemptError) {
        self.errored.lock().unwrap().push(node.id.clone());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_pass_over_ten_nodes_with_three_scripted_failures() {
    let store = MemoryNodeStore::new();
    for i in 0..10 {
        store.insert_node(Node::new(format!("n-{i}"), format!("h{i}:1224")));
    }
    let service = LockService::new();
    let hooks = Arc::new(ScriptedHooks::new(&["n-1", "n-4", "n-7"]));
    let job = TransitionJob::new("advance", NodeState::AcceptDonation, NodeState::Canonical)
        .with_concurrency(3);
    let runner = JobRunner::new(
        job,
        store.clone(),
        service.clone(),
        Arc::clone(&hooks) as Arc<dyn JobHooks>,
    );

    let report = runner.run_pass().await.unwrap();

    assert_eq!(report.succeeded.len(), 7);
    assert_eq!(report.failed.len(), 3);

    for i in 0..10 {
        let id = NodeId::new(format!("n-{i}"));
        let node = store.node(&id).unwrap();
        let expected = if [1, 4, 7].contains(&i) {
            NodeState::AcceptDonation
        } else {
            NodeState::Canonical
        };
        assert_eq!(node.state, expected, "node {}", id);
    }

    // ErrorFn fired exactly once per failed node
    let mut errored = hooks.errored.lock().unwrap().clone();
    errored.sort();
    assert_eq!(
        errored,
        vec![NodeId::new("n-1"), NodeId::new("n-4"), NodeId::new("n-7")]
    );

    // Never more than the configured concurrency in flight
    assert!(hooks.max_in_flight.load(Ordering::SeqCst) <= 3);

    // No sessions or locks leaked
    let snapshot = service.snapshot();
    assert!(snapshot.held.is_empty());
    assert_eq!(snapshot.sessions, 0);
}
