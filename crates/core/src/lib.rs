//! berth-core: Core library for the Berth fleet coordinator
//!
//! This crate provides:
//! - The fleet data model (nodes, vessels, lifecycle states)
//! - The lock coordination service (sessions, exclusive named locks)
//! - A bounded-concurrency worker pool with per-target failure isolation
//! - The node state transition engine
//! - Collaborator traits for the node store and remote node managers,
//!   with fakes for testing

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod id;

pub mod engine;
pub mod fleet;
pub mod locking;
pub mod pool;
pub mod remote;
pub mod store;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use engine::{
    AttemptError, HookError, JobHooks, JobRunner, PassError, PassReport, TransitionJob,
};
pub use fleet::{Node, NodeId, NodeState, NodeUpdate, Vessel};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use locking::{
    LockCategory, LockClient, LockClientError, LockError, LockService, SessionHandle,
};
pub use pool::{run_pool, PassOutcome, PoolError};
pub use remote::{FakeNodeManager, NodeManager, RemoteError};
pub use store::{MemoryNodeStore, NodeStore, StoreError};
