//! Behavioral specifications for the Berth coordination stack.
//!
//! Scenario tests spanning the lock service, the worker pool, and the
//! transition engine, including one run over the lockd wire protocol.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/jobs.rs"]
mod jobs;
#[path = "specs/locks.rs"]
mod locks;
#[path = "specs/wire.rs"]
mod wire;
