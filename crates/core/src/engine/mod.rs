// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node state transition engine
//!
//! A transition job perpetually scans the fleet for nodes in its
//! source state and drives each one, through the worker pool and under
//! that node's lock, to its destination state.

mod job;
mod runner;

pub use job::{AttemptError, HookError, JobHooks, TransitionJob};
pub use runner::{JobRunner, PassError, PassReport};
