// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock coordination: exclusive ownership of named resources
//!
//! The lock table is a pure map from (category, name) to owning
//! session; the service layers session lifecycle and the blocking
//! all-or-nothing acquire protocol on top of it. Callers reach the
//! service through the [`LockClient`] trait, either in-process or via
//! the lockd wire client.

mod client;
mod service;
mod table;

pub use client::{LockClient, LockClientError};
pub use service::{LockError, LockService, SessionHandle, TableSnapshot};
pub use table::{LockCategory, LockTable, ParseLockCategoryError};
