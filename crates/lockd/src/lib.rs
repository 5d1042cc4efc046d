// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Berth lock daemon (berth-lockd)
//!
//! Serves the lock coordination service over TCP with a
//! length-prefixed JSON protocol. Each connection carries one request;
//! lock ownership is tied to the session handle, not the connection,
//! so a caller holds locks across as many connections as it likes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use client::RemoteLockClient;
pub use protocol::{ErrorKind, Request, Response};
