// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire client implementing [`LockClient`] against a running daemon

use std::time::Duration;

use async_trait::async_trait;
use berth_core::{LockCategory, LockClient, LockClientError, LockError, SessionHandle};
use tokio::net::TcpStream;

use crate::protocol::{self, ErrorKind, ProtocolError, Request, Response};

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for short requests (everything except Acquire reads)
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("BERTH_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Client for a berth-lockd daemon
///
/// Opens one connection per request; the session handle, not the
/// connection, carries lock ownership.
#[derive(Clone)]
pub struct RemoteLockClient {
    addr: String,
}

impl RemoteLockClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Send a request; `read_timeout: None` waits as long as it takes
    /// (an Acquire blocks until the names are free)
    async fn send(
        &self,
        request: Request,
        read_timeout: Option<Duration>,
    ) -> Result<Response, LockClientError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| LockClientError::Transport(e.to_string()))?;
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(&request).map_err(transport)?;
        tokio::time::timeout(timeout_ipc(), protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| transport(ProtocolError::Timeout))?
            .map_err(transport)?;

        let bytes = match read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, protocol::read_message(&mut reader))
                .await
                .map_err(|_| transport(ProtocolError::Timeout))?
                .map_err(transport)?,
            None => protocol::read_message(&mut reader).await.map_err(transport)?,
        };

        protocol::decode(&bytes).map_err(transport)
    }

    /// Check the daemon is alive
    pub async fn ping(&self) -> Result<(), LockClientError> {
        match self.send(Request::Ping, Some(timeout_ipc())).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Daemon uptime, held-name count, and live session count
    pub async fn status(&self) -> Result<(u64, usize, usize), LockClientError> {
        match self.send(Request::Status, Some(timeout_ipc())).await? {
            Response::Status {
                uptime_secs,
                held,
                sessions,
            } => Ok((uptime_secs, held, sessions)),
            Response::Error { kind, message } => Err(lock_error(kind, message)),
            other => Err(unexpected(other)),
        }
    }

    /// Clear every session and lock (refused unless the daemon was
    /// started with --allow-reset)
    pub async fn reset(&self) -> Result<(), LockClientError> {
        self.expect_ok(Request::Reset).await
    }

    /// Ask the daemon to stop accepting connections and exit
    pub async fn shutdown(&self) -> Result<(), LockClientError> {
        match self.send(Request::Shutdown, Some(timeout_ipc())).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            Response::Error { kind, message } => Err(lock_error(kind, message)),
            other => Err(unexpected(other)),
        }
    }

    async fn expect_ok(&self, request: Request) -> Result<(), LockClientError> {
        match self.send(request, Some(timeout_ipc())).await? {
            Response::Ok => Ok(()),
            Response::Error { kind, message } => Err(lock_error(kind, message)),
            other => Err(unexpected(other)),
        }
    }
}

#[async_trait]
impl LockClient for RemoteLockClient {
    async fn create_session(&self) -> Result<SessionHandle, LockClientError> {
        match self.send(Request::CreateSession, Some(timeout_ipc())).await? {
            Response::Session { session } => Ok(SessionHandle::new(session)),
            Response::Error { kind, message } => Err(lock_error(kind, message)),
            other => Err(unexpected(other)),
        }
    }

    async fn acquire(
        &self,
        handle: &SessionHandle,
        names: &[(LockCategory, String)],
    ) -> Result<(), LockClientError> {
        let request = Request::Acquire {
            session: handle.0.clone(),
            names: names.to_vec(),
        };
        // No read deadline: the daemon answers once the batch is granted
        match self.send(request, None).await? {
            Response::Ok => Ok(()),
            Response::Error { kind, message } => Err(lock_error(kind, message)),
            other => Err(unexpected(other)),
        }
    }

    async fn release(&self, handle: &SessionHandle) -> Result<(), LockClientError> {
        self.expect_ok(Request::Release {
            session: handle.0.clone(),
        })
        .await
    }

    async fn destroy_session(&self, handle: &SessionHandle) -> Result<(), LockClientError> {
        self.expect_ok(Request::DestroySession {
            session: handle.0.clone(),
        })
        .await
    }
}

fn transport(error: ProtocolError) -> LockClientError {
    LockClientError::Transport(error.to_string())
}

fn unexpected(response: Response) -> LockClientError {
    LockClientError::Transport(format!("unexpected response: {:?}", response))
}

/// Rebuild the service-side error from its wire form
fn lock_error(kind: ErrorKind, message: String) -> LockClientError {
    match kind {
        ErrorKind::InvalidRequest => LockError::InvalidRequest(message).into(),
        ErrorKind::SessionExpired => LockError::SessionExpired(message).into(),
        ErrorKind::Internal => LockClientError::Transport(message),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
