// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP server and connection handling.

use std::sync::Arc;
use std::time::Instant;

use berth_core::{LockError, LockService, SessionHandle};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::protocol::{self, ErrorKind, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Shared state handed to every connection task
#[derive(Clone)]
pub struct ServerContext {
    pub service: LockService,
    /// Whether the administrative Reset request is honored
    pub allow_reset: bool,
    /// Signalled when a Shutdown request arrives
    pub shutdown: Arc<Notify>,
    pub start_time: Instant,
}

impl ServerContext {
    pub fn new(service: LockService, allow_reset: bool) -> Self {
        Self {
            service,
            allow_reset,
            shutdown: Arc::new(Notify::new()),
            start_time: Instant::now(),
        }
    }
}

/// Accept loop: one task per connection, until shutdown is signalled
///
/// Connections must be handled concurrently: an Acquire blocks inside
/// the service until another connection releases the names it wants.
pub async fn serve(listener: &TcpListener, ctx: ServerContext) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        debug!(%peer, "connection accepted");
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(ctx, stream).await {
                                error!("Error handling connection: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }
            _ = ctx.shutdown.notified() => {
                info!("Shutdown requested, closing listener");
                break;
            }
        }
    }
}

/// Handle a single client connection (one request per connection)
pub async fn handle_connection(ctx: ServerContext, stream: TcpStream) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    let response = handle_request(&ctx, request).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
pub async fn handle_request(ctx: &ServerContext, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::CreateSession => {
            let handle = ctx.service.create_session();
            Response::Session {
                session: handle.0,
            }
        }

        Request::Acquire { session, names } => {
            let handle = SessionHandle::new(session);
            match ctx.service.acquire(&handle, &names).await {
                Ok(()) => Response::Ok,
                Err(e) => error_response(e),
            }
        }

        Request::Release { session } => {
            let handle = SessionHandle::new(session);
            match ctx.service.release(&handle) {
                Ok(()) => Response::Ok,
                Err(e) => error_response(e),
            }
        }

        Request::DestroySession { session } => {
            let handle = SessionHandle::new(session);
            match ctx.service.destroy_session(&handle) {
                Ok(()) => Response::Ok,
                Err(e) => error_response(e),
            }
        }

        Request::Reset => {
            if !ctx.allow_reset {
                return Response::Error {
                    kind: ErrorKind::InvalidRequest,
                    message: "reset is disabled; start the daemon with --allow-reset".to_string(),
                };
            }
            ctx.service.reset();
            Response::Ok
        }

        Request::Status => {
            let snapshot = ctx.service.snapshot();
            Response::Status {
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                held: snapshot.held.len(),
                sessions: snapshot.sessions,
            }
        }

        Request::Shutdown => {
            ctx.shutdown.notify_waiters();
            Response::ShuttingDown
        }
    }
}

fn error_response(error: LockError) -> Response {
    let kind = match error {
        LockError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        LockError::SessionExpired(_) => ErrorKind::SessionExpired,
    };
    Response::Error {
        kind,
        message: error.to_string(),
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
