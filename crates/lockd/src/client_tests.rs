// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end client tests against a served daemon on an ephemeral port

use super::*;
use crate::server::{serve, ServerContext};
use berth_core::LockService;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

async fn start_server(allow_reset: bool) -> (RemoteLockClient, LockService, Arc<Notify>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let service = LockService::new();
    let ctx = ServerContext::new(service.clone(), allow_reset);
    let shutdown = Arc::clone(&ctx.shutdown);
    tokio::spawn(async move { serve(&listener, ctx).await });
    (RemoteLockClient::new(addr), service, shutdown)
}

#[tokio::test]
async fn session_lifecycle_over_the_wire() {
    let (client, service, _shutdown) = start_server(false).await;

    let session = client.create_session().await.unwrap();
    client
        .acquire(&session, &[(LockCategory::User, "alice".to_string())])
        .await
        .unwrap();
    assert_eq!(service.snapshot().held.len(), 1);

    // A second acquire while holding a batch is a caller bug
    let err = client
        .acquire(&session, &[(LockCategory::User, "bob".to_string())])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LockClientError::Lock(LockError::InvalidRequest(_))
    ));

    client.release(&session).await.unwrap();
    client.destroy_session(&session).await.unwrap();

    let err = client.release(&session).await.unwrap_err();
    assert!(matches!(
        err,
        LockClientError::Lock(LockError::SessionExpired(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocked_acquire_completes_after_remote_release() {
    let (client, _service, _shutdown) = start_server(false).await;

    let holder = client.create_session().await.unwrap();
    client
        .acquire(&holder, &[(LockCategory::Node, "n-1".to_string())])
        .await
        .unwrap();

    let waiter_client = client.clone();
    let waiter = tokio::spawn(async move {
        let session = waiter_client.create_session().await.unwrap();
        waiter_client
            .acquire(&session, &[(LockCategory::Node, "n-1".to_string())])
            .await
            .unwrap();
        session
    });

    // The waiter stays blocked while the name is held
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    client.release(&holder).await.unwrap();
    let session = waiter.await.unwrap();
    client.destroy_session(&session).await.unwrap();
}

#[tokio::test]
async fn reset_is_refused_unless_enabled() {
    let (client, _service, _shutdown) = start_server(false).await;
    let err = client.reset().await.unwrap_err();
    assert!(matches!(
        err,
        LockClientError::Lock(LockError::InvalidRequest(_))
    ));

    let (client, service, _shutdown) = start_server(true).await;
    let session = client.create_session().await.unwrap();
    client
        .acquire(&session, &[(LockCategory::Node, "n-1".to_string())])
        .await
        .unwrap();

    client.reset().await.unwrap();
    let snapshot = service.snapshot();
    assert!(snapshot.held.is_empty());
    assert_eq!(snapshot.sessions, 0);
}

#[tokio::test]
async fn ping_and_status_report_daemon_health() {
    let (client, _service, _shutdown) = start_server(false).await;

    client.ping().await.unwrap();

    let session = client.create_session().await.unwrap();
    client
        .acquire(
            &session,
            &[
                (LockCategory::Node, "n-1".to_string()),
                (LockCategory::Node, "n-2".to_string()),
            ],
        )
        .await
        .unwrap();

    let (_uptime, held, sessions) = client.status().await.unwrap();
    assert_eq!(held, 2);
    assert_eq!(sessions, 1);
}

#[tokio::test]
async fn shutdown_stops_the_accept_loop() {
    let (client, _service, shutdown) = start_server(false).await;

    let notified = tokio::spawn(async move { shutdown.notified().await });
    tokio::task::yield_now().await;

    client.shutdown().await.unwrap();
    notified.await.unwrap();
}

#[tokio::test]
async fn unreachable_daemon_is_a_transport_error() {
    // Port from the ephemeral range with nothing listening
    let client = RemoteLockClient::new("127.0.0.1:1");
    let err = client.create_session().await.unwrap_err();
    assert!(matches!(err, LockClientError::Transport(_)));
}
