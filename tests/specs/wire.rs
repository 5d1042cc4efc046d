//! Lock scenarios over the lockd wire protocol

use berth_core::{LockCategory, LockClient, LockService};
use berth_lockd::server::{serve, ServerContext};
use berth_lockd::RemoteLockClient;
use std::time::Duration;
use tokio::net::TcpListener;

async fn start_daemon() -> RemoteLockClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let ctx = ServerContext::new(LockService::new(), false);
    tokio::spawn(async move { serve(&listener, ctx).await });
    RemoteLockClient::new(addr)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remote_waiter_blocks_until_the_holder_releases() {
    let client = start_daemon().await;

    let holder = client.create_session().await.unwrap();
    client
        .acquire(&holder, &[(LockCategory::Node, "123".to_string())])
        .await
        .unwrap();

    let waiter_client = client.clone();
    let task = tokio::spawn(async move {
        let waiter = waiter_client.create_session().await.unwrap();
        waiter_client
            .acquire(&waiter, &[(LockCategory::Node, "123".to_string())])
            .await
            .unwrap();
        waiter
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    client.release(&holder).await.unwrap();
    let waiter = task.await.unwrap();

    // Ownership transferred: one name held, two live sessions
    let (_uptime, held, sessions) = client.status().await.unwrap();
    assert_eq!(held, 1);
    assert_eq!(sessions, 2);

    client.destroy_session(&waiter).await.unwrap();
    let (_uptime, held, _sessions) = client.status().await.unwrap();
    assert_eq!(held, 0);
}
