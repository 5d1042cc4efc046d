//! Lock coordination scenarios

use berth_core::{LockCategory, LockError, LockService};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn waiter_blocks_until_holder_releases_then_owns_the_name() {
    let service = LockService::new();
    let holder = service.create_session();
    service
        .acquire(&holder, &[(LockCategory::Node, "123".to_string())])
        .await
        .unwrap();

    let waiter = service.create_session();
    let task = {
        let service = service.clone();
        let waiter = waiter.clone();
        tokio::spawn(async move {
            service
                .acquire(&waiter, &[(LockCategory::Node, "123".to_string())])
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    service.release(&holder).unwrap();
    task.await.unwrap().unwrap();

    let snapshot = service.snapshot();
    assert_eq!(
        snapshot.held.get(&(LockCategory::Node, "123".to_string())),
        Some(&waiter.0)
    );
}

#[tokio::test]
async fn mixed_category_request_fails_and_leaves_the_session_empty() {
    let service = LockService::new();
    let session = service.create_session();

    let err = service
        .acquire(
            &session,
            &[
                (LockCategory::User, "bob".to_string()),
                (LockCategory::Node, "123".to_string()),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LockError::InvalidRequest(_)));
    assert!(service.held_batch(&session).is_none());
    assert!(service.snapshot().held.is_empty());
}

#[tokio::test]
async fn one_batch_at_a_time_until_released() {
    let service = LockService::new();
    let session = service.create_session();

    service
        .acquire(&session, &[(LockCategory::User, "bob".to_string())])
        .await
        .unwrap();

    let err = service
        .acquire(&session, &[(LockCategory::User, "alice".to_string())])
        .await
        .unwrap_err();
    assert!(matches!(err, LockError::InvalidRequest(_)));

    service.release(&session).unwrap();
    service
        .acquire(&session, &[(LockCategory::User, "alice".to_string())])
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn destroying_the_holder_frees_its_names_for_a_waiter() {
    let service = LockService::new();
    let holder = service.create_session();
    service
        .acquire(&holder, &[(LockCategory::Node, "123".to_string())])
        .await
        .unwrap();

    let waiter = service.create_session();
    let task = {
        let service = service.clone();
        let waiter = waiter.clone();
        tokio::spawn(async move {
            service
                .acquire(&waiter, &[(LockCategory::Node, "123".to_string())])
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    service.destroy_session(&holder).unwrap();
    task.await.unwrap().unwrap();
    assert_eq!(
        service.held_batch(&waiter).map(|(category, _)| category),
        Some(LockCategory::Node)
    );
}
