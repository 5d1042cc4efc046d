// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool tests

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn all_targets_are_attempted_and_partitioned() {
    let outcome = run_pool(vec![1u32, 2, 3, 4, 5], 2, |n| async move {
        if n % 2 == 0 {
            Ok(n * 10)
        } else {
            Err(format!("odd: {}", n))
        }
    })
    .await
    .unwrap();

    assert_eq!(outcome.total(), 5);
    let mut succeeded = outcome.succeeded.clone();
    succeeded.sort();
    assert_eq!(succeeded, vec![(2, 20), (4, 40)]);
    assert_eq!(outcome.failed.len(), 3);
    assert!(outcome.aborted.is_empty());
}

#[tokio::test]
async fn one_failure_never_aborts_siblings() {
    let outcome = run_pool(vec!["a", "b", "c"], 1, |t| async move {
        if t == "b" {
            Err("boom")
        } else {
            Ok(t)
        }
    })
    .await
    .unwrap();

    assert_eq!(outcome.succeeded.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, "b");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_invocations_never_exceed_the_limit() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let observed_max = Arc::new(AtomicUsize::new(0));

    let outcome = {
        let in_flight = Arc::clone(&in_flight);
        let observed_max = Arc::clone(&observed_max);
        run_pool(
            (0..20).collect::<Vec<u32>>(),
            3,
            move |_n| {
                let in_flight = Arc::clone(&in_flight);
                let observed_max = Arc::clone(&observed_max);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    observed_max.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                }
            },
        )
        .await
        .unwrap()
    };

    assert_eq!(outcome.succeeded.len(), 20);
    assert!(
        observed_max.load(Ordering::SeqCst) <= 3,
        "saw {} concurrent invocations",
        observed_max.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn zero_limit_is_a_pool_error() {
    let result = run_pool(vec![1], 0, |n: u32| async move { Ok::<_, String>(n) }).await;
    assert_eq!(result.unwrap_err(), PoolError::InvalidLimit);
}

#[tokio::test]
async fn empty_target_list_completes_immediately() {
    let outcome = run_pool(Vec::<u32>::new(), 4, |n| async move { Ok::<_, String>(n) })
        .await
        .unwrap();
    assert_eq!(outcome.total(), 0);
}

#[tokio::test]
async fn worker_that_dies_reports_its_target_aborted() {
    let outcome = run_pool(vec![1u32, 2, 3], 2, |n| async move {
        if n == 2 {
            panic!("worker died");
        }
        Ok::<_, String>(n)
    })
    .await
    .unwrap();

    assert_eq!(outcome.aborted, vec![2]);
    assert_eq!(outcome.succeeded.len(), 2);
    assert!(outcome.failed.is_empty());
}

#[tokio::test]
async fn call_blocks_until_every_target_finishes() {
    let finished = Arc::new(AtomicUsize::new(0));
    {
        let finished = Arc::clone(&finished);
        run_pool((0..8).collect::<Vec<u32>>(), 2, move |_n| {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            }
        })
        .await
        .unwrap();
    }
    // Synchronous barrier: nothing is still running when run_pool returns
    assert_eq!(finished.load(Ordering::SeqCst), 8);
}
