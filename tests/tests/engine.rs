mod utils;
#[allow(unused)]
use utils::*;

use drover::data::DataPool;
use drover::prelude::*;
use mock_client::MockClient;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn provider_for(schema: &SchemaConfig) -> Arc<DataProvider> {
    Arc::new(DataPool::new(schema.clone()).provider())
}

fn insert_workload(operations: Option<u64>, connections: u64) -> WorkloadConfig {
    let mut config = WorkloadConfig::new("writes", OperationKind::InsertOne, "users");
    config.operations = operations;
    config.connections = Some(connections);
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(120000)]
async fn count_bounded_pool_is_exact_under_contention() {
    for operations in [0u64, 1, 1000] {
        for connections in [1u64, 8, 200] {
            let client = Arc::new(MockClient::new());
            let config = insert_workload(Some(operations), connections);

            let handle = drover::spawn(&config, client.clone(), provider_for(&user_schema(&[])))
                .expect("valid config");
            let summary = handle.join().await;

            assert_eq!(
                summary.requests, operations,
                "k={operations} connections={connections}"
            );
            assert_eq!(client.insert_count(), operations);
            assert_eq!(summary.successes, operations);
            assert_eq!(summary.errors, 0);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn duration_bounded_run_respects_both_bounds() {
    let client = Arc::new(MockClient::new().with_latency(
        Duration::from_millis(5),
        Duration::from_millis(1),
    ));
    let mut config = WorkloadConfig::new("writes", OperationKind::InsertOne, "users");
    config.duration = Some(Duration::from_millis(150));
    config.connections = Some(10);

    let start = Instant::now();
    let handle = drover::spawn(&config, client, provider_for(&user_schema(&[])))
        .expect("valid config");
    let summary = handle.join().await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(150), "ended early: {elapsed:?}");
    // upper bound: the duration plus one worst-case in-flight operation,
    // with generous scheduling slack
    assert!(elapsed < Duration::from_secs(5), "ended late: {elapsed:?}");
    assert!(summary.requests > 0);
}

#[tracing_test::traced_test]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_always_releases_the_barrier() {
    // fired before any work
    let client = Arc::new(MockClient::new());
    let handle = drover::spawn(
        &insert_workload(None, 10),
        client,
        provider_for(&user_schema(&[])),
    )
    .expect("valid config");
    handle.cancel();
    let summary = handle.join().await;
    assert_eq!(summary.successes, summary.requests);

    // fired mid-run, against a paced workload with blocked workers
    let client = Arc::new(MockClient::new());
    let mut config = insert_workload(None, 10);
    config.rps = Some(NonZeroU32::new(10).unwrap());
    let handle = drover::spawn(&config, client.clone(), provider_for(&user_schema(&[])))
        .expect("valid config");
    let watcher = handle.watcher();
    tokio::time::sleep(Duration::from_millis(100)).await;
    watcher.cancel();
    let summary = handle.join().await;
    assert_eq!(summary.requests, client.insert_count());

    // fired after natural completion
    let client = Arc::new(MockClient::new());
    let handle = drover::spawn(
        &insert_workload(Some(50), 4),
        client,
        provider_for(&user_schema(&[])),
    )
    .expect("valid config");
    let watcher = handle.watcher();
    let summary = handle.join().await;
    watcher.cancel();
    watcher.cancel();
    assert_eq!(summary.requests, 50);
    assert_eq!(watcher.summary().expect("drained"), summary);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn rate_limited_throughput_approaches_the_target() {
    let client = Arc::new(MockClient::new());
    let mut config = insert_workload(None, 10);
    config.rps = Some(NonZeroU32::new(200).unwrap());
    config.duration = Some(Duration::from_secs(1));

    let handle = drover::spawn(&config, client, provider_for(&user_schema(&[])))
        .expect("valid config");
    let summary = handle.join().await;

    // R x T with scheduling tolerance
    assert!(
        summary.requests >= 100 && summary.requests <= 280,
        "expected ~200 requests, got {}",
        summary.requests
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn attempts_counting_includes_failures() {
    let client = Arc::new(MockClient::new().with_failure_rate(0.3));
    let mut config = insert_workload(Some(50), 8);
    config.counting = CountingMode::Attempts;

    let handle = drover::spawn(&config, client, provider_for(&user_schema(&[])))
        .expect("valid config");
    let summary = handle.join().await;

    assert_eq!(summary.requests, 50);
    assert_eq!(summary.successes + summary.errors, 50);
    assert!(summary.successes < 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn successes_counting_runs_until_k_successes() {
    let client = Arc::new(MockClient::new().with_failure_rate(0.3));
    let mut config = insert_workload(Some(50), 8);
    config.counting = CountingMode::Successes;

    let handle = drover::spawn(&config, client.clone(), provider_for(&user_schema(&[])))
        .expect("valid config");
    let summary = handle.join().await;

    assert_eq!(summary.requests, 50);
    assert_eq!(summary.successes, 50);
    assert!(summary.errors > 0);
    assert_eq!(client.insert_count(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn batched_inserts_weight_operations_per_second() {
    let client = Arc::new(MockClient::new());
    let mut config = WorkloadConfig::new("bulk", OperationKind::InsertMany, "users");
    config.operations = Some(20);
    config.connections = Some(4);
    config.batch_size = Some(10);

    let handle = drover::spawn(&config, client.clone(), provider_for(&user_schema(&[])))
        .expect("valid config");
    let summary = handle.join().await;

    assert_eq!(summary.requests, 20);
    assert_eq!(client.insert_count(), 200);
    let ratio = summary.operations_per_second / summary.requests_per_second;
    assert!((ratio - 10.0).abs() < 1e-6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn progress_is_pollable_through_the_whole_lifecycle() {
    let client = Arc::new(MockClient::new().with_latency(
        Duration::from_millis(5),
        Duration::ZERO,
    ));
    let mut config = insert_workload(None, 4);
    config.duration = Some(Duration::from_millis(300));

    let handle = drover::spawn(&config, client, provider_for(&user_schema(&[])))
        .expect("valid config");
    let watcher = handle.watcher();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let mid = watcher.progress();
    assert_eq!(mid.state, RunState::Running);
    assert!(mid.elapsed > Duration::ZERO);

    let summary = handle.join().await;
    let after = watcher.progress();
    assert_eq!(after.state, RunState::Drained);
    assert_eq!(after.requests_done, summary.requests);
    assert_eq!(after.requests_done, watcher.progress().requests_done);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn end_to_end_500_ops_across_10_workers() {
    let client = Arc::new(MockClient::new());
    let handle = drover::spawn(
        &insert_workload(Some(500), 10),
        client.clone(),
        provider_for(&user_schema(&[])),
    )
    .expect("valid config");

    let summary = handle.join().await;

    assert_eq!(summary.requests, 500);
    assert_eq!(client.insert_count(), 500);
    assert!(summary.operations_per_second > 0.0);
    assert!(summary.elapsed > Duration::ZERO);
}
