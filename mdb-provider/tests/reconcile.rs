//! Mutation reconciliation against a scripted management API.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use common::{FakeApi, Step, context_with_policy};
use mdb_api::{ApiError, EntityType, TaskType};
use mdb_provider::reconcile::{Submitted, reconcile};
use mdb_provider::{ProviderError, RetryPolicy};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const ENTITY: &str = "c-1";

fn policy(interval: u64, max: u64) -> RetryPolicy {
    RetryPolicy::new(Duration::from_secs(interval), Duration::from_secs(max))
}

async fn submit() -> Result<Submitted<String>, ApiError> {
    Ok(Submitted::entity(ENTITY))
}

#[tokio::test(start_paused = true)]
async fn test_never_terminal_times_out_after_three_checks() {
    let api = FakeApi::new();
    api.script(ENTITY, TaskType::EditCluster, &[Step::State("IN_PROGRESS")]);
    let cx = context_with_policy(&api, policy(10, 30));
    let reads = AtomicU32::new(0);
    let reads_ref = &reads;
    let started = Instant::now();

    let result = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::EditCluster),
        submit,
        move |id: String| {
            reads_ref.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ProviderError>(id) }
        },
    )
    .await;

    match result {
        Err(ProviderError::TimedOut { kind, entity_id, last, .. }) => {
            assert_eq!(kind, TaskType::EditCluster);
            assert_eq!(entity_id, ENTITY);
            assert_eq!(last, "task state IN_PROGRESS");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(api.task_reads(), 3);
    assert_eq!(reads.load(Ordering::SeqCst), 0);
    assert!(started.elapsed() <= Duration::from_secs(40));
}

#[tokio::test(start_paused = true)]
async fn test_success_after_retries_reads_once() {
    let api = FakeApi::new();
    api.script(
        ENTITY,
        TaskType::CreateCluster,
        &[
            Step::State("QUEUED"),
            Step::State("IN_PROGRESS"),
            Step::State("SUCCEEDED"),
        ],
    );
    let cx = context_with_policy(&api, policy(10, 600));
    let reads = AtomicU32::new(0);
    let reads_ref = &reads;

    let state = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::CreateCluster),
        submit,
        move |id: String| {
            reads_ref.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ProviderError>(format!("state of {}", id)) }
        },
    )
    .await
    .unwrap();

    assert_eq!(state, "state of c-1");
    assert_eq!(api.task_reads(), 3);
    assert_eq!(reads.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_task_is_fatal_without_read() {
    let api = FakeApi::new();
    api.script(
        ENTITY,
        TaskType::CreateBackup,
        &[Step::Failed("disk quota exceeded")],
    );
    let cx = context_with_policy(&api, policy(10, 600));
    let reads = AtomicU32::new(0);
    let reads_ref = &reads;
    let started = Instant::now();

    let result = reconcile(
        &cx,
        cx.operation(EntityType::Backup, TaskType::CreateBackup),
        submit,
        move |id: String| {
            reads_ref.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ProviderError>(id) }
        },
    )
    .await;

    match result {
        Err(ref e @ ProviderError::OperationFailed { ref message, .. }) => {
            assert_eq!(message, "disk quota exceeded");
            assert_eq!(e.category(), "operation failed");
            assert!(!e.remote_outcome_unknown());
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(api.task_reads(), 1);
    assert_eq!(reads.load(Ordering::SeqCst), 0);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_read_failures_within_budget_are_tolerated() {
    let api = FakeApi::new();
    api.script(
        ENTITY,
        TaskType::EditCluster,
        &[Step::Unavailable, Step::Unavailable, Step::State("SUCCEEDED")],
    );
    let cx = context_with_policy(&api, policy(10, 600));

    let state = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::EditCluster),
        submit,
        |id: String| async move { Ok::<_, ProviderError>(id) },
    )
    .await
    .unwrap();

    assert_eq!(state, ENTITY);
    assert_eq!(api.task_reads(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_read_failures_past_budget_are_fatal() {
    let api = FakeApi::new();
    api.script(ENTITY, TaskType::EditCluster, &[Step::Unavailable]);
    let cx = context_with_policy(&api, policy(10, 600));

    let result = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::EditCluster),
        submit,
        |id: String| async move { Ok::<_, ProviderError>(id) },
    )
    .await;

    match result {
        Err(ref e @ ProviderError::StatusUnavailable { ref message, .. }) => {
            assert!(message.contains("service unavailable"), "{}", message);
            assert!(e.remote_outcome_unknown());
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(api.task_reads(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_missing_task_counts_against_budget() {
    let api = FakeApi::new();
    let cx = context_with_policy(&api, policy(10, 600)).with_failure_budget(0);

    let result = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::PauseCluster),
        submit,
        |id: String| async move { Ok::<_, ProviderError>(id) },
    )
    .await;

    match result {
        Err(ProviderError::StatusUnavailable { message, .. }) => {
            assert!(message.contains("no task found"), "{}", message);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(api.task_reads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_mutation_never_polls() {
    let api = FakeApi::new();
    api.script(ENTITY, TaskType::CreateCluster, &[Step::State("SUCCEEDED")]);
    let cx = context_with_policy(&api, policy(10, 600));

    let result = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::CreateCluster),
        || async {
            Err::<Submitted<String>, _>(ApiError::Status {
                status: 400,
                detail: "num_nodes must be odd".to_string(),
            })
        },
        |id: String| async move { Ok::<_, ProviderError>(id) },
    )
    .await;

    match result {
        Err(ref e @ ProviderError::Rejected { ref detail, .. }) => {
            assert!(detail.contains("num_nodes must be odd"));
            assert_eq!(e.report().summary, "Unable to create cluster");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(api.task_reads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_final_read_is_post_success_error() {
    let api = FakeApi::new();
    api.script(ENTITY, TaskType::EditDr, &[Step::State("SUCCEEDED")]);
    let cx = context_with_policy(&api, policy(10, 600));

    let result: Result<String, _> = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::EditDr),
        submit,
        |_id: String| async move {
            Err(ProviderError::Read(ApiError::Transport(
                "connection reset".to_string(),
            )))
        },
    )
    .await;

    match result {
        Err(ProviderError::PostSuccessRead { kind, detail, .. }) => {
            assert_eq!(kind, TaskType::EditDr);
            assert!(detail.contains("connection reset"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_polling() {
    let api = FakeApi::new();
    api.script(ENTITY, TaskType::CreateVpc, &[Step::State("IN_PROGRESS")]);
    let cancel = CancellationToken::new();
    let cx = context_with_policy(&api, policy(10, 600)).with_cancel(cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(25)).await;
        cancel.cancel();
    });

    let result = reconcile(
        &cx,
        cx.operation(EntityType::SingleTenantVpc, TaskType::CreateVpc),
        submit,
        |id: String| async move { Ok::<_, ProviderError>(id) },
    )
    .await;

    match result {
        Err(ref e @ ProviderError::Cancelled { ref last, .. }) => {
            assert_eq!(last, "task state IN_PROGRESS");
            assert_eq!(e.category(), "cancelled");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(api.task_reads(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_independent_reconciliations_run_concurrently() {
    let api = FakeApi::new();
    api.script(
        "c-1",
        TaskType::EditCluster,
        &[Step::State("IN_PROGRESS"), Step::State("SUCCEEDED")],
    );
    api.script(
        "c-2",
        TaskType::EditCluster,
        &[
            Step::State("IN_PROGRESS"),
            Step::State("IN_PROGRESS"),
            Step::State("SUCCEEDED"),
        ],
    );
    let cx = context_with_policy(&api, policy(10, 600));
    let started = Instant::now();

    let one = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::EditCluster),
        || async { Ok::<_, ApiError>(Submitted::entity("c-1")) },
        |id: String| async move { Ok::<_, ProviderError>(id) },
    );
    let two = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::EditCluster),
        || async { Ok::<_, ApiError>(Submitted::entity("c-2")) },
        |id: String| async move { Ok::<_, ProviderError>(id) },
    );
    let (one, two) = tokio::join!(one, two);

    assert_eq!(one.unwrap(), "c-1");
    assert_eq!(two.unwrap(), "c-2");
    assert_eq!(api.task_reads(), 5);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(21));
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_max_wait_does_not_overflow() {
    let api = FakeApi::new();
    api.script(
        ENTITY,
        TaskType::CreateCluster,
        &[Step::State("IN_PROGRESS"), Step::State("SUCCEEDED")],
    );
    let policy = RetryPolicy::new(Duration::from_secs(10), Duration::from_secs(u64::MAX));
    let cx = context_with_policy(&api, policy);

    let state = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::CreateCluster),
        submit,
        |id: String| async move { Ok::<_, ProviderError>(id) },
    )
    .await
    .unwrap();

    assert_eq!(state, ENTITY);
    assert_eq!(api.task_reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_slow_submit() {
    let api = FakeApi::new();
    api.script(ENTITY, TaskType::CreateCluster, &[Step::State("SUCCEEDED")]);
    let cancel = CancellationToken::new();
    let cx = context_with_policy(&api, policy(10, 600)).with_cancel(cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let result = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::CreateCluster),
        || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, ApiError>(Submitted::entity(ENTITY))
        },
        |id: String| async move { Ok::<_, ProviderError>(id) },
    )
    .await;

    match result {
        Err(ref e @ ProviderError::Cancelled { .. }) => assert!(e.remote_outcome_unknown()),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(api.task_reads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_slow_final_read() {
    let api = FakeApi::new();
    api.script(ENTITY, TaskType::EditCluster, &[Step::State("SUCCEEDED")]);
    let cancel = CancellationToken::new();
    let cx = context_with_policy(&api, policy(10, 600)).with_cancel(cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let result = reconcile(
        &cx,
        cx.operation(EntityType::Cluster, TaskType::EditCluster),
        submit,
        |id: String| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, ProviderError>(id)
        },
    )
    .await;

    match result {
        Err(ProviderError::Cancelled { entity_id, last, .. }) => {
            assert_eq!(entity_id, ENTITY);
            assert!(last.contains("final read"), "{}", last);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(api.task_reads(), 1);
}
