// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runner::StepRunner;
use crate::test_helpers::*;
use dk_core::{DeploymentStatus, FakeClock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn worker(
    store: &FakeStore,
    queue: &FakeQueue,
    connector: FakeConnector,
    cancel: CancellationToken,
) -> Worker<FakeStore, FakeQueue, FakeConnector, FakeClock> {
    let runner = StepRunner::new(store.clone(), queue.clone(), connector, FakeClock::new())
        .with_settings(fast_settings());
    Worker::new(runner, queue.clone(), cancel).with_dequeue_timeout(Duration::from_millis(5))
}

async fn wait_until<F: Fn() -> bool>(deadline: Duration, check: F) {
    let start = tokio::time::Instant::now();
    while !check() {
        assert!(start.elapsed() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn two_workers_drain_three_jobs_each_processed_once() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let cancel = CancellationToken::new();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let job = seeded_job(&store, job_data()).await;
        ids.push(job.deployment_id);
        queue.push(job);
    }

    let mut handles = Vec::new();
    for _ in 0..2 {
        let host = FakeHost::new(healthy_script("deployknot-p-d"));
        let worker = std::sync::Arc::new(worker(
            &store,
            &queue,
            FakeConnector::Ok(host),
            cancel.clone(),
        ));
        handles.push(tokio::spawn(async move { worker.run().await }));
    }

    let check_store = store.clone();
    let check_ids = ids.clone();
    wait_until(Duration::from_secs(5), move || {
        check_ids.iter().all(|id| {
            check_store.deployment(*id).status == DeploymentStatus::Completed
        })
    })
    .await;

    assert_eq!(queue.queued(), 0);
    // Each pop delivered to exactly one worker: a reprocessed job
    // would have reset its step rows to running; all four stay
    // completed for every deployment.
    for id in ids {
        let steps = store.steps(id);
        assert_eq!(steps.len(), 4);
        for step in steps {
            assert_eq!(step.status, dk_core::StepStatus::Completed);
        }
    }

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn worker_records_failure_and_keeps_going() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let mut script = healthy_script("deployknot-p-d");
    script
        .failures
        .push(("git clone".into(), "fatal: repository not found".into(), 128));
    let cancel = CancellationToken::new();

    let failing = seeded_job(&store, job_data()).await;
    queue.push(failing.clone());

    let worker = std::sync::Arc::new(worker(
        &store,
        &queue,
        FakeConnector::Ok(FakeHost::new(script)),
        cancel.clone(),
    ));
    let handle = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.run().await })
    };

    let check_store = store.clone();
    let id = failing.deployment_id;
    wait_until(Duration::from_secs(5), move || {
        check_store.deployment(id).status == DeploymentStatus::Failed
    })
    .await;

    let (status, error) = queue.record(failing.id).unwrap();
    assert_eq!(status, dk_core::JobStatus::Failed);
    assert!(error.unwrap().contains("repository not found"));

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn worker_removes_local_env_file_after_terminal_state() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let host = FakeHost::new(healthy_script("deployknot-p-d"));
    let cancel = CancellationToken::new();

    let dir = tempfile::tempdir().unwrap();
    let env_path = dir.path().join("uploaded.env");
    std::fs::write(&env_path, "A=1\n").unwrap();

    let mut data = job_data();
    data.env_file_path = Some(env_path.clone());
    let job = seeded_job(&store, data).await;
    let id = job.deployment_id;
    queue.push(job);

    let worker = std::sync::Arc::new(worker(
        &store,
        &queue,
        FakeConnector::Ok(host),
        cancel.clone(),
    ));
    let handle = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.run().await })
    };

    let check_store = store.clone();
    wait_until(Duration::from_secs(5), move || {
        check_store.deployment(id).status == DeploymentStatus::Completed
    })
    .await;
    wait_until(Duration::from_secs(5), move || !env_path.exists()).await;

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn cancelled_worker_exits_promptly() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let cancel = CancellationToken::new();

    let worker = std::sync::Arc::new(worker(
        &store,
        &queue,
        FakeConnector::Fail("unused".into()),
        cancel.clone(),
    ));
    let handle = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.run().await })
    };

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker did not stop")
        .unwrap();
}
