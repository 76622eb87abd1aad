// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::*;
use dk_core::{DeploymentStatus, FakeClock, JobStatus, LogLevel, StepName, StepStatus};

type TestRunner = StepRunner<FakeStore, FakeQueue, FakeConnector, FakeClock>;

fn runner(store: &FakeStore, queue: &FakeQueue, connector: FakeConnector) -> TestRunner {
    StepRunner::new(store.clone(), queue.clone(), connector, FakeClock::new())
        .with_settings(fast_settings())
}

#[tokio::test]
async fn happy_path_completes_every_step() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let host = FakeHost::new(healthy_script("deployknot-p-d"));
    let runner = runner(&store, &queue, FakeConnector::Ok(host.clone()));

    let job = seeded_job(&store, job_data()).await;
    runner.process(&job).await.unwrap();

    let deployment = store.deployment(job.deployment_id);
    assert_eq!(deployment.status, DeploymentStatus::Completed);
    assert!(deployment.started_at.is_some());
    assert!(deployment.completed_at.is_some());
    assert!(deployment.completed_at >= deployment.started_at);

    let steps = store.steps(job.deployment_id);
    assert_eq!(steps.len(), 4);
    for step in &steps {
        assert_eq!(step.status, StepStatus::Completed, "step {}", step.step_name);
        assert!(step.started_at.is_some());
        assert!(step.completed_at.is_some());
        assert!(step.duration_ms.is_some());
    }

    // At least one log row per executed step.
    let logs = store.logs(job.deployment_id);
    for order in 1..=4 {
        assert!(
            logs.iter().any(|l| l.step_order == Some(order)),
            "no log for step {order}"
        );
    }

    assert_eq!(queue.record(job.id).unwrap().0, JobStatus::Completed);
}

#[tokio::test]
async fn happy_path_runs_without_env_file_flag() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let host = FakeHost::new(healthy_script("deployknot-p-d"));
    let runner = runner(&store, &queue, FakeConnector::Ok(host.clone()));

    let job = seeded_job(&store, job_data()).await;
    runner.process(&job).await.unwrap();

    let run_cmd = host
        .ran()
        .into_iter()
        .find(|c| c.starts_with("docker run -d"))
        .unwrap();
    assert!(!run_cmd.contains("--env-file"));
}

#[tokio::test]
async fn build_failure_abandons_later_steps() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let mut script = healthy_script("deployknot-p-d");
    script
        .failures
        .push(("docker build".into(), "ERR: missing base image".into(), 2));
    let host = FakeHost::new(script);
    let runner = runner(&store, &queue, FakeConnector::Ok(host));

    let job = seeded_job(&store, job_data()).await;
    let err = runner.process(&job).await.unwrap_err();
    assert!(matches!(err, RunnerError::Step { step: StepName::DockerBuild, .. }));

    let steps = store.steps(job.deployment_id);
    assert_eq!(steps[0].status, StepStatus::Completed);
    assert_eq!(steps[1].status, StepStatus::Failed);
    assert!(steps[1]
        .error_message
        .as_deref()
        .unwrap()
        .contains("ERR: missing base image"));
    for later in &steps[2..] {
        assert_eq!(later.status, StepStatus::Failed);
        assert_eq!(
            later.error_message.as_deref(),
            Some("Step abandoned due to failure in step 2")
        );
    }

    let deployment = store.deployment(job.deployment_id);
    assert_eq!(deployment.status, DeploymentStatus::Failed);
    assert!(deployment.completed_at.is_some());
    assert_eq!(queue.record(job.id).unwrap().0, JobStatus::Failed);
}

#[tokio::test]
async fn connect_failure_fails_everything_before_any_step_runs() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let runner = runner(&store, &queue, FakeConnector::Fail("timeout".into()));

    let job = seeded_job(&store, job_data()).await;
    let err = runner.process(&job).await.unwrap_err();
    assert!(matches!(err, RunnerError::Connect { .. }));
    assert!(err.to_string().contains("10.0.0.5"));

    let steps = store.steps(job.deployment_id);
    assert_eq!(steps.len(), 4);
    for step in &steps {
        assert_eq!(step.status, StepStatus::Failed);
        // No step ever transitioned to running.
        assert!(step.started_at.is_none());
        assert!(step.error_message.is_some());
    }

    let deployment = store.deployment(job.deployment_id);
    assert_eq!(deployment.status, DeploymentStatus::Failed);
    assert!(deployment.error_message.unwrap().contains("10.0.0.5"));
    assert!(deployment.started_at.is_none());
}

#[tokio::test]
async fn cancellation_before_first_step_aborts() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let host = FakeHost::new(healthy_script("deployknot-p-d"));
    let runner = runner(&store, &queue, FakeConnector::Ok(host.clone()));

    let job = seeded_job(&store, job_data()).await;
    queue.cancel(job.deployment_id);
    runner.process(&job).await.unwrap();

    let deployment = store.deployment(job.deployment_id);
    assert_eq!(deployment.status, DeploymentStatus::Aborted);
    assert!(deployment.completed_at.is_some());
    for step in store.steps(job.deployment_id) {
        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.error_message.as_deref(), Some("cancelled"));
    }
    // No remote command ever ran.
    assert!(host.ran().is_empty());
    let (status, error) = queue.record(job.id).unwrap();
    assert_eq!(status, JobStatus::Failed);
    assert_eq!(error.as_deref(), Some("cancelled"));
}

#[tokio::test]
async fn uploaded_env_file_flows_to_the_container() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let host = FakeHost::new(healthy_script("deployknot-p-d"));
    let runner = runner(&store, &queue, FakeConnector::Ok(host.clone()));

    let env_file = tempfile::NamedTempFile::new().unwrap();
    let mut data = job_data();
    data.env_file_path = Some(env_file.path().to_path_buf());
    let job = seeded_job(&store, data).await;
    runner.process(&job).await.unwrap();

    let uploads = host.uploaded();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, env_file.path());
    assert_eq!(uploads[0].1, "/tmp/deployknot-uploaded.env");

    let ran = host.ran();
    assert!(ran.iter().any(|c| c.contains("cp /tmp/deployknot-uploaded.env ./deployknot.env")));
    let run_cmd = ran.iter().find(|c| c.starts_with("docker run -d")).unwrap();
    assert!(run_cmd.contains("--env-file './deployknot.env'"));
}

#[tokio::test]
async fn inline_env_vars_are_normalized_and_written_remotely() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let host = FakeHost::new(healthy_script("deployknot-p-d"));
    let runner = runner(&store, &queue, FakeConnector::Ok(host.clone()));

    let mut data = job_data();
    data.environment_vars = Some("# hdr\nA=1\n\nB=\"two\"\n".into());
    let job = seeded_job(&store, data).await;
    runner.process(&job).await.unwrap();

    let expected_path = format!("/tmp/deployknot-env-{}.env", job.deployment_id);
    let ran = host.ran();
    let write = ran.iter().find(|c| c.starts_with("cat > ")).unwrap();
    assert!(write.contains(&expected_path));
    assert!(write.contains("A=1\nB=two"));
    let run_cmd = ran.iter().find(|c| c.starts_with("docker run -d")).unwrap();
    assert!(run_cmd.contains(&expected_path));
}

#[tokio::test]
async fn comments_only_env_vars_behave_like_none() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let host = FakeHost::new(healthy_script("deployknot-p-d"));
    let runner = runner(&store, &queue, FakeConnector::Ok(host.clone()));

    let mut data = job_data();
    data.environment_vars = Some("# only\n\n# comments\n".into());
    let job = seeded_job(&store, data).await;
    runner.process(&job).await.unwrap();

    let ran = host.ran();
    assert!(!ran.iter().any(|c| c.starts_with("cat > ")));
    let run_cmd = ran.iter().find(|c| c.starts_with("docker run -d")).unwrap();
    assert!(!run_cmd.contains("--env-file"));
}

#[tokio::test]
async fn health_check_requires_up_status() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let mut script = healthy_script("deployknot-p-d");
    // Zero exit but the container is gone: header line only.
    script.outputs.retain(|(needle, _)| needle != "docker ps --filter");
    script
        .outputs
        .push(("docker ps --filter".into(), "NAMES\tSTATUS\n".into()));
    let host = FakeHost::new(script);
    let runner = runner(&store, &queue, FakeConnector::Ok(host));

    let job = seeded_job(&store, job_data()).await;
    let err = runner.process(&job).await.unwrap_err();
    assert!(matches!(err, RunnerError::Step { step: StepName::HealthCheck, .. }));

    let steps = store.steps(job.deployment_id);
    assert_eq!(steps[3].status, StepStatus::Failed);
    assert!(steps[3].error_message.as_deref().unwrap().contains("is not running"));
}

#[tokio::test]
async fn warn_only_cleanup_failures_do_not_fail_the_step() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let mut script = healthy_script("deployknot-p-d");
    script.failures.push(("rm -rf /tmp/deployknot-app".into(), "busy".into(), 1));
    script.failures.push(("docker system prune".into(), "daemon slow".into(), 1));
    let host = FakeHost::new(script);
    let runner = runner(&store, &queue, FakeConnector::Ok(host));

    let job = seeded_job(&store, job_data()).await;
    runner.process(&job).await.unwrap();

    let deployment = store.deployment(job.deployment_id);
    assert_eq!(deployment.status, DeploymentStatus::Completed);
    let logs = store.logs(job.deployment_id);
    assert!(logs
        .iter()
        .any(|l| l.log_level == LogLevel::Warn && l.message.starts_with("Cleanup warning")));
}

#[tokio::test]
async fn secrets_never_reach_persisted_logs() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let mut script = healthy_script("deployknot-p-d");
    // A clone failure echoes the clone URL, PAT included.
    script.failures.push((
        "git clone".into(),
        "fatal: could not clone https://ghp_supersecret@github.com/x/y.git (pw-hunter2)".into(),
        128,
    ));
    let host = FakeHost::new(script);
    let runner = runner(&store, &queue, FakeConnector::Ok(host));

    let job = seeded_job(&store, job_data()).await;
    runner.process(&job).await.unwrap_err();

    for log in store.logs(job.deployment_id) {
        assert!(!log.message.contains("ghp_supersecret"), "leak: {}", log.message);
        assert!(!log.message.contains("pw-hunter2"), "leak: {}", log.message);
    }
    for step in store.steps(job.deployment_id) {
        if let Some(msg) = step.error_message {
            assert!(!msg.contains("ghp_supersecret"));
            assert!(!msg.contains("pw-hunter2"));
        }
    }
    let deployment = store.deployment(job.deployment_id);
    assert!(!deployment.error_message.unwrap().contains("ghp_supersecret"));
}

#[tokio::test]
async fn logs_are_ordered_by_created_at_then_id() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let host = FakeHost::new(healthy_script("deployknot-p-d"));
    let runner = runner(&store, &queue, FakeConnector::Ok(host));

    let job = seeded_job(&store, job_data()).await;
    runner.process(&job).await.unwrap();

    let logs = store.logs(job.deployment_id);
    assert!(logs.len() > 4);
    let mut sorted = logs.clone();
    sorted.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then(a.id.to_string().cmp(&b.id.to_string()))
    });
    let appended: Vec<_> = logs.iter().map(|l| l.id).collect();
    let expected: Vec<_> = sorted.iter().map(|l| l.id).collect();
    assert_eq!(appended, expected);
}

#[tokio::test]
async fn missing_job_parameters_fail_fast() {
    let store = FakeStore::new();
    let queue = FakeQueue::new();
    let host = FakeHost::new(healthy_script("deployknot-p-d"));
    let runner = runner(&store, &queue, FakeConnector::Ok(host.clone()));

    let mut data = job_data();
    data.github_pat = String::new();
    let job = seeded_job(&store, data).await;
    let err = runner.process(&job).await.unwrap_err();
    assert!(matches!(err, RunnerError::MissingParameters));

    let deployment = store.deployment(job.deployment_id);
    assert_eq!(deployment.status, DeploymentStatus::Failed);
    for step in store.steps(job.deployment_id) {
        assert_eq!(step.status, StepStatus::Failed);
    }
    assert!(host.ran().is_empty());
}
