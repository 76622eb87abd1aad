// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fakes for exercising the engine without Postgres, Redis,
//! or SSH.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dk_core::{
    Deployment, DeploymentId, DeploymentLog, DeploymentStatus, DeploymentStep, Job, JobData,
    JobId, JobStatus, StepName, UserId,
};
use dk_queue::QueueError;
use dk_remote::{RemoteError, RemoteHost};
use dk_storage::StoreError;

use crate::ports::{Connector, DeploymentStore, JobQueue};

/// Everything the fake store remembers about one deployment.
#[derive(Default)]
pub struct StoreInner {
    pub deployments: HashMap<DeploymentId, Deployment>,
    pub steps: HashMap<DeploymentId, Vec<DeploymentStep>>,
    pub logs: Vec<DeploymentLog>,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    pub inner: Arc<Mutex<StoreInner>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deployment(&self, id: DeploymentId) -> Deployment {
        self.inner.lock().deployments.get(&id).cloned().unwrap()
    }

    pub fn steps(&self, id: DeploymentId) -> Vec<DeploymentStep> {
        self.inner.lock().steps.get(&id).cloned().unwrap_or_default()
    }

    pub fn logs(&self, id: DeploymentId) -> Vec<DeploymentLog> {
        self.inner
            .lock()
            .logs
            .iter()
            .filter(|l| l.deployment_id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DeploymentStore for FakeStore {
    async fn create_deployment(
        &self,
        deployment: &Deployment,
        steps: &[DeploymentStep],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.deployments.insert(deployment.id, deployment.clone());
        inner.steps.insert(deployment.id, steps.to_vec());
        Ok(())
    }

    async fn update_deployment_status(
        &self,
        id: DeploymentId,
        status: DeploymentStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let deployment = inner.deployments.get_mut(&id).ok_or(StoreError::NotFound)?;
        deployment.status = status;
        deployment.error_message = error_message.map(String::from);
        deployment.updated_at = Utc::now();
        Ok(())
    }

    async fn update_deployment_timing(
        &self,
        id: DeploymentId,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let deployment = inner.deployments.get_mut(&id).ok_or(StoreError::NotFound)?;
        if started_at.is_some() {
            deployment.started_at = started_at;
        }
        if completed_at.is_some() {
            deployment.completed_at = completed_at;
        }
        Ok(())
    }

    async fn list_steps(&self, id: DeploymentId) -> Result<Vec<DeploymentStep>, StoreError> {
        Ok(self.inner.lock().steps.get(&id).cloned().unwrap_or_default())
    }

    async fn update_step(&self, step: &DeploymentStep) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let steps = inner
            .steps
            .get_mut(&step.deployment_id)
            .ok_or(StoreError::NotFound)?;
        if let Some(existing) = steps.iter_mut().find(|s| s.id == step.id) {
            *existing = step.clone();
        }
        Ok(())
    }

    async fn append_log(&self, log: &DeploymentLog) -> Result<(), StoreError> {
        self.inner.lock().logs.push(log.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct QueueInner {
    pub jobs: VecDeque<Job>,
    pub records: HashMap<JobId, (JobStatus, Option<String>)>,
    pub cancelled: HashSet<DeploymentId>,
}

#[derive(Clone, Default)]
pub struct FakeQueue {
    pub inner: Arc<Mutex<QueueInner>>,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, job: Job) {
        self.inner.lock().jobs.push_back(job);
    }

    pub fn record(&self, id: JobId) -> Option<(JobStatus, Option<String>)> {
        self.inner.lock().records.get(&id).cloned()
    }

    pub fn cancel(&self, id: DeploymentId) {
        self.inner.lock().cancelled.insert(id);
    }

    pub fn queued(&self) -> usize {
        self.inner.lock().jobs.len()
    }
}

#[async_trait]
impl JobQueue for FakeQueue {
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        inner.jobs.push_back(job.clone());
        inner.records.insert(job.id, (JobStatus::Pending, None));
        Ok(())
    }

    async fn dequeue(&self, _timeout: Duration) -> Result<Option<Job>, QueueError> {
        Ok(self.inner.lock().jobs.pop_front())
    }

    async fn update_job(
        &self,
        job_id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), QueueError> {
        self.inner
            .lock()
            .records
            .insert(job_id, (status, error_message.map(String::from)));
        Ok(())
    }

    async fn is_cancel_requested(&self, deployment_id: DeploymentId) -> Result<bool, QueueError> {
        Ok(self.inner.lock().cancelled.contains(&deployment_id))
    }
}

/// Scripted remote host: commands run in order, every command is
/// recorded, and failures are injected by substring match.
#[derive(Default)]
pub struct HostScript {
    /// `(needle, output, exit_status)`; first match wins.
    pub failures: Vec<(String, String, i32)>,
    /// `(needle, output)`: canned output for successful commands.
    pub outputs: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub struct FakeHost {
    pub script: Arc<HostScript>,
    pub commands: Arc<Mutex<Vec<String>>>,
    pub uploads: Arc<Mutex<Vec<(PathBuf, String)>>>,
}

impl FakeHost {
    pub fn new(script: HostScript) -> Self {
        Self {
            script: Arc::new(script),
            commands: Arc::new(Mutex::new(Vec::new())),
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn ran(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn uploaded(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl RemoteHost for FakeHost {
    async fn run(&self, command: &str) -> Result<String, RemoteError> {
        self.commands.lock().push(command.to_string());
        for (needle, output, status) in &self.script.failures {
            if command.contains(needle.as_str()) {
                return Err(RemoteError::CommandFailed {
                    status: *status,
                    output: output.clone(),
                });
            }
        }
        for (needle, output) in &self.script.outputs {
            if command.contains(needle.as_str()) {
                return Ok(output.clone());
            }
        }
        Ok(String::new())
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        self.uploads
            .lock()
            .push((local.to_path_buf(), remote.to_string()));
        Ok(())
    }
}

/// Connector returning a pre-built fake host, or an error script.
#[derive(Clone)]
pub enum FakeConnector {
    Ok(FakeHost),
    Fail(String),
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        host: &str,
        _username: &str,
        _password: &str,
    ) -> Result<Arc<dyn RemoteHost>, RemoteError> {
        match self {
            FakeConnector::Ok(fake) => Ok(Arc::new(fake.clone())),
            FakeConnector::Fail(message) => Err(RemoteError::Connect {
                host: host.to_string(),
                message: message.clone(),
            }),
        }
    }
}

/// A deployment row + step rows + job envelope ready for the runner,
/// registered in the fake store.
pub async fn seeded_job(store: &FakeStore, data: JobData) -> Job {
    let id = DeploymentId::new();
    let now = Utc::now();
    let deployment = Deployment {
        id,
        created_at: now,
        updated_at: now,
        status: DeploymentStatus::Pending,
        target_ip: data.target_ip.clone(),
        ssh_username: data.ssh_username.clone(),
        ssh_password: data.ssh_password.clone(),
        github_repo_url: data.github_repo_url.clone(),
        github_pat: data.github_pat.clone(),
        github_branch: data.github_branch.clone(),
        additional_vars: data.additional_vars.clone(),
        port: data.port,
        container_name: Some(data.container_name.clone()),
        started_at: None,
        completed_at: None,
        error_message: None,
        created_by: None,
        project_name: data.project_name.clone(),
        deployment_name: data.deployment_name.clone(),
        user_id: Some(UserId::new()),
    };
    let steps: Vec<DeploymentStep> = StepName::PIPELINE
        .iter()
        .enumerate()
        .map(|(i, name)| DeploymentStep::pending(id, *name, i as i32 + 1))
        .collect();
    store.create_deployment(&deployment, &steps).await.unwrap();
    Job::deployment(id, data, now)
}

/// Baseline job data for the happy path.
pub fn job_data() -> JobData {
    JobData {
        target_ip: "10.0.0.5".into(),
        ssh_username: "root".into(),
        ssh_password: "pw-hunter2".into(),
        github_repo_url: "https://github.com/x/y.git".into(),
        github_pat: "ghp_supersecret".into(),
        github_branch: "main".into(),
        port: 3000,
        container_name: "deployknot-p-d".into(),
        project_name: Some("p".into()),
        deployment_name: Some("d".into()),
        additional_vars: None,
        env_file_path: None,
        environment_vars: None,
    }
}

/// A host script whose `docker ps` health check reports the container
/// as up.
pub fn healthy_script(container_name: &str) -> HostScript {
    HostScript {
        failures: Vec::new(),
        outputs: vec![
            (
                "docker ps --filter".to_string(),
                format!("NAMES\tSTATUS\n{container_name}\tUp 2 seconds"),
            ),
            ("docker --version".to_string(), "Docker version 27.0.3".to_string()),
            (
                "docker images".to_string(),
                format!("{container_name}:latest"),
            ),
            ("docker run -d".to_string(), "abc123def456".to_string()),
        ],
    }
}

/// Runner settings with no cleanup pauses, for fast tests.
pub fn fast_settings() -> crate::runner::RunnerSettings {
    crate::runner::RunnerSettings {
        build_timeout: Duration::from_secs(5),
        command_timeout: Duration::from_secs(5),
        cleanup_pause: Duration::ZERO,
    }
}
