// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter seams between the engine and its infrastructure.
//!
//! Production wiring: [`dk_storage::Store`] for the store,
//! [`dk_queue::DeploymentQueue`] for the queue, and [`SshConnector`]
//! for SSH. Tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use dk_core::{
    Deployment, DeploymentId, DeploymentLog, DeploymentStatus, DeploymentStep, Job, JobId,
    JobStatus,
};
use dk_queue::QueueError;
use dk_remote::{RemoteError, RemoteHost, SshHost};
use dk_storage::StoreError;

/// Store operations the coordinator and runner consume.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    async fn create_deployment(
        &self,
        deployment: &Deployment,
        steps: &[DeploymentStep],
    ) -> Result<(), StoreError>;

    async fn update_deployment_status(
        &self,
        id: DeploymentId,
        status: DeploymentStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn update_deployment_timing(
        &self,
        id: DeploymentId,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    async fn list_steps(&self, id: DeploymentId) -> Result<Vec<DeploymentStep>, StoreError>;

    async fn update_step(&self, step: &DeploymentStep) -> Result<(), StoreError>;

    async fn append_log(&self, log: &DeploymentLog) -> Result<(), StoreError>;
}

#[async_trait]
impl DeploymentStore for dk_storage::Store {
    async fn create_deployment(
        &self,
        deployment: &Deployment,
        steps: &[DeploymentStep],
    ) -> Result<(), StoreError> {
        dk_storage::Store::create_deployment(self, deployment, steps).await
    }

    async fn update_deployment_status(
        &self,
        id: DeploymentId,
        status: DeploymentStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        dk_storage::Store::update_deployment_status(self, id, status, error_message).await
    }

    async fn update_deployment_timing(
        &self,
        id: DeploymentId,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        dk_storage::Store::update_deployment_timing(self, id, started_at, completed_at).await
    }

    async fn list_steps(&self, id: DeploymentId) -> Result<Vec<DeploymentStep>, StoreError> {
        dk_storage::Store::list_steps(self, id).await
    }

    async fn update_step(&self, step: &DeploymentStep) -> Result<(), StoreError> {
        dk_storage::Store::update_step(self, step).await
    }

    async fn append_log(&self, log: &DeploymentLog) -> Result<(), StoreError> {
        dk_storage::Store::append_log(self, log).await
    }
}

/// Queue operations the coordinator and worker consume.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError>;

    async fn dequeue(&self, timeout: Duration) -> Result<Option<Job>, QueueError>;

    async fn update_job(
        &self,
        job_id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), QueueError>;

    async fn is_cancel_requested(&self, deployment_id: DeploymentId) -> Result<bool, QueueError>;
}

#[async_trait]
impl JobQueue for dk_queue::DeploymentQueue {
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        dk_queue::DeploymentQueue::enqueue(self, job).await
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<Job>, QueueError> {
        dk_queue::DeploymentQueue::dequeue(self, timeout).await
    }

    async fn update_job(
        &self,
        job_id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), QueueError> {
        dk_queue::DeploymentQueue::update_job(self, job_id, status, error_message).await
    }

    async fn is_cancel_requested(&self, deployment_id: DeploymentId) -> Result<bool, QueueError> {
        dk_queue::DeploymentQueue::is_cancel_requested(self, deployment_id).await
    }
}

/// Opens remote host connections for the runner.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        host: &str,
        username: &str,
        password: &str,
    ) -> Result<Arc<dyn RemoteHost>, RemoteError>;
}

/// Production connector: password-authenticated SSH.
#[derive(Clone, Copy, Default)]
pub struct SshConnector;

#[async_trait]
impl Connector for SshConnector {
    async fn connect(
        &self,
        host: &str,
        username: &str,
        password: &str,
    ) -> Result<Arc<dyn RemoteHost>, RemoteError> {
        let session = SshHost::connect(host, username, password).await?;
        Ok(Arc::new(session))
    }
}
